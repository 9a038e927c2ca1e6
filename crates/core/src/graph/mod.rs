//! Pipeline task graph.
//!
//! Every node is identified by a [`TaskKey`] and described by a [`TaskPlan`]:
//! what it needs, which files it reads and writes, and the [`Step`]s that
//! produce them. Plans are plain data, so a graph can be inspected, printed
//! or tested without running a single tool.

mod args;
mod tasks;

use std::{
    collections::{BTreeMap, HashMap},
    fmt,
    path::PathBuf,
};

use petgraph::{algo::toposort, graph::DiGraph};
use serde::{Deserialize, Serialize};

pub use args::{HintFiles, hint_pairs, instruct_triples, integrate_args};
pub use tasks::declare;

use crate::{config::Config, context::BuildContext, error::PlanError, runner::ToolCommand};

/// Kind of work a task performs. Ordered by pipeline position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Split one weight's master collection into regional fonts.
    Extract,
    /// One extracted regional font.
    ExtractedFont,
    /// Convert a regional font to TrueType outlines.
    Convert,
    /// Merge, autohint and re-split all regions of a weight.
    Autohint,
    /// One autohinted regional font.
    HintedFont,
    /// Dump a hinted font to its structured form.
    Dump,
    /// Compute hints for all regions of a weight.
    GroupHint,
    /// Synthesize instructions for all regions of a weight.
    GroupInstruct,
    /// Integrate instructions into one region's structured form.
    Integrate,
    /// Rebuild one region's binary font.
    Rebuild,
    /// Bundle all regions of a weight into a collection.
    Bundle,
    ArchiveFonts,
    ArchiveCollections,
}

impl Stage {
    pub fn name(self) -> &'static str {
        match self {
            Stage::Extract => "extract",
            Stage::ExtractedFont => "extracted-font",
            Stage::Convert => "convert",
            Stage::Autohint => "autohint",
            Stage::HintedFont => "hinted-font",
            Stage::Dump => "dump",
            Stage::GroupHint => "group-hint",
            Stage::GroupInstruct => "group-instruct",
            Stage::Integrate => "integrate",
            Stage::Rebuild => "rebuild",
            Stage::Bundle => "bundle",
            Stage::ArchiveFonts => "archive-fonts",
            Stage::ArchiveCollections => "archive-collections",
        }
    }

    /// Pipeline pass (1-5) the stage belongs to; `None` for release archives.
    pub fn pass(self) -> Option<u8> {
        match self {
            Stage::Extract | Stage::ExtractedFont | Stage::Convert => Some(1),
            Stage::Autohint | Stage::HintedFont => Some(2),
            Stage::Dump | Stage::GroupHint | Stage::GroupInstruct => Some(3),
            Stage::Integrate => Some(4),
            Stage::Rebuild | Stage::Bundle => Some(5),
            Stage::ArchiveFonts | Stage::ArchiveCollections => None,
        }
    }
}

/// Identity of one task: stage, weight, and region for per-region stages.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskKey {
    pub stage: Stage,
    pub weight: Option<String>,
    pub region: Option<String>,
}

impl TaskKey {
    /// Group-level task covering every region of `weight`.
    pub fn weight(stage: Stage, weight: impl Into<String>) -> Self {
        Self { stage, weight: Some(weight.into()), region: None }
    }

    pub fn region(stage: Stage, weight: impl Into<String>, region: impl Into<String>) -> Self {
        Self { stage, weight: Some(weight.into()), region: Some(region.into()) }
    }

    /// Task spanning every weight.
    pub fn release(stage: Stage) -> Self {
        Self { stage, weight: None, region: None }
    }
}

impl fmt::Display for TaskKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stage.name())?;
        if let Some(weight) = &self.weight {
            write!(f, "::{weight}")?;
        }
        if let Some(region) = &self.region {
            write!(f, "::{region}")?;
        }
        Ok(())
    }
}

/// One unit of work inside a task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Step {
    CreateDir(PathBuf),
    Run(ToolCommand),
    Remove(PathBuf),
    /// Move `from` over `to` if `from` exists; absence is not an error.
    MoveIfPresent { from: PathBuf, to: PathBuf },
    AssertExists(PathBuf),
    /// Zip every file in `dir` matching `pattern` into `output`.
    Archive { output: PathBuf, dir: PathBuf, pattern: String },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::CreateDir(dir) => write!(f, "mkdir {}", dir.display()),
            Step::Run(cmd) => write!(f, "{cmd}"),
            Step::Remove(path) => write!(f, "rm {}", path.display()),
            Step::MoveIfPresent { from, to } => {
                write!(f, "mv {} {} (if present)", from.display(), to.display())
            }
            Step::AssertExists(path) => write!(f, "require {}", path.display()),
            Step::Archive { output, dir, pattern } => {
                write!(f, "zip {} {}", output.display(), dir.join(pattern).display())
            }
        }
    }
}

/// Declaration of one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskPlan {
    pub key: TaskKey,
    /// Tasks that must succeed first.
    pub needs: Vec<TaskKey>,
    /// Tasks that must have finished first, successfully or not.
    pub after: Vec<TaskKey>,
    /// Files whose content feeds the task fingerprint.
    pub inputs: Vec<PathBuf>,
    /// Files the task must leave behind.
    pub outputs: Vec<PathBuf>,
    /// Named configuration values the task depends on.
    pub oracles: Vec<(String, String)>,
    pub steps: Vec<Step>,
}

impl TaskPlan {
    pub fn new(key: TaskKey) -> Self {
        Self {
            key,
            needs: Vec::new(),
            after: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            oracles: Vec::new(),
            steps: Vec::new(),
        }
    }

    pub fn need(mut self, key: TaskKey) -> Self {
        self.needs.push(key);
        self
    }

    pub fn needs(mut self, keys: impl IntoIterator<Item = TaskKey>) -> Self {
        self.needs.extend(keys);
        self
    }

    pub fn after(mut self, keys: impl IntoIterator<Item = TaskKey>) -> Self {
        self.after.extend(keys);
        self
    }

    /// Every task this one is ordered behind.
    pub fn predecessors(&self) -> impl Iterator<Item = &TaskKey> {
        self.needs.iter().chain(&self.after)
    }

    pub fn input(mut self, path: PathBuf) -> Self {
        self.inputs.push(path);
        self
    }

    pub fn inputs(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.inputs.extend(paths);
        self
    }

    pub fn output(mut self, path: PathBuf) -> Self {
        self.outputs.push(path);
        self
    }

    pub fn outputs(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.outputs.extend(paths);
        self
    }

    pub fn oracle(mut self, name: &str, value: impl Into<String>) -> Self {
        self.oracles.push((name.to_string(), value.into()));
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    pub fn run(self, command: ToolCommand) -> Self {
        self.step(Step::Run(command))
    }

    /// Number of external commands this task would launch.
    pub fn command_count(&self) -> usize {
        self.steps.iter().filter(|s| matches!(s, Step::Run(_))).count()
    }
}

/// What a build is asked to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Target {
    /// Every loose per-region font.
    Fonts,
    /// Loose fonts plus one collection per weight.
    #[default]
    All,
    /// Everything plus the release archives.
    Release,
}

impl Target {
    pub fn roots(self, config: &Config) -> Vec<TaskKey> {
        match self {
            Target::Fonts => config
                .weights
                .iter()
                .flat_map(|w| {
                    config.regions.iter().map(move |r| TaskKey::region(Stage::Rebuild, w, r))
                })
                .collect(),
            Target::All => {
                config.weights.iter().map(|w| TaskKey::weight(Stage::Bundle, w)).collect()
            }
            Target::Release => vec![
                TaskKey::release(Stage::ArchiveFonts),
                TaskKey::release(Stage::ArchiveCollections),
            ],
        }
    }
}

/// All tasks reachable from the requested roots, grouped into waves.
///
/// Every task in a wave depends only on tasks from earlier waves.
#[derive(Debug, Clone)]
pub struct TaskGraph {
    nodes: BTreeMap<TaskKey, TaskPlan>,
    waves: Vec<Vec<TaskKey>>,
}

impl TaskGraph {
    pub fn plan(ctx: &BuildContext, roots: &[TaskKey]) -> Result<Self, PlanError> {
        let mut nodes = BTreeMap::new();
        let mut pending: Vec<TaskKey> = roots.to_vec();

        while let Some(key) = pending.pop() {
            if nodes.contains_key(&key) {
                continue;
            }
            let plan = declare(ctx, &key)?;
            pending.extend(plan.predecessors().filter(|k| !nodes.contains_key(*k)).cloned());
            nodes.insert(key, plan);
        }

        let waves = compute_waves(&nodes)?;
        Ok(Self { nodes, waves })
    }

    pub fn for_target(ctx: &BuildContext, target: Target) -> Result<Self, PlanError> {
        Self::plan(ctx, &target.roots(&ctx.config))
    }

    pub fn get(&self, key: &TaskKey) -> Option<&TaskPlan> {
        self.nodes.get(key)
    }

    pub fn contains(&self, key: &TaskKey) -> bool {
        self.nodes.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &TaskPlan> {
        self.nodes.values()
    }

    pub fn waves(&self) -> &[Vec<TaskKey>] {
        &self.waves
    }
}

fn compute_waves(nodes: &BTreeMap<TaskKey, TaskPlan>) -> Result<Vec<Vec<TaskKey>>, PlanError> {
    let mut graph = DiGraph::<&TaskKey, ()>::new();
    let indices: HashMap<&TaskKey, _> = nodes.keys().map(|k| (k, graph.add_node(k))).collect();

    for plan in nodes.values() {
        let dependent = indices[&plan.key];
        for pred in plan.predecessors() {
            graph.add_edge(indices[pred], dependent, ());
        }
    }

    let order = toposort(&graph, None)
        .map_err(|cycle| PlanError::Cycle(graph[cycle.node_id()].to_string()))?;

    let mut levels: HashMap<&TaskKey, usize> = HashMap::new();
    for idx in order {
        let key = graph[idx];
        let level = nodes[key].predecessors().map(|n| levels[n] + 1).max().unwrap_or(0);
        levels.insert(key, level);
    }

    let depth = levels.values().copied().max().map_or(0, |m| m + 1);
    let mut waves: Vec<Vec<TaskKey>> = vec![Vec::new(); depth];
    for key in nodes.keys() {
        waves[levels[key]].push(key.clone());
    }
    Ok(waves)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_display() {
        assert_eq!(TaskKey::weight(Stage::Autohint, "Bold").to_string(), "autohint::Bold");
        assert_eq!(
            TaskKey::region(Stage::Convert, "ExtraLight", "CN").to_string(),
            "convert::ExtraLight::CN"
        );
        assert_eq!(TaskKey::release(Stage::ArchiveFonts).to_string(), "archive-fonts");
    }

    #[test]
    fn test_keys_do_not_collide_across_fields() {
        // A weight containing "::" must not alias a (weight, region) pair.
        let a = TaskKey::weight(Stage::Convert, "Bold::CN");
        let b = TaskKey::region(Stage::Convert, "Bold", "CN");
        assert_ne!(a, b);
    }

    #[test]
    fn test_stage_passes() {
        assert_eq!(Stage::ExtractedFont.pass(), Some(1));
        assert_eq!(Stage::GroupInstruct.pass(), Some(3));
        assert_eq!(Stage::Bundle.pass(), Some(5));
        assert_eq!(Stage::ArchiveCollections.pass(), None);
    }

    #[test]
    fn test_waves_respect_needs() {
        let a = TaskKey::release(Stage::ArchiveFonts);
        let b = TaskKey::weight(Stage::Bundle, "Regular");
        let c = TaskKey::region(Stage::Rebuild, "Regular", "CN");
        let mut nodes = BTreeMap::new();
        nodes.insert(a.clone(), TaskPlan::new(a.clone()).need(b.clone()).need(c.clone()));
        nodes.insert(b.clone(), TaskPlan::new(b.clone()).need(c.clone()));
        nodes.insert(c.clone(), TaskPlan::new(c.clone()));

        let waves = compute_waves(&nodes).unwrap();
        assert_eq!(waves, vec![vec![c], vec![b], vec![a]]);
    }

    #[test]
    fn test_waves_respect_ordering_edges() {
        let hint = TaskKey::weight(Stage::GroupHint, "Bold");
        let instruct = TaskKey::weight(Stage::GroupInstruct, "Regular");
        let mut nodes = BTreeMap::new();
        nodes.insert(hint.clone(), TaskPlan::new(hint.clone()));
        nodes.insert(instruct.clone(), TaskPlan::new(instruct.clone()).after([hint.clone()]));

        let waves = compute_waves(&nodes).unwrap();
        assert_eq!(waves, vec![vec![hint], vec![instruct]]);
    }

    #[test]
    fn test_cycle_rejected() {
        let a = TaskKey::weight(Stage::Bundle, "Regular");
        let b = TaskKey::region(Stage::Rebuild, "Regular", "CN");
        let mut nodes = BTreeMap::new();
        nodes.insert(a.clone(), TaskPlan::new(a.clone()).need(b.clone()));
        nodes.insert(b.clone(), TaskPlan::new(b.clone()).need(a.clone()));

        assert!(matches!(compute_waves(&nodes), Err(PlanError::Cycle(_))));
    }
}
