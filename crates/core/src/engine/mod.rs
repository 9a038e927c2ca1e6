//! Incremental task execution.
//!
//! The engine starts every task of a [`TaskGraph`] as soon as the tasks it is
//! ordered behind have finished, so independent branches never wait on each
//! other. A task is skipped when its fingerprint matches the one recorded in
//! the [`Journal`] and everything it produced last time is still on disk. A
//! failed task takes its dependents down with it; unrelated branches keep
//! going.

mod archive;
mod journal;
mod steps;

use std::{
    collections::{BTreeMap, HashMap},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard, PoisonError},
    time::{Duration, Instant},
};

use blake3::Hasher;
use log::{debug, error, info, warn};
use rayon::Scope;

pub use archive::write_archive;
pub use journal::{Journal, JournalEntry};
pub use steps::run_step;

use crate::{
    error::TaskError,
    graph::{TaskGraph, TaskKey, TaskPlan},
    io::{ensure_parent_dir, hash_file},
    runner::CommandRunner,
};

/// How a task ended up in this build.
#[derive(Debug)]
pub enum TaskOutcome {
    Executed { duration: Duration },
    /// Up to date from an earlier build.
    Cached,
    Failed(TaskError),
    /// Not attempted because a task it depends on failed.
    Skipped { failed_dependency: TaskKey },
}

impl TaskOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskOutcome::Executed { .. } | TaskOutcome::Cached)
    }
}

/// Outcome of every task in one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    outcomes: BTreeMap<TaskKey, TaskOutcome>,
    pub elapsed: Duration,
}

impl BuildReport {
    pub fn outcome(&self, key: &TaskKey) -> Option<&TaskOutcome> {
        self.outcomes.get(key)
    }

    pub fn outcomes(&self) -> impl Iterator<Item = (&TaskKey, &TaskOutcome)> {
        self.outcomes.iter()
    }

    pub fn executed(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Executed { .. }))
    }

    pub fn cached(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Cached))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, TaskOutcome::Skipped { .. }))
    }

    pub fn failures(&self) -> Vec<(&TaskKey, &TaskError)> {
        self.outcomes
            .iter()
            .filter_map(|(key, outcome)| match outcome {
                TaskOutcome::Failed(err) => Some((key, err)),
                _ => None,
            })
            .collect()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.values().all(TaskOutcome::is_ok)
    }

    fn count(&self, pred: impl Fn(&TaskOutcome) -> bool) -> usize {
        self.outcomes.values().filter(|o| pred(o)).count()
    }
}

enum Realized {
    Cached,
    Executed { duration: Duration, entry: JournalEntry },
}

/// Mutable state shared by the tasks of one build.
struct Progress<'g> {
    outcomes: BTreeMap<TaskKey, TaskOutcome>,
    journal: Journal,
    /// Predecessors each task is still waiting for.
    waiting: HashMap<&'g TaskKey, usize>,
}

struct Run<'g> {
    graph: &'g TaskGraph,
    dependents: HashMap<&'g TaskKey, Vec<&'g TaskKey>>,
    progress: Mutex<Progress<'g>>,
}

impl<'g> Run<'g> {
    fn new(graph: &'g TaskGraph, journal: Journal) -> Self {
        let mut dependents: HashMap<&TaskKey, Vec<&TaskKey>> = HashMap::new();
        let mut waiting = HashMap::new();
        for plan in graph.tasks() {
            waiting.insert(&plan.key, plan.predecessors().count());
            for pred in plan.predecessors() {
                dependents.entry(pred).or_default().push(&plan.key);
            }
        }

        let progress = Progress { outcomes: BTreeMap::new(), journal, waiting };
        Self { graph, dependents, progress: Mutex::new(progress) }
    }

    fn lock(&self) -> MutexGuard<'_, Progress<'g>> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Tasks with nothing to wait for.
    fn ready(&self) -> Vec<&'g TaskKey> {
        self.graph.tasks().filter(|p| p.predecessors().next().is_none()).map(|p| &p.key).collect()
    }

    /// Record the outcome of `key` and return the tasks it unblocked.
    fn finish(
        &self,
        key: &'g TaskKey,
        outcome: TaskOutcome,
        entry: Option<JournalEntry>,
        journal_path: &Path,
    ) -> Vec<&'g TaskKey> {
        let mut progress = self.lock();

        let changed = match (&outcome, entry) {
            (TaskOutcome::Executed { .. }, Some(entry)) => {
                progress.journal.record(key.clone(), entry);
                true
            }
            (TaskOutcome::Failed(_), _) => {
                progress.journal.forget(key);
                true
            }
            _ => false,
        };
        if changed && let Err(e) = progress.journal.save(journal_path) {
            warn!("failed to save journal {}: {e}", journal_path.display());
        }
        progress.outcomes.insert(key.clone(), outcome);

        let mut ready = Vec::new();
        for &next in self.dependents.get(key).into_iter().flatten() {
            if let Some(count) = progress.waiting.get_mut(next) {
                *count -= 1;
                if *count == 0 {
                    ready.push(next);
                }
            }
        }
        ready
    }
}

pub struct Engine<'r> {
    runner: &'r dyn CommandRunner,
    journal_path: PathBuf,
    journal: Journal,
}

impl<'r> Engine<'r> {
    /// Create an engine backed by the journal at `journal_path`.
    pub fn open(journal_path: impl Into<PathBuf>, runner: &'r dyn CommandRunner) -> Self {
        let journal_path = journal_path.into();
        let journal = Journal::load(&journal_path);
        debug!("journal {}: {} entries", journal_path.display(), journal.len());
        Self { runner, journal_path, journal }
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    pub fn execute(&mut self, graph: &TaskGraph) -> BuildReport {
        let start = Instant::now();
        let run = Run::new(graph, std::mem::take(&mut self.journal));

        let engine = &*self;
        rayon::scope(|scope| {
            for key in run.ready() {
                engine.spawn(scope, &run, key);
            }
        });

        let progress = run.progress.into_inner().unwrap_or_else(PoisonError::into_inner);
        self.journal = progress.journal;
        BuildReport { outcomes: progress.outcomes, elapsed: start.elapsed() }
    }

    fn spawn<'s, 'g: 's>(&'s self, scope: &Scope<'s>, run: &'s Run<'g>, key: &'g TaskKey) {
        scope.spawn(move |scope| {
            let Some(plan) = run.graph.get(key) else {
                return;
            };
            let (outcome, entry) = self.attempt(plan, run);
            for next in run.finish(key, outcome, entry, &self.journal_path) {
                self.spawn(scope, run, next);
            }
        });
    }

    fn attempt(&self, plan: &TaskPlan, run: &Run<'_>) -> (TaskOutcome, Option<JournalEntry>) {
        let key = &plan.key;

        let blocked = blocking_failure(plan, &run.lock().outcomes);
        if let Some(failed_dependency) = blocked {
            warn!("{key} skipped: {failed_dependency} failed");
            return (TaskOutcome::Skipped { failed_dependency }, None);
        }

        match self.realize(plan, run) {
            Ok(Realized::Cached) => {
                debug!("{key} up to date");
                (TaskOutcome::Cached, None)
            }
            Ok(Realized::Executed { duration, entry }) => {
                if plan.command_count() > 0 {
                    println!("  ✓ {key} ({:.2}s)", duration.as_secs_f64());
                }
                (TaskOutcome::Executed { duration }, Some(entry))
            }
            Err(err) => {
                println!("  ✗ {key}");
                error!("{key} failed: {err}");
                (TaskOutcome::Failed(err), None)
            }
        }
    }

    fn realize(&self, plan: &TaskPlan, run: &Run<'_>) -> Result<Realized, TaskError> {
        let fingerprint = fingerprint(plan)?;
        if run.lock().journal.is_fresh(&plan.key, &fingerprint) {
            return Ok(Realized::Cached);
        }

        info!("{}", plan.key);
        let start = Instant::now();
        for output in &plan.outputs {
            ensure_parent_dir(output)?;
        }

        let mut produced = plan.outputs.clone();
        for step in &plan.steps {
            debug!("{}: {step}", plan.key);
            for path in run_step(step, self.runner)? {
                if !produced.contains(&path) {
                    produced.push(path);
                }
            }
        }

        if let Some(missing) = plan.outputs.iter().find(|p| !p.exists()) {
            return Err(TaskError::MissingOutput(missing.clone()));
        }

        Ok(Realized::Executed {
            duration: start.elapsed(),
            entry: JournalEntry { fingerprint, outputs: produced },
        })
    }
}

/// The failed task that prevents `plan` from running, if any.
fn blocking_failure(plan: &TaskPlan, done: &BTreeMap<TaskKey, TaskOutcome>) -> Option<TaskKey> {
    plan.needs.iter().find_map(|need| match done.get(need) {
        Some(TaskOutcome::Failed(_)) => Some(need.clone()),
        Some(TaskOutcome::Skipped { failed_dependency }) => Some(failed_dependency.clone()),
        _ => None,
    })
}

/// Fingerprint of everything a task's result depends on.
///
/// Covers the key, the exact steps (and therefore every command line), the
/// named oracles and the content of every input file.
pub fn fingerprint(plan: &TaskPlan) -> Result<String, TaskError> {
    let mut hasher = Hasher::new();
    field(&mut hasher, format!("{:?}", plan.key).as_bytes());
    for step in &plan.steps {
        field(&mut hasher, format!("{step:?}").as_bytes());
    }
    for (name, value) in &plan.oracles {
        field(&mut hasher, name.as_bytes());
        field(&mut hasher, value.as_bytes());
    }
    for input in &plan.inputs {
        field(&mut hasher, input.to_string_lossy().as_bytes());
        field(&mut hasher, hash_file(input)?.as_bytes());
    }
    Ok(hasher.finalize().to_hex().to_string())
}

fn field(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(bytes);
    hasher.update(&[0]);
}

#[cfg(test)]
mod tests {
    use std::fs::write;

    use super::*;
    use crate::graph::{Stage, Step};

    #[test]
    fn test_fingerprint_tracks_input_content() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("SHSansCN-Bold.otd");
        write(&input, b"one").unwrap();

        let plan = TaskPlan::new(TaskKey::region(Stage::Integrate, "Bold", "CN")).input(input.clone());
        let first = fingerprint(&plan).unwrap();
        assert_eq!(first, fingerprint(&plan).unwrap());

        write(&input, b"two").unwrap();
        assert_ne!(first, fingerprint(&plan).unwrap());
    }

    #[test]
    fn test_fingerprint_tracks_steps_and_oracles() {
        let key = TaskKey::weight(Stage::GroupHint, "Bold");
        let base = TaskPlan::new(key.clone()).oracle("hint-jobs", "4");
        let more_jobs = TaskPlan::new(key.clone()).oracle("hint-jobs", "8");
        let extra_step = base.clone().step(Step::CreateDir(PathBuf::from("build/pass3")));

        let fp = fingerprint(&base).unwrap();
        assert_ne!(fp, fingerprint(&more_jobs).unwrap());
        assert_ne!(fp, fingerprint(&extra_step).unwrap());
    }

    #[test]
    fn test_fingerprint_missing_input() {
        let plan = TaskPlan::new(TaskKey::weight(Stage::Extract, "Bold"))
            .input(PathBuf::from("/nonexistent/SHSans-Bold.ttc"));
        assert!(matches!(fingerprint(&plan), Err(TaskError::MissingInput(_))));
    }

    #[test]
    fn test_skip_reports_root_failure() {
        let root = TaskKey::weight(Stage::Autohint, "Bold");
        let middle = TaskKey::region(Stage::HintedFont, "Bold", "CN");
        let leaf = TaskKey::region(Stage::Dump, "Bold", "CN");

        let mut done = BTreeMap::new();
        done.insert(root.clone(), TaskOutcome::Failed(TaskError::MissingOutput(PathBuf::new())));
        done.insert(middle.clone(), TaskOutcome::Skipped { failed_dependency: root.clone() });

        let plan = TaskPlan::new(leaf).need(middle);
        assert_eq!(blocking_failure(&plan, &done), Some(root));
    }
}
