//! End-to-end pipeline runs against a simulated toolchain.

use std::{
    fs::{copy, create_dir_all, read_to_string, write},
    io,
    path::Path,
    sync::Mutex,
    thread::sleep,
    time::{Duration, Instant},
};

use hanttf_core::{
    BuildContext, BuildReport, CommandRunner, Config, Layout, ReleaseVersion, Stage, TaskGraph,
    TaskKey, TaskOutcome, Target, Tool, ToolCommand, ToolOutput, Toolchain,
};
use hanttf_font_naming::{Locale, Naming};
use tempfile::TempDir;

/// Records every invocation and reproduces each tool's file contract.
///
/// Collections are text files listing their member file names, one per line.
#[derive(Default)]
struct FakeRunner {
    calls: Mutex<Vec<ToolCommand>>,
    fail: Option<(&'static str, &'static str)>,
    slow: Option<(&'static str, &'static str, Duration)>,
    /// Start and end of every invocation.
    timeline: Mutex<Vec<(ToolCommand, Instant, Instant)>>,
}

impl FakeRunner {
    /// Fail any `program` invocation with an argument containing `needle`.
    fn failing(program: &'static str, needle: &'static str) -> Self {
        Self { fail: Some((program, needle)), ..Self::default() }
    }

    /// Delay any `program` invocation with an argument containing `needle`.
    fn slow(program: &'static str, needle: &'static str, delay: Duration) -> Self {
        Self { slow: Some((program, needle, delay)), ..Self::default() }
    }

    fn timeline(&self) -> Vec<(ToolCommand, Instant, Instant)> {
        self.timeline.lock().unwrap().clone()
    }

    fn calls(&self) -> Vec<ToolCommand> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, command: &ToolCommand) -> io::Result<ToolOutput> {
        self.calls.lock().unwrap().push(command.clone());
        let start = Instant::now();

        if let Some((program, needle, delay)) = self.slow
            && command.program == program
            && command.args.iter().any(|a| a.contains(needle))
        {
            sleep(delay);
        }

        if let Some((program, needle)) = self.fail
            && command.program == program
            && command.args.iter().any(|a| a.contains(needle))
        {
            return Ok(ToolOutput::failure(1, "injected failure"));
        }

        simulate(command)?;
        self.timeline.lock().unwrap().push((command.clone(), start, Instant::now()));
        Ok(ToolOutput::success())
    }
}

fn simulate(command: &ToolCommand) -> io::Result<()> {
    let args = &command.args;
    match command.program.as_str() {
        "split" => {
            let collection = Path::new(&args[0]);
            let dir = collection.parent().unwrap();
            for member in read_to_string(collection)?.lines().filter(|l| !l.is_empty()) {
                write(dir.join(member), format!("{member}\n"))?;
            }
        }
        "merge" => {
            let names: Vec<&str> = args[2..]
                .iter()
                .filter_map(|a| Path::new(a).file_name()?.to_str())
                .collect();
            write(&args[1], names.join("\n"))?;
        }
        "autohint" => {
            copy(&args[0], &args[1])?;
        }
        "hinter" => match args[0].as_str() {
            "hint" => {
                for pair in args[7..].chunks(2) {
                    write(&pair[1], format!("hints for {}", pair[0]))?;
                }
            }
            "instruct" => {
                for triple in args[3..].chunks(3) {
                    write(&triple[2], format!("instructions for {}", triple[0]))?;
                }
            }
            "integrate" => write(&args[5], format!("{} + {}", args[3], args[4]))?,
            other => return Err(io::Error::other(format!("unknown subcommand {other}"))),
        },
        _ => {
            let index = args.iter().position(|a| a == "-o").unwrap();
            write(&args[index + 1], command.to_string())?;
        }
    }
    Ok(())
}

fn tools() -> Toolchain {
    Toolchain {
        splitter: Tool::new("split"),
        converter: Tool::new("convert"),
        merger: Tool::new("merge"),
        autohinter: Tool::new("autohint"),
        dumper: Tool::new("dump"),
        rebuilder: Tool::new("rebuild"),
        hinter: Tool::new("hinter"),
        bundler: Tool::new("bundle"),
    }
}

fn config() -> Config {
    Config {
        prefix: "SHSans".to_string(),
        weights: vec!["Regular".to_string(), "Bold".to_string()],
        regions: vec!["CN".to_string(), "TW".to_string()],
        all_regions: vec!["CN".to_string(), "TW".to_string(), "HC".to_string()],
        naming: Naming {
            family_name: Locale::ALL
                .into_iter()
                .map(|l| (l, "Source Han Sans".to_string()))
                .collect(),
            ..Naming::default()
        },
    }
}

/// Write a master collection for `weight` embedding `regions`.
fn write_source(layout: &Layout, weight: &str, regions: &[&str]) {
    let members: Vec<String> = regions.iter().map(|r| format!("SHSans{r}-{weight}.otf")).collect();
    write(layout.src.join(format!("SHSans-{weight}.ttc")), members.join("\n")).unwrap();
}

fn fixture() -> (TempDir, BuildContext) {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::rooted(root.path());
    create_dir_all(&layout.src).unwrap();
    create_dir_all(&layout.hint_config).unwrap();

    let config = config();
    for weight in &config.weights {
        write_source(&layout, weight, &["CN", "TW", "HC"]);
        write(layout.hint_params(weight), r#"{"targetUpm": 1000}"#).unwrap();
    }

    let ctx = BuildContext::new(config, layout)
        .unwrap()
        .with_tools(tools())
        .with_hint_jobs(2)
        .with_version(ReleaseVersion::parse(Some("2024-01-15")).unwrap());
    (root, ctx)
}

fn build(ctx: &BuildContext, target: Target, runner: &FakeRunner) -> BuildReport {
    hanttf_core::build(ctx, target, runner).unwrap()
}

fn count_files(dir: &Path, ext: &str) -> usize {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().is_some_and(|x| x == ext))
            .count(),
        Err(_) => 0,
    }
}

#[test]
fn test_full_build_produces_every_output() {
    let (_root, ctx) = fixture();
    let runner = FakeRunner::default();
    let report = build(&ctx, Target::All, &runner);

    assert!(report.is_success());
    assert_eq!(count_files(&ctx.layout.fonts_out, "ttf"), 4);
    assert_eq!(count_files(&ctx.layout.collections_out, "ttc"), 2);
    assert!(ctx.layout.fonts_out.join("SHSansTW-Bold.ttf").exists());
    assert!(ctx.layout.collections_out.join("SHSans-Regular.ttc").exists());

    // The scratch collection is consumed and removed on success.
    assert!(!ctx.layout.pass2().join("SHSans-Bold.temp.ttc").exists());
}

#[test]
fn test_second_build_runs_nothing() {
    let (_root, ctx) = fixture();
    assert!(build(&ctx, Target::All, &FakeRunner::default()).is_success());

    let runner = FakeRunner::default();
    let report = build(&ctx, Target::All, &runner);

    assert!(report.is_success());
    assert!(runner.calls().is_empty());
    assert_eq!(report.executed(), 0);
}

#[test]
fn test_changed_hint_params_rerun_hinting_only() {
    let (_root, ctx) = fixture();
    assert!(build(&ctx, Target::All, &FakeRunner::default()).is_success());

    write(ctx.layout.hint_params("Bold"), r#"{"targetUpm": 2048}"#).unwrap();
    let runner = FakeRunner::default();
    assert!(build(&ctx, Target::All, &runner).is_success());

    let calls = runner.calls();
    assert!(calls.iter().all(|c| c.program != "autohint" && c.program != "dump"));
    assert!(calls.iter().any(|c| {
        c.args.first().is_some_and(|a| a == "hint") && c.to_string().contains("Bold.json")
    }));
    assert!(calls.iter().all(|c| !c.to_string().contains("Regular.json")));
}

#[test]
fn test_unbundled_region_extracted_but_not_converted() {
    let (_root, ctx) = fixture();
    let graph = TaskGraph::for_target(&ctx, Target::All).unwrap();
    assert!(!graph.contains(&TaskKey::region(Stage::Convert, "Bold", "HC")));
    assert!(graph.contains(&TaskKey::region(Stage::Convert, "Bold", "TW")));

    let runner = FakeRunner::default();
    assert!(build(&ctx, Target::All, &runner).is_success());
    assert!(ctx.layout.pass1().join("SHSansHC-Bold.otf").exists());
    assert!(!ctx.layout.pass1().join("SHSansHC-Bold.ttf").exists());
    assert!(runner.calls().iter().all(|c| !c.to_string().contains("SHSansHC-Bold.ttf")));
}

#[test]
fn test_autohint_failure_is_isolated_to_its_weight() {
    let (_root, ctx) = fixture();
    let runner = FakeRunner::failing("autohint", "SHSans-Bold");
    let report = build(&ctx, Target::All, &runner);

    assert!(!report.is_success());
    let autohint = TaskKey::weight(Stage::Autohint, "Bold");
    assert!(matches!(report.outcome(&autohint), Some(TaskOutcome::Failed(_))));
    match report.outcome(&TaskKey::region(Stage::Rebuild, "Bold", "CN")) {
        Some(TaskOutcome::Skipped { failed_dependency }) => assert_eq!(failed_dependency, &autohint),
        other => panic!("unexpected outcome: {other:?}"),
    }

    // Failed weight: no downstream artifacts, scratch collection left behind.
    assert!(ctx.layout.pass2().join("SHSans-Bold.temp.ttc").exists());
    assert!(!ctx.layout.pass2().join("SHSans-Bold.ttc").exists());
    assert!(!ctx.layout.fonts_out.join("SHSansCN-Bold.ttf").exists());
    assert!(!ctx.layout.collections_out.join("SHSans-Bold.ttc").exists());

    // Other weight completes despite the cross-weight instruction barrier.
    assert!(ctx.layout.fonts_out.join("SHSansCN-Regular.ttf").exists());
    assert!(ctx.layout.fonts_out.join("SHSansTW-Regular.ttf").exists());
    assert!(ctx.layout.collections_out.join("SHSans-Regular.ttc").exists());
}

#[test]
fn test_rerun_after_failure_redoes_failed_weight_only() {
    let (_root, ctx) = fixture();
    assert!(!build(&ctx, Target::All, &FakeRunner::failing("autohint", "SHSans-Bold")).is_success());

    let runner = FakeRunner::default();
    let report = build(&ctx, Target::All, &runner);

    assert!(report.is_success());
    let calls = runner.calls();
    assert!(!calls.is_empty());
    assert!(calls.iter().all(|c| c.to_string().contains("Bold")));
    // Extraction and conversion of the failed weight had already succeeded.
    assert!(calls.iter().all(|c| !c.args.iter().any(|a| Path::new(a).starts_with(&ctx.layout.src))));
    assert!(calls.iter().all(|c| c.program != "convert"));
    assert!(!ctx.layout.pass2().join("SHSans-Bold.temp.ttc").exists());
}

#[test]
fn test_group_instruct_waits_for_every_weight() {
    let (_root, ctx) = fixture();
    let graph = TaskGraph::for_target(&ctx, Target::All).unwrap();

    let instruct = graph.get(&TaskKey::weight(Stage::GroupInstruct, "Regular")).unwrap();
    assert!(instruct.needs.contains(&TaskKey::weight(Stage::GroupHint, "Regular")));
    assert!(instruct.after.contains(&TaskKey::weight(Stage::GroupHint, "Bold")));

    let wave_of = |key: &TaskKey| graph.waves().iter().position(|w| w.contains(key)).unwrap();
    for weight in ["Regular", "Bold"] {
        assert!(
            wave_of(&TaskKey::weight(Stage::GroupHint, weight))
                < wave_of(&TaskKey::weight(Stage::GroupInstruct, "Regular"))
        );
    }
}

#[test]
fn test_slow_extraction_does_not_hold_back_other_weights() {
    let (_root, ctx) = fixture();
    let runner = FakeRunner::slow("split", "SHSans-Bold.ttc", Duration::from_millis(800));

    let pool = rayon::ThreadPoolBuilder::new().num_threads(4).build().unwrap();
    let report = pool.install(|| build(&ctx, Target::All, &runner));
    assert!(report.is_success());

    let timeline = runner.timeline();
    let bold_split_end = timeline
        .iter()
        .find(|(c, ..)| {
            c.program == "split"
                && Path::new(&c.args[0]).starts_with(&ctx.layout.src)
                && c.args[0].contains("SHSans-Bold.ttc")
        })
        .map(|(_, _, end)| *end)
        .unwrap();
    let regular_convert_start = timeline
        .iter()
        .filter(|(c, ..)| c.program == "convert" && c.args.iter().any(|a| a.contains("-Regular")))
        .map(|(_, start, _)| *start)
        .min()
        .unwrap();
    assert!(regular_convert_start < bold_split_end);
}

#[test]
fn test_missing_region_in_source_fails_that_branch() {
    let (_root, ctx) = fixture();
    write_source(&ctx.layout, "Bold", &["CN"]);

    let runner = FakeRunner::default();
    let report = build(&ctx, Target::All, &runner);

    assert!(!report.is_success());
    let extracted = TaskKey::region(Stage::ExtractedFont, "Bold", "TW");
    assert!(matches!(report.outcome(&extracted), Some(TaskOutcome::Failed(_))));
    assert!(matches!(
        report.outcome(&TaskKey::weight(Stage::Extract, "Bold")),
        Some(TaskOutcome::Executed { .. })
    ));
    assert!(matches!(
        report.outcome(&TaskKey::region(Stage::Convert, "Bold", "CN")),
        Some(TaskOutcome::Executed { .. })
    ));
    assert!(matches!(
        report.outcome(&TaskKey::region(Stage::Convert, "Bold", "TW")),
        Some(TaskOutcome::Skipped { .. })
    ));
    assert!(ctx.layout.collections_out.join("SHSans-Regular.ttc").exists());
}

#[test]
fn test_fonts_target_skips_bundling() {
    let (_root, ctx) = fixture();
    let runner = FakeRunner::default();
    assert!(build(&ctx, Target::Fonts, &runner).is_success());

    assert_eq!(count_files(&ctx.layout.fonts_out, "ttf"), 4);
    assert_eq!(count_files(&ctx.layout.collections_out, "ttc"), 0);
    assert!(runner.calls().iter().all(|c| c.program != "bundle"));
}

#[test]
fn test_release_writes_both_archives() {
    let (_root, ctx) = fixture();
    let report = build(&ctx, Target::Release, &FakeRunner::default());

    assert!(report.is_success());
    assert!(ctx.layout.release.join("SHSans-TTF-2024-01-15.zip").exists());
    assert!(ctx.layout.release.join("SHSans-TTC-2024-01-15.zip").exists());
}

#[test]
fn test_plan_json_lists_every_task() {
    let (_root, ctx) = fixture();
    let graph = TaskGraph::for_target(&ctx, Target::All).unwrap();
    let json = hanttf_core::plan_json(&ctx, Target::All).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value.as_array().unwrap().len(), graph.len());
}

#[test]
fn test_missing_hint_params_is_config_error() {
    let root = tempfile::tempdir().unwrap();
    let layout = Layout::rooted(root.path());
    let err = BuildContext::new(config(), layout).unwrap_err();
    assert!(matches!(err, hanttf_core::ConfigError::MissingHintConfig { .. }));
}
