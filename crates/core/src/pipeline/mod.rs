//! Build pipeline entry points.

mod clean;
mod env;

pub use clean::clean;
pub use env::{ToolStatus, check_env};

use anyhow::{Context, Result};

use crate::{
    context::BuildContext,
    engine::{BuildReport, Engine, TaskOutcome},
    graph::{TaskGraph, Target},
    io::glob_files,
    runner::CommandRunner,
};

const RULE: &str =
    "═══════════════════════════════════════════════════════════════════════════════";

/// Plan and run `target`, printing progress and a summary.
pub fn build(ctx: &BuildContext, target: Target, runner: &dyn CommandRunner) -> Result<BuildReport> {
    let graph = TaskGraph::for_target(ctx, target).context("Failed to plan build")?;

    println!("{RULE}");
    println!("{} Build Pipeline ({})", ctx.config.prefix, ctx.version.tag);
    println!("{RULE}");
    println!(
        "{} weights × {} regions: {} tasks in {} waves",
        ctx.config.weights.len(),
        ctx.config.regions.len(),
        graph.len(),
        graph.waves().len()
    );

    let mut engine = Engine::open(ctx.layout.journal(), runner);
    let report = engine.execute(&graph);

    print_summary(ctx, &report)?;
    Ok(report)
}

fn print_summary(ctx: &BuildContext, report: &BuildReport) -> Result<()> {
    println!("\n{RULE}");
    if report.is_success() {
        println!("✨ Build complete in {:.2}s", report.elapsed.as_secs_f64());
    } else {
        println!("Build failed after {:.2}s", report.elapsed.as_secs_f64());
    }
    println!(
        "   Tasks: {} executed, {} cached, {} failed, {} skipped",
        report.executed(),
        report.cached(),
        report.failures().len(),
        report.skipped()
    );

    for (key, err) in report.failures() {
        println!("   ✗ {key}: {err}");
    }
    for (key, outcome) in report.outcomes() {
        if let TaskOutcome::Skipped { failed_dependency } = outcome {
            log::debug!("{key} skipped because {failed_dependency} failed");
        }
    }

    let fonts = glob_files(&ctx.layout.fonts_out, "*.ttf")?.len();
    let collections = glob_files(&ctx.layout.collections_out, "*.ttc")?.len();
    println!("   Output: {fonts} fonts, {collections} collections");
    println!("{RULE}");
    Ok(())
}

/// Print the planned waves without running anything.
pub fn dry_run(ctx: &BuildContext, target: Target) -> Result<TaskGraph> {
    let graph = TaskGraph::for_target(ctx, target).context("Failed to plan build")?;
    let total = graph.waves().len();

    for (index, wave) in graph.waves().iter().enumerate() {
        println!("\n[{}/{total}] {} tasks", index + 1, wave.len());
        for plan in wave.iter().filter_map(|key| graph.get(key)) {
            match plan.key.stage.pass() {
                Some(pass) => println!("  {} (pass {pass})", plan.key),
                None => println!("  {} (release)", plan.key),
            }
            for step in &plan.steps {
                println!("      {step}");
            }
        }
    }

    let commands: usize = graph.tasks().map(|p| p.command_count()).sum();
    println!("\n{} tasks, {commands} commands", graph.len());
    Ok(graph)
}

/// The planned graph as JSON, one entry per task in wave order.
pub fn plan_json(ctx: &BuildContext, target: Target) -> Result<String> {
    let graph = TaskGraph::for_target(ctx, target).context("Failed to plan build")?;
    let plans: Vec<_> = graph.waves().iter().flatten().filter_map(|key| graph.get(key)).collect();
    serde_json::to_string_pretty(&plans).context("Failed to serialize plan")
}
