use anyhow::{Context, Result, bail};
use hanttf_core::{BuildContext, Config, ProcessRunner, ReleaseVersion, dry_run, plan_json};

use crate::cli::BuildArgs;

pub fn build(args: BuildArgs) -> Result<()> {
    let config = Config::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    let version = ReleaseVersion::parse(args.version.as_deref())?;
    let mut ctx = BuildContext::new(config, args.layout.layout())?.with_version(version);
    if let Some(jobs) = args.hint_jobs {
        ctx = ctx.with_hint_jobs(jobs);
    }
    let target = args.target.into();

    if args.json {
        println!("{}", plan_json(&ctx, target)?);
        return Ok(());
    }
    if args.dry_run {
        dry_run(&ctx, target)?;
        return Ok(());
    }

    let report = hanttf_core::build(&ctx, target, &ProcessRunner)?;
    if !report.is_success() {
        bail!(
            "build failed: {} tasks failed, {} skipped",
            report.failures().len(),
            report.skipped()
        );
    }
    Ok(())
}
