use std::path::Path;

use anyhow::{Context, Result, bail};
use hanttf_core::Config;
use hanttf_font_naming::rename_font;
use log::info;

pub fn rename(config: &Path, from: &Path, to: &Path, weight: &str, region: &str) -> Result<()> {
    let config =
        Config::load(config).with_context(|| format!("Failed to load {}", config.display()))?;
    if !config.all_regions.iter().any(|r| r == region) {
        bail!("region '{region}' is not listed in allRegions");
    }

    rename_font(from, to, &config.prefix, &config.naming, weight, region)
        .with_context(|| format!("Failed to rename {}", from.display()))?;
    info!("{} -> {} ({weight}, {region})", from.display(), to.display());
    println!("  ✓ {}", to.display());
    Ok(())
}
