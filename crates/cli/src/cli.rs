//! CLI definitions and command dispatch.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hanttf_core::{Layout, Target, Toolchain, check_env, clean};

use crate::commands::{build, rename};

#[derive(Parser)]
#[command(name = "hanttf")]
#[command(about = "Build hinted regional TrueType fonts from master font collections")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, clap::Args)]
pub struct LayoutArgs {
    /// Directory holding one master collection per weight
    #[arg(long, default_value = "src")]
    pub src_dir: PathBuf,
    #[arg(long, default_value = "build")]
    pub build_dir: PathBuf,
    /// Output root; loose fonts go to `ttf/`, collections to `ttc/`
    #[arg(long, default_value = "out")]
    pub out_dir: PathBuf,
    /// Directory holding `<weight>.json` hint parameters
    #[arg(long, default_value = "hint-config")]
    pub hint_config: PathBuf,
    #[arg(long, default_value = "release")]
    pub release_dir: PathBuf,
}

impl LayoutArgs {
    pub fn layout(&self) -> Layout {
        Layout {
            src: self.src_dir.clone(),
            build: self.build_dir.clone(),
            fonts_out: self.out_dir.join("ttf"),
            collections_out: self.out_dir.join("ttc"),
            hint_config: self.hint_config.clone(),
            release: self.release_dir.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum TargetArg {
    /// Loose per-region fonts
    Fonts,
    /// Loose fonts and per-weight collections
    #[default]
    All,
    /// Everything plus zip archives
    Release,
}

impl From<TargetArg> for Target {
    fn from(arg: TargetArg) -> Self {
        match arg {
            TargetArg::Fonts => Target::Fonts,
            TargetArg::All => Target::All,
            TargetArg::Release => Target::Release,
        }
    }
}

#[derive(Debug, Clone, clap::Args)]
pub struct BuildArgs {
    #[arg(short, long, default_value = "config.json")]
    pub config: PathBuf,
    #[command(flatten)]
    pub layout: LayoutArgs,
    #[arg(short, long, value_enum, default_value_t)]
    pub target: TargetArg,
    /// Release version (YYYY-MM-DD or YYYY-MM-DD.N), defaults to today
    #[arg(short, long)]
    pub version: Option<String>,
    /// Worker count for group hinting, defaults to the CPU count
    #[arg(short = 'j', long)]
    pub hint_jobs: Option<usize>,
    /// Print the planned tasks without running them
    #[arg(long)]
    pub dry_run: bool,
    /// Print the planned tasks as JSON without running them
    #[arg(long, conflicts_with = "dry_run")]
    pub json: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    Build {
        #[command(flatten)]
        args: BuildArgs,
    },
    /// Report which external tools resolve on PATH
    CheckEnv,
    /// Replace a font's name table with the records for one weight and region
    Rename {
        #[arg(short, long, default_value = "config.json")]
        config: PathBuf,
        #[arg(long)]
        from: PathBuf,
        #[arg(long)]
        to: PathBuf,
        #[arg(long)]
        weight: String,
        #[arg(long)]
        region: String,
    },
    Clean {
        #[command(flatten)]
        layout: LayoutArgs,
    },
}

impl Commands {
    pub fn run(self) -> Result<()> {
        match self {
            Commands::Build { args } => build(args)?,
            Commands::CheckEnv => {
                check_env(&Toolchain::default());
            }
            Commands::Rename { config, from, to, weight, region } => {
                rename(&config, &from, &to, &weight, &region)?;
            }
            Commands::Clean { layout } => {
                clean(&layout.layout())?;
            }
        }
        Ok(())
    }
}
