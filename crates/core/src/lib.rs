//! hanttf core - incremental hinting pipeline for regional font collections.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod graph;
pub mod io;
pub mod pipeline;
pub mod runner;
pub mod version;

pub use config::Config;
pub use context::{BuildContext, Layout, Tool, Toolchain};
pub use engine::{BuildReport, Engine, TaskOutcome};
pub use error::{ConfigError, PlanError, TaskError};
pub use graph::{Stage, Step, TaskGraph, TaskKey, TaskPlan, Target};
pub use pipeline::{build, check_env, clean, dry_run, plan_json};
pub use runner::{CommandRunner, ProcessRunner, ToolCommand, ToolOutput};
pub use version::ReleaseVersion;
