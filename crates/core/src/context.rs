//! Immutable build context threaded through graph construction.

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
    thread::available_parallelism,
};

use serde::Serialize;

use crate::{config::Config, error::ConfigError, runner::ToolCommand, version::ReleaseVersion};

/// Directory layout of one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    /// Master collections, one per weight.
    pub src: PathBuf,
    /// Intermediate passes and the journal.
    pub build: PathBuf,
    /// Loose per-region fonts.
    pub fonts_out: PathBuf,
    /// Per-weight collections.
    pub collections_out: PathBuf,
    /// Per-weight hint parameter files.
    pub hint_config: PathBuf,
    /// Release archives.
    pub release: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::rooted(Path::new(""))
    }
}

impl Layout {
    /// Default layout below `root`.
    pub fn rooted(root: &Path) -> Self {
        Self {
            src: root.join("src"),
            build: root.join("build"),
            fonts_out: root.join("out").join("ttf"),
            collections_out: root.join("out").join("ttc"),
            hint_config: root.join("hint-config"),
            release: root.join("release"),
        }
    }

    pub fn pass1(&self) -> PathBuf {
        self.build.join("pass1")
    }

    pub fn pass2(&self) -> PathBuf {
        self.build.join("pass2")
    }

    pub fn pass3(&self) -> PathBuf {
        self.build.join("pass3")
    }

    pub fn pass4(&self) -> PathBuf {
        self.build.join("pass4")
    }

    pub fn journal(&self) -> PathBuf {
        self.build.join(".hanttf-journal.json")
    }

    pub fn hint_params(&self, weight: &str) -> PathBuf {
        self.hint_config.join(format!("{weight}.json"))
    }
}

/// One external program plus the arguments it always starts with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tool {
    pub program: String,
    pub leading_args: Vec<String>,
}

impl Tool {
    pub fn new(program: impl Into<String>) -> Self {
        Self { program: program.into(), leading_args: Vec::new() }
    }

    pub fn with_args<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { program: program.into(), leading_args: args.into_iter().map(Into::into).collect() }
    }

    pub fn command(&self) -> ToolCommand {
        ToolCommand::new(&self.program).args(self.leading_args.iter().cloned())
    }
}

/// External programs used by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toolchain {
    /// Splits a collection into sibling single-font files.
    pub splitter: Tool,
    /// Converts an OpenType/CFF font to TrueType outlines.
    pub converter: Tool,
    /// Merges single fonts into a collection.
    pub merger: Tool,
    pub autohinter: Tool,
    /// Dumps a binary font to its structured (JSON) form.
    pub dumper: Tool,
    /// Rebuilds a binary font from its structured form.
    pub rebuilder: Tool,
    /// Group hinter with `hint`, `instruct` and `integrate` subcommands.
    pub hinter: Tool,
    /// Bundles the final fonts of one weight into a collection.
    pub bundler: Tool,
}

impl Default for Toolchain {
    fn default() -> Self {
        let bundler = if cfg!(windows) {
            "node_modules/.bin/otfcc-ttcize.cmd"
        } else {
            "node_modules/.bin/otfcc-ttcize"
        };
        Self {
            splitter: Tool::new("otc2otf"),
            converter: Tool::new("otf2ttf"),
            merger: Tool::new("otf2otc"),
            autohinter: Tool::new("ttfautohint"),
            dumper: Tool::new("otfccdump"),
            rebuilder: Tool::new("otfccbuild"),
            hinter: Tool::with_args(
                "node",
                [
                    "--experimental-worker",
                    "--max-old-space-size=8192",
                    "./node_modules/@chlorophytum/cli/lib/index.js",
                ],
            ),
            bundler: Tool::new(bundler),
        }
    }
}

impl Toolchain {
    /// Every tool with a short description, in pipeline order.
    pub fn all(&self) -> [(&'static str, &Tool); 8] {
        [
            ("collection splitter", &self.splitter),
            ("format converter", &self.converter),
            ("collection merger", &self.merger),
            ("autohinter", &self.autohinter),
            ("hint dumper", &self.dumper),
            ("group hinter", &self.hinter),
            ("font rebuilder", &self.rebuilder),
            ("collection bundler", &self.bundler),
        ]
    }
}

/// Everything a task declaration may read.
#[derive(Debug, Clone)]
pub struct BuildContext {
    pub config: Config,
    pub layout: Layout,
    pub tools: Toolchain,
    /// Worker count handed to the group hinter.
    pub hint_jobs: usize,
    pub version: ReleaseVersion,
}

impl BuildContext {
    /// Create a context, verifying that every weight has parseable hint parameters.
    pub fn new(config: Config, layout: Layout) -> Result<Self, ConfigError> {
        config.validate()?;
        for weight in &config.weights {
            check_hint_params(weight, &layout.hint_params(weight))?;
        }

        Ok(Self {
            config,
            layout,
            tools: Toolchain::default(),
            hint_jobs: available_parallelism().map(|n| n.get()).unwrap_or(1),
            version: ReleaseVersion::parse(None)?,
        })
    }

    pub fn with_tools(mut self, tools: Toolchain) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_hint_jobs(mut self, jobs: usize) -> Self {
        self.hint_jobs = jobs.max(1);
        self
    }

    pub fn with_version(mut self, version: ReleaseVersion) -> Self {
        self.version = version;
        self
    }

    /// Canonical serialized configuration, used as a change-detection oracle.
    pub fn config_oracle(&self) -> String {
        serde_json::to_string(&self.config).unwrap_or_default()
    }
}

fn check_hint_params(weight: &str, path: &Path) -> Result<(), ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::MissingHintConfig {
            weight: weight.to_string(),
            path: path.to_path_buf(),
        });
    }
    let text = read_to_string(path)
        .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
    serde_json::from_str::<serde_json::Value>(&text)
        .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use hanttf_font_naming::{Locale, Naming};

    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = Layout::rooted(Path::new("/work"));
        assert_eq!(layout.pass3(), Path::new("/work/build/pass3"));
        assert_eq!(layout.hint_params("Bold"), Path::new("/work/hint-config/Bold.json"));
        assert_eq!(layout.collections_out, Path::new("/work/out/ttc"));
    }

    #[test]
    fn test_tool_command_keeps_leading_args() {
        let tools = Toolchain::default();
        let cmd = tools.hinter.command().arg("hint");
        assert_eq!(cmd.program, "node");
        assert_eq!(cmd.args.last().map(String::as_str), Some("hint"));
        assert_eq!(cmd.args.len(), 4);
    }

    #[test]
    fn test_malformed_hint_params() {
        let dir = tempfile::tempdir().unwrap();
        let layout = Layout::rooted(dir.path());
        std::fs::create_dir_all(&layout.hint_config).unwrap();
        std::fs::write(layout.hint_params("Bold"), "{not json").unwrap();

        let config = Config {
            prefix: "SHSans".to_string(),
            weights: vec!["Bold".to_string()],
            regions: vec!["CN".to_string()],
            all_regions: vec!["CN".to_string()],
            naming: Naming {
                family_name: Locale::ALL
                    .into_iter()
                    .map(|l| (l, "Source Han Sans".to_string()))
                    .collect(),
                ..Naming::default()
            },
        };
        let err = BuildContext::new(config, layout.clone()).unwrap_err();
        assert!(
            matches!(err, ConfigError::Parse { path, .. } if path == layout.hint_params("Bold"))
        );
    }
}
