//! Export configuration.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::export::ColumnSet;

/// Demo read when no path is given
pub const DEFAULT_DEMO_PATH: &str = "protestdemo.dem";

/// Name of the single output file when rounds are not split
pub const ALL_TICKS_FILE: &str = "all_ticks.csv";

/// File name for the `round`-th round (1-based)
pub fn round_file_name(round: u32) -> String {
    format!("round_{}.csv", round)
}

/// Configuration for one export run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportConfig {
    /// Replay to read
    pub demo_path: PathBuf,
    /// Directory the per-demo output folder is created in (empty = working directory)
    pub output_root: PathBuf,
    /// Write one CSV per round instead of a single `all_ticks.csv`
    pub split_rounds: bool,
    pub columns: ColumnSet,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            demo_path: PathBuf::from(DEFAULT_DEMO_PATH),
            output_root: PathBuf::new(),
            split_rounds: false,
            columns: ColumnSet::Standard,
        }
    }
}

impl ExportConfig {
    /// Create a new configuration builder
    pub fn builder() -> ExportConfigBuilder {
        ExportConfigBuilder::default()
    }

    /// Output folder: the demo's file name without its last extension
    pub fn output_dir(&self) -> Result<PathBuf> {
        let stem = self
            .demo_path
            .file_stem()
            .filter(|stem| !stem.is_empty())
            .ok_or_else(|| Error::InvalidDemoPath(self.demo_path.clone()))?;
        Ok(self.output_root.join(stem))
    }

    pub fn demo_path(&self) -> &Path {
        &self.demo_path
    }
}

/// Builder for ExportConfig
#[derive(Debug, Clone, Default)]
pub struct ExportConfigBuilder {
    demo_path: Option<PathBuf>,
    output_root: Option<PathBuf>,
    split_rounds: Option<bool>,
    columns: Option<ColumnSet>,
}

impl ExportConfigBuilder {
    pub fn demo_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.demo_path = Some(path.into());
        self
    }

    pub fn output_root<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.output_root = Some(path.into());
        self
    }

    pub fn split_rounds(mut self, enabled: bool) -> Self {
        self.split_rounds = Some(enabled);
        self
    }

    pub fn columns(mut self, columns: ColumnSet) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Build the configuration
    pub fn build(self) -> ExportConfig {
        let default = ExportConfig::default();
        ExportConfig {
            demo_path: self.demo_path.unwrap_or(default.demo_path),
            output_root: self.output_root.unwrap_or(default.output_root),
            split_rounds: self.split_rounds.unwrap_or(default.split_rounds),
            columns: self.columns.unwrap_or(default.columns),
        }
    }
}
