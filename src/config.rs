//! Optional TOML configuration for a render run

use crate::report::{ArtifactFormat, ReportRenderer};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Output path used when neither the command line nor the config names one
pub const DEFAULT_OUTPUT: &str = "analysis_report.html";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),

    #[error("Failed to parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),

    #[error("No {0} path given on the command line or in the config file")]
    Missing(&'static str),
}

/// Paths and format for one render, as read from a config file or the CLI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    pub plots: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<ArtifactFormat>,
}

impl RenderConfig {
    /// Read a config file. Relative paths are taken relative to the file's
    /// own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;

        let config: RenderConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;

        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Ok(config.relative_to(base))
    }

    fn relative_to(self, base: &Path) -> Self {
        let resolve = |p: Option<PathBuf>| p.map(|p| if p.is_absolute() { p } else { base.join(p) });
        Self {
            plots: resolve(self.plots),
            template: resolve(self.template),
            output: resolve(self.output),
            format: self.format,
        }
    }

    /// Fill any field `self` leaves unset from `fallback`
    pub fn or(self, fallback: RenderConfig) -> Self {
        Self {
            plots: self.plots.or(fallback.plots),
            template: self.template.or(fallback.template),
            output: self.output.or(fallback.output),
            format: self.format.or(fallback.format),
        }
    }

    pub fn into_renderer(self) -> Result<ReportRenderer, ConfigError> {
        let plots = self.plots.ok_or(ConfigError::Missing("plots"))?;
        let template = self.template.ok_or(ConfigError::Missing("template"))?;
        let output = self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

        Ok(ReportRenderer::new(plots, template, output).with_format(self.format))
    }
}
