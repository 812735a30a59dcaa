//! Optional TOML configuration file.
//!
//! ```toml
//! [sweep]
//! t_max = 20.0
//! samples = 400
//! failure_policy = "abort"
//!
//! [sweep.integrator]
//! rtol = 1e-10
//!
//! [plot]
//! width = 1280
//! out_dir = "plots"
//! ```

use anyhow::{Context, Result};
use lotka_core::SweepConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub sweep: SweepConfig,
    pub plot: PlotSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlotSettings {
    pub width: u32,
    pub height: u32,
    /// Directory that saved figures are written to.
    pub out_dir: PathBuf,
}

impl Default for PlotSettings {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            out_dir: PathBuf::from("."),
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("failed to parse config file {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let config: FileConfig = toml::from_str(text)?;
        config.sweep.integrator.validate()?;
        Ok(config)
    }
}
