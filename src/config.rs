//! Pipeline configuration, read from TOML.
//!
//! ```toml
//! [dialect]
//! target = "sqlserver:11.0"
//!
//! [precompile]
//! strict_apply_correction = false
//! index_selection = true
//!
//! [compiler]
//! parameterize_literals = true
//!
//! [cost]
//! row_cost = 1.0
//! access_overhead = { point = 1.0, range = 4.0, full = 8.0 }
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::compiler::CompilerOptions;
use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::precompile::{CostModel, PrecompileOptions};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub dialect: DialectConfig,
    pub precompile: PrecompileOptions,
    pub compiler: CompilerConfig,
    pub cost: CostModel,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    /// `vendor[:major.minor]`, newest known version when omitted.
    pub target: Dialect,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub parameterize_literals: bool,
}

impl From<&CompilerConfig> for CompilerOptions {
    fn from(c: &CompilerConfig) -> Self {
        CompilerOptions {
            parameterize_literals: c.parameterize_literals,
        }
    }
}

impl Config {
    /// `<config_dir>/relsql/config.toml`
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("relsql")
            .join("config.toml")
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Reads the default file, or returns defaults when there is none.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let cost = &self.cost;
        let overhead = &cost.access_overhead;
        let weights = [
            ("cost.row_cost", cost.row_cost),
            ("cost.access_overhead.empty", overhead.empty),
            ("cost.access_overhead.point", overhead.point),
            ("cost.access_overhead.range", overhead.range),
            ("cost.access_overhead.full", overhead.full),
        ];
        if let Some((name, value)) = weights.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            return Err(Error::Config(format!(
                "{} must be a non-negative number, got {}",
                name, value
            )));
        }
        let fractions = [
            ("cost.equality_selectivity", cost.equality_selectivity),
            ("cost.bounded_selectivity", cost.bounded_selectivity),
            ("cost.open_selectivity", cost.open_selectivity),
        ];
        if let Some((name, value)) = fractions
            .iter()
            .find(|(_, v)| !(0.0..=1.0).contains(v))
        {
            return Err(Error::Config(format!(
                "{} must be between 0 and 1, got {}",
                name, value
            )));
        }
        Ok(())
    }
}
