//! TOML configuration loading and validation.
//!
//! Every table under `[risk]` is one risk definition. Its scalar keys become
//! section values, its sub-tables become nested sections (parameters, or the
//! `var` table of named expressions), in file order.

use std::path::{Path, PathBuf};

use openrisk_risk::Section;
use serde::Deserialize;
use toml::{Table, Value};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub risk: Table,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EngineConfig {
    /// Module path handed to `call` formulas.
    #[serde(default)]
    pub module_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_audit_file")]
    pub audit_file: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            audit_file: default_audit_file(),
            enabled: true,
        }
    }
}

fn default_log_dir() -> String {
    "./logs".into()
}
fn default_audit_file() -> String {
    "risk_audit.jsonl".into()
}
fn default_true() -> bool {
    true
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::ConfigRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        contents.parse()
    }

    /// Validate config invariants.
    fn validate(&self) -> Result<()> {
        if self.risk.is_empty() {
            return Err(Error::Config("at least one [risk.<name>] table is required".into()));
        }
        for (name, value) in &self.risk {
            if name.trim().is_empty() {
                return Err(Error::Config("risk definition names must not be empty".into()));
            }
            if !value.is_table() {
                return Err(Error::Config(format!("risk.{name} must be a table")));
            }
        }
        Ok(())
    }

    /// Full path to the audit log file.
    pub fn audit_path(&self) -> PathBuf {
        Path::new(&self.logging.dir).join(&self.logging.audit_file)
    }

    /// One section per risk definition, in file order.
    pub fn sections(&self) -> Result<Vec<Section>> {
        self.risk
            .iter()
            .map(|(name, value)| match value {
                Value::Table(table) => to_section(name, table),
                _ => Err(Error::Config(format!("risk.{name} must be a table"))),
            })
            .collect()
    }
}

impl std::str::FromStr for Config {
    type Err = Error;

    /// Parse and validate.
    fn from_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }
}

fn to_section(name: &str, table: &Table) -> Result<Section> {
    let mut section = Section::new(name);
    for (key, value) in table {
        match value {
            Value::Table(sub) => section.sections.push(to_section(key, sub)?),
            other => section.set(key.clone(), render(other).map_err(|what| {
                Error::Config(format!("{name}.{key}: {what} is not a scalar or list"))
            })?),
        }
    }
    Ok(section)
}

/// Textual form of a scalar; lists are joined with `,`.
fn render(value: &Value) -> std::result::Result<String, &'static str> {
    Ok(match value {
        Value::String(s) => s.clone(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Datetime(d) => d.to_string(),
        Value::Array(items) => items
            .iter()
            .map(render)
            .collect::<std::result::Result<Vec<_>, _>>()?
            .join(","),
        Value::Table(_) => return Err("a table"),
    })
}
