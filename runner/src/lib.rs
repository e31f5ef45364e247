//! openrisk-runner: TOML-configured risk definitions over portfolio snapshots.
//!
//! Loads `[risk.<name>]` tables from a TOML file, builds one
//! [`RiskDef`](openrisk_risk::RiskDef) per table, evaluates all of them over
//! a snapshot and appends a JSONL audit trail of results and trade stops.

pub mod audit;
pub mod config;
pub mod error;
pub mod report;
pub mod runner;

pub use config::Config;
pub use error::{Error, Result};
pub use report::{PortfolioReport, RiskReport};
pub use runner::RiskRunner;
