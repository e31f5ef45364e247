//! JSONL audit trail logging.
//!
//! Each run appends events to the audit file, one JSON object per line.

use std::fs::{self, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, Utc};
use openrisk_admin::DisableRequest;
use serde::Serialize;

use crate::error::Result;
use crate::report::{PortfolioReport, RiskReport};

/// An audit event written to the JSONL trail.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub event: &'static str,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub data: serde_json::Value,
}

/// Append-only audit logger.
#[derive(Debug)]
pub struct AuditLog {
    writer: BufWriter<std::fs::File>,
}

impl AuditLog {
    /// Open (or create) the audit log file for appending.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            writer: BufWriter::new(file),
        })
    }

    /// Log an event with arbitrary JSON data.
    pub fn log(&mut self, event: &'static str, data: serde_json::Value) -> Result<()> {
        let entry = AuditEvent {
            event,
            ts: Utc::now(),
            data,
        };
        let json = serde_json::to_string(&entry)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        writeln!(self.writer, "{json}")?;
        self.writer.flush()?;
        Ok(())
    }
}

pub fn log_run_started(
    audit: &mut AuditLog,
    portfolio: &str,
    user_id: i64,
    definitions: usize,
    positions: usize,
) -> Result<()> {
    audit.log(
        "run_started",
        serde_json::json!({
            "portfolio": portfolio,
            "user_id": user_id,
            "definitions": definitions,
            "positions": positions,
        }),
    )
}

pub fn log_risk_result(audit: &mut AuditLog, risk: &RiskReport) -> Result<()> {
    audit.log(
        "risk_result",
        serde_json::json!({
            "risk": risk.name,
            "display_name": risk.display_name,
            "result": risk.result,
            "diagnostics": risk.diagnostics,
        }),
    )
}

pub fn log_trade_stop(audit: &mut AuditLog, risk: &str, stop: &DisableRequest) -> Result<()> {
    audit.log(
        "trade_stop",
        serde_json::json!({
            "risk": risk,
            "account": stop.account,
            "reason": stop.reason,
        }),
    )
}

pub fn log_run_completed(audit: &mut AuditLog, report: &PortfolioReport) -> Result<()> {
    audit.log(
        "run_completed",
        serde_json::json!({
            "portfolio": report.portfolio,
            "definitions": report.risks.len(),
            "breaches": report.breach_count(),
            "trade_stops": report.trade_stops.len(),
            "degraded": report.diagnostics().total(),
        }),
    )
}
