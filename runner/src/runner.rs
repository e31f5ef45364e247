//! Evaluate every configured risk definition over one snapshot.

use chrono::Utc;
use log::{debug, info};
use openrisk::{ExpressionCompiler, Position};
use openrisk_risk::{RiskDef, RiskEnv};

use crate::audit::{self, AuditLog};
use crate::config::Config;
use crate::error::Result;
use crate::report::{PortfolioReport, RiskReport};

/// Owns the built definitions (and their history) across runs.
///
/// Runs take `&mut self`: history on graphed parameters is single-writer.
#[derive(Debug)]
pub struct RiskRunner {
    defs: Vec<RiskDef>,
    audit: Option<AuditLog>,
}

impl RiskRunner {
    /// Runner over prebuilt definitions, without an audit trail.
    pub fn new(defs: Vec<RiskDef>) -> Self {
        Self { defs, audit: None }
    }

    /// Build every definition in `config`; the first failure aborts.
    ///
    /// Opens the audit log when logging is enabled.
    pub fn from_config(config: &Config, compiler: &dyn ExpressionCompiler) -> Result<Self> {
        let module_path = &config.engine.module_path;
        let defs = config
            .sections()?
            .iter()
            .map(|section| RiskDef::from_section(section, module_path, compiler))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        info!("built {} risk definitions", defs.len());

        let audit = if config.logging.enabled {
            Some(AuditLog::open(&config.audit_path())?)
        } else {
            None
        };
        Ok(Self { defs, audit })
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn definitions(&self) -> &[RiskDef] {
        &self.defs
    }

    pub fn definition(&self, name: &str) -> Option<&RiskDef> {
        self.defs.iter().find(|d| d.name() == name)
    }

    /// Evaluate all definitions in configuration order.
    ///
    /// Evaluation itself never fails; only audit IO can.
    pub fn run(
        &mut self,
        env: &RiskEnv<'_>,
        positions: &[Position],
        portfolio: &str,
        user_id: i64,
    ) -> Result<PortfolioReport> {
        if let Some(log) = self.audit.as_mut() {
            audit::log_run_started(log, portfolio, user_id, self.defs.len(), positions.len())?;
        }

        let mut risks = Vec::with_capacity(self.defs.len());
        let mut trade_stops = Vec::new();
        for def in &mut self.defs {
            let run = def.evaluate(env, positions, portfolio, user_id);
            if !run.diagnostics.is_clean() {
                debug!("{}: {:?}", def.name(), run.diagnostics);
            }
            let risk = RiskReport {
                name: def.name().to_string(),
                display_name: def.display_name().to_string(),
                result: run.result,
                diagnostics: run.diagnostics,
            };
            if let Some(log) = self.audit.as_mut() {
                audit::log_risk_result(log, &risk)?;
                for stop in &run.trade_stops {
                    audit::log_trade_stop(log, def.name(), stop)?;
                }
            }
            risks.push(risk);
            trade_stops.extend(run.trade_stops);
        }

        let report = PortfolioReport {
            portfolio: portfolio.to_string(),
            user_id,
            ts: Utc::now(),
            risks,
            trade_stops,
        };
        info!(
            "{portfolio}: {} definitions, {} breaches, {} trade stops",
            report.risks.len(),
            report.breach_count(),
            report.trade_stops.len()
        );
        if let Some(log) = self.audit.as_mut() {
            audit::log_run_completed(log, &report)?;
        }
        Ok(report)
    }
}
