//! Results of one runner pass over a portfolio snapshot.

use chrono::{DateTime, Utc};
use openrisk::RunResult;
use openrisk_admin::DisableRequest;
use openrisk_risk::Diagnostics;
use serde::Serialize;

/// Outcome of one risk definition.
#[derive(Debug, Clone, Serialize)]
pub struct RiskReport {
    pub name: String,
    pub display_name: String,
    /// `None` when no parameter produced a row.
    pub result: Option<RunResult>,
    pub diagnostics: Diagnostics,
}

impl RiskReport {
    pub fn breach_count(&self) -> usize {
        self.result.as_ref().map_or(0, |r| r.breaches().count())
    }
}

/// Outcome of every configured definition over one snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioReport {
    pub portfolio: String,
    pub user_id: i64,
    pub ts: DateTime<Utc>,
    /// In configuration order.
    pub risks: Vec<RiskReport>,
    /// Disable actions issued across all definitions.
    pub trade_stops: Vec<DisableRequest>,
}

impl PortfolioReport {
    pub fn risk(&self, name: &str) -> Option<&RiskReport> {
        self.risks.iter().find(|r| r.name == name)
    }

    /// Scalar breaches across all definitions.
    pub fn breach_count(&self) -> usize {
        self.risks.iter().map(RiskReport::breach_count).sum()
    }

    /// Degraded evaluations across all definitions.
    pub fn diagnostics(&self) -> Diagnostics {
        let mut total = Diagnostics::default();
        for risk in &self.risks {
            total += risk.diagnostics;
        }
        total
    }
}
