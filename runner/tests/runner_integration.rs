//! Config file to audit trail: load, build, run, inspect.

use std::sync::Arc;

use openrisk::{
    AccountId, Aggregate, CompileError, CompileRequest, ExprRole, Expression, ExpressionCompiler,
    ExpressionTable, FnExpression, Position, RunResult, Security,
};
use openrisk_admin::mock::RecordingAdmin;
use openrisk_risk::{ManualClock, RiskEnv};
use openrisk_runner::{Config, Error, RiskRunner};

fn write_config(dir: &std::path::Path, risk_tables: &str) -> std::path::PathBuf {
    let path = dir.join("openrisk.toml");
    let logs = dir.join("logs");
    let contents = format!(
        "[engine]\nmodule_path = \"scripts\"\n\n[logging]\ndir = \"{}\"\n\n{risk_tables}",
        logs.display()
    );
    std::fs::write(&path, contents).unwrap();
    path
}

const RISKS: &str = r#"
[risk.exposure]
name = "Sector exposure"
group = "sector"
formula = "sum(mv)"
upper_bound = 1500
trade_stop = true
graph = "yes"

[risk.book]
[risk.book.count]
formula = "len(1)"
[risk.book.largest]
formula = "top(mv, 1)"
"#;

fn compiler() -> ExpressionTable {
    ExpressionTable::new()
        .with(FnExpression::numeric("sum(mv)", Aggregate::Sum, |p, _| {
            p.market_value()
        }))
        .with(FnExpression::numeric("len(1)", Aggregate::Len, |_, _| 1.0))
        .with(FnExpression::numeric("top(mv, 1)", Aggregate::Top(1), |p, _| {
            p.market_value()
        }))
}

fn book() -> Vec<Position> {
    let sec = |symbol: &str, sector: &str| {
        Arc::new(Security {
            sector: sector.into(),
            ..Security::new(symbol)
        })
    };
    vec![
        Position::new(sec("AAPL", "Tech"), AccountId(1), 10.0, 100.0),
        Position::new(sec("MSFT", "Tech"), AccountId(2), 10.0, 100.0),
        Position::new(sec("XOM", "Energy"), AccountId(3), 10.0, 50.0),
    ]
}

fn audit_events(config: &Config) -> Vec<serde_json::Value> {
    std::fs::read_to_string(config.audit_path())
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ============================================================================
// Full pass
// ============================================================================

#[test]
fn run_reports_and_audits_every_definition() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&write_config(dir.path(), RISKS)).unwrap();
    let mut runner = RiskRunner::from_config(&config, &compiler()).unwrap();
    assert_eq!(runner.definitions().len(), 2);

    let admin = RecordingAdmin::new();
    let clock = ManualClock::new(1_700_000_000);
    let env = RiskEnv::new(&admin).with_clock(&clock);
    let report = runner.run(&env, &book(), "main", 7).unwrap();

    let exposure = report.risk("exposure").unwrap();
    assert_eq!(exposure.display_name, "Sector exposure");
    assert_eq!(exposure.breach_count(), 1);
    let book_risk = report.risk("book").unwrap();
    assert!(matches!(book_risk.result, Some(RunResult::ByParameter(_))));

    // Tech (accounts 1 and 2) breaches the 1500 limit
    assert_eq!(report.trade_stops.len(), 2);
    assert_eq!(admin.count_for(AccountId(1)), 1);
    assert_eq!(admin.count_for(AccountId(3)), 0);

    let events = audit_events(&config);
    let kinds: Vec<&str> = events.iter().map(|e| e["event"].as_str().unwrap()).collect();
    assert_eq!(
        kinds,
        [
            "run_started",
            "risk_result",
            "trade_stop",
            "trade_stop",
            "risk_result",
            "run_completed"
        ]
    );
    assert_eq!(events[1]["result"][1], serde_json::json!(["Tech", 2000.0, [1, true]]));
    assert_eq!(events[2]["account"], 1);
    assert_eq!(events[5]["breaches"], 1);
}

#[test]
fn history_survives_across_runs() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&write_config(dir.path(), RISKS)).unwrap();
    let mut runner = RiskRunner::from_config(&config, &compiler()).unwrap();

    let admin = RecordingAdmin::new();
    let clock = ManualClock::new(1_700_000_000);
    let env = RiskEnv::new(&admin).with_clock(&clock);
    for _ in 0..3 {
        runner.run(&env, &book(), "main", 7).unwrap();
        clock.advance(30);
    }

    let exposure = runner.definition("exposure").unwrap();
    let series = exposure.param("exposure").unwrap().history("Tech");
    assert_eq!(series.len(), 2);
    assert_eq!(series[1].ts, 1_700_000_060.0);
}

#[test]
fn disabled_logging_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), RISKS);
    let contents = std::fs::read_to_string(&path)
        .unwrap()
        .replace("[logging]\n", "[logging]\nenabled = false\n");
    std::fs::write(&path, contents).unwrap();

    let config = Config::load(&path).unwrap();
    let mut runner = RiskRunner::from_config(&config, &compiler()).unwrap();
    let admin = RecordingAdmin::new();
    runner.run(&RiskEnv::new(&admin), &book(), "main", 7).unwrap();
    assert!(!config.audit_path().exists());
}

// ============================================================================
// Build failures
// ============================================================================

#[test]
fn unknown_formula_names_the_definition() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&write_config(
        dir.path(),
        "[risk.broken]\nformula = \"no_such_thing\"\n",
    ))
    .unwrap();
    let err = RiskRunner::from_config(&config, &compiler()).unwrap_err();
    let Error::Build(build) = &err else {
        panic!("expected build error, got {err}");
    };
    assert_eq!(build.risk(), "broken");
    assert!(err.to_string().contains("no_such_thing"));
}

#[test]
fn compiler_sees_module_path_and_roles() {
    struct Strict;
    impl ExpressionCompiler for Strict {
        fn compile(
            &self,
            request: &CompileRequest<'_>,
        ) -> Result<Arc<dyn Expression>, CompileError> {
            assert_eq!(request.module_path, "scripts");
            if request.role == ExprRole::Group {
                assert!(request.boolean);
            }
            Ok(FnExpression::numeric(request.source, Aggregate::Sum, |_, _| 1.0).into_arc())
        }
    }

    let dir = tempfile::tempdir().unwrap();
    let config = Config::load(&write_config(
        dir.path(),
        "[risk.r]\ngroup = \"px > 1\"\nformula = \"anything\"\n",
    ))
    .unwrap();
    let runner = RiskRunner::from_config(&config, &Strict).unwrap();
    assert_eq!(runner.definition("r").unwrap().module_path(), "scripts");
}
