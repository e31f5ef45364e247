//! JSON encoding of result values (requires the `serde` feature).

#![cfg(feature = "serde")]

use std::collections::BTreeMap;

use openrisk::{Breach, BreachSide, GroupValue, ParamValue, RankedEntry, RunResult};
use serde_json::json;

fn row(group: &str, value: ParamValue, breach: Option<Breach>) -> GroupValue {
    GroupValue {
        group: group.into(),
        value,
        breach,
    }
}

#[test]
fn breach_markers() {
    let below = Breach::new(BreachSide::Below);
    let stopped = Breach {
        side: BreachSide::Above,
        trade_stop: true,
    };
    assert_eq!(serde_json::to_value(below).unwrap(), json!([-1]));
    assert_eq!(serde_json::to_value(stopped).unwrap(), json!([1, true]));
}

#[test]
fn param_values() {
    assert_eq!(serde_json::to_value(ParamValue::Number(1.5)).unwrap(), json!(1.5));
    assert_eq!(serde_json::to_value(ParamValue::NotANumber).unwrap(), json!("NaN"));
    assert_eq!(serde_json::to_value(ParamValue::Absent).unwrap(), json!(null));

    let mut hot = RankedEntry::new("AAPL", 9.0);
    hot.breach = Some(Breach::new(BreachSide::Above));
    let ranked = ParamValue::Ranked(vec![hot, RankedEntry::new("XOM", 3.0)]);
    assert_eq!(
        serde_json::to_value(ranked).unwrap(),
        json!([["AAPL", 9.0, [1]], ["XOM", 3.0]])
    );
}

#[test]
fn run_result_shapes() {
    let single = RunResult::Single(vec![
        row("Energy", ParamValue::Number(10.0), None),
        row("Tech", ParamValue::NotANumber, None),
    ]);
    assert_eq!(
        serde_json::to_value(&single).unwrap(),
        json!([["Energy", 10.0], ["Tech", "NaN"]])
    );

    let mut by_param = BTreeMap::new();
    by_param.insert(
        "gross".to_string(),
        vec![row("", ParamValue::Number(5.0), Some(Breach::new(BreachSide::Below)))],
    );
    let keyed = RunResult::ByParameter(by_param);
    assert_eq!(
        serde_json::to_value(&keyed).unwrap(),
        json!({ "gross": [["", 5.0, [-1]]] })
    );
}
