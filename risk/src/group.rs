//! Partitioning positions into named groups.
//!
//! Selectors run in declaration order. Within one selector, newly seen
//! labels are appended to the visit order sorted lexicographically. Labels
//! are global: a label already claimed by an earlier selector keeps that
//! selector's index (which picks its bounds), and later positions with the
//! same label join the same bucket.

use std::fmt;
use std::sync::Arc;

use log::debug;
use openrisk::{AccountDirectory, EvalValue, Expression, Position, Variables};
use rustc_hash::FxHashMap;

use crate::diagnostics::Diagnostics;

/// Predefined position attributes usable as group selectors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttributeTag {
    Sector,
    Industry,
    SubIndustry,
    Market,
    Type,
    Currency,
    /// Account display name.
    Account,
}

impl AttributeTag {
    pub const ALL: [AttributeTag; 7] = [
        AttributeTag::Sector,
        AttributeTag::Industry,
        AttributeTag::SubIndustry,
        AttributeTag::Market,
        AttributeTag::Type,
        AttributeTag::Currency,
        AttributeTag::Account,
    ];

    /// Configuration token for this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            AttributeTag::Sector => "sector",
            AttributeTag::Industry => "industry",
            AttributeTag::SubIndustry => "subindustry",
            AttributeTag::Market => "market",
            AttributeTag::Type => "type",
            AttributeTag::Currency => "currency",
            AttributeTag::Account => "acc",
        }
    }

    pub fn parse(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == token)
    }

    /// Group label of `position` under this tag (`""` = ungrouped).
    pub fn label<'a>(self, position: &'a Position, accounts: &'a dyn AccountDirectory) -> &'a str {
        let sec = &position.security;
        match self {
            AttributeTag::Sector => &sec.sector,
            AttributeTag::Industry => &sec.industry,
            AttributeTag::SubIndustry => &sec.sub_industry,
            AttributeTag::Market => &sec.market,
            AttributeTag::Type => &sec.kind,
            AttributeTag::Currency => &sec.currency,
            AttributeTag::Account => accounts.display_name(position.account).unwrap_or(""),
        }
    }
}

impl fmt::Display for AttributeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one outer group index assigns labels.
#[derive(Clone, Debug)]
pub enum GroupSelector {
    /// Label is the position's attribute value.
    Attribute(AttributeTag),
    /// Label is `name` when `expr` holds for the position.
    Predicate {
        expr: Arc<dyn Expression>,
        name: String,
    },
}

impl GroupSelector {
    pub fn predicate(expr: Arc<dyn Expression>, name: impl Into<String>) -> Self {
        GroupSelector::Predicate {
            expr,
            name: name.into(),
        }
    }

    /// Display name: the tag token or the predicate's group name.
    pub fn name(&self) -> &str {
        match self {
            GroupSelector::Attribute(tag) => tag.as_str(),
            GroupSelector::Predicate { name, .. } => name,
        }
    }

    fn label<'a>(
        &'a self,
        position: &'a Position,
        accounts: &'a dyn AccountDirectory,
        diag: &mut Diagnostics,
    ) -> &'a str {
        match self {
            GroupSelector::Attribute(tag) => tag.label(position, accounts),
            GroupSelector::Predicate { expr, name } => {
                match expr.evaluate(position, &Variables::default()) {
                    Ok(EvalValue::Bool(true)) => name,
                    Ok(EvalValue::Bool(false)) => "",
                    Ok(other) => {
                        debug!("group {name} yielded a {}", other.type_name());
                        diag.group_errors += 1;
                        ""
                    }
                    Err(e) => {
                        debug!("group {name} degraded for {}: {e}", position.security.symbol);
                        diag.group_errors += 1;
                        ""
                    }
                }
            }
        }
    }
}

/// Positions partitioned by group label, with a stable visit order.
#[derive(Debug, Default)]
pub struct Grouping<'p> {
    order: Vec<String>,
    buckets: FxHashMap<String, Bucket<'p>>,
}

#[derive(Debug)]
struct Bucket<'p> {
    selector: usize,
    positions: Vec<&'p Position>,
}

impl<'p> Grouping<'p> {
    /// Partition `positions`.
    ///
    /// With no selectors everything forms one group named `""`. A filter that
    /// evaluates to `false` excludes the position from every selector; a
    /// filter that fails to evaluate lets it through.
    pub fn partition(
        selectors: &[GroupSelector],
        filter: Option<&dyn Expression>,
        positions: &'p [Position],
        accounts: &dyn AccountDirectory,
        diag: &mut Diagnostics,
    ) -> Self {
        let mut grouping = Grouping::default();
        if selectors.is_empty() {
            grouping.order.push(String::new());
            grouping.buckets.insert(
                String::new(),
                Bucket {
                    selector: 0,
                    positions: positions.iter().collect(),
                },
            );
            return grouping;
        }

        let admitted: Vec<&Position> = match filter {
            Some(f) => positions.iter().filter(|p| admit(f, p, diag)).collect(),
            None => positions.iter().collect(),
        };

        for (index, selector) in selectors.iter().enumerate() {
            let mut fresh: Vec<String> = Vec::new();
            for &p in &admitted {
                let label = selector.label(p, accounts, diag);
                if label.is_empty() {
                    continue;
                }
                match grouping.buckets.get_mut(label) {
                    Some(bucket) => bucket.positions.push(p),
                    None => {
                        fresh.push(label.to_string());
                        grouping.buckets.insert(
                            label.to_string(),
                            Bucket {
                                selector: index,
                                positions: vec![p],
                            },
                        );
                    }
                }
            }
            fresh.sort();
            grouping.order.extend(fresh);
        }
        grouping
    }

    /// Groups in visit order: `(name, selector index, positions)`.
    pub fn iter(&self) -> impl Iterator<Item = (&str, usize, &[&'p Position])> {
        self.order.iter().filter_map(|name| {
            self.buckets
                .get(name)
                .map(|b| (name.as_str(), b.selector, b.positions.as_slice()))
        })
    }

    /// Group names in visit order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    pub fn bucket(&self, name: &str) -> Option<&[&'p Position]> {
        self.buckets.get(name).map(|b| b.positions.as_slice())
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

fn admit(filter: &dyn Expression, position: &Position, diag: &mut Diagnostics) -> bool {
    match filter.evaluate(position, &Variables::default()) {
        Ok(EvalValue::Bool(keep)) => keep,
        Ok(other) => {
            debug!("filter {} yielded a {}", filter.source(), other.type_name());
            diag.filter_errors += 1;
            true
        }
        Err(e) => {
            debug!(
                "filter {} degraded for {}: {e}",
                filter.source(),
                position.security.symbol
            );
            diag.filter_errors += 1;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use openrisk::{AccountId, AccountNames, EvalError, FnExpression, Security};

    fn pos(symbol: &str, sector: &str, market: &str, account: i64) -> Position {
        let sec = Security {
            sector: sector.into(),
            market: market.into(),
            ..Security::new(symbol)
        };
        Position::new(Arc::new(sec), AccountId(account), 1.0, 1.0)
    }

    fn book() -> Vec<Position> {
        vec![
            pos("AAPL", "Tech", "US", 1),
            pos("XOM", "Energy", "US", 1),
            pos("SAP", "Tech", "EU", 2),
            pos("CASH", "", "US", 2),
        ]
    }

    fn group<'p>(selectors: &[GroupSelector], book: &'p [Position]) -> Grouping<'p> {
        let mut diag = Diagnostics::default();
        Grouping::partition(selectors, None, book, &AccountNames::new(), &mut diag)
    }

    fn symbols(bucket: &[&Position]) -> Vec<String> {
        bucket.iter().map(|p| p.security.symbol.clone()).collect()
    }

    #[test]
    fn tag_tokens_round_trip() {
        for tag in AttributeTag::ALL {
            assert_eq!(AttributeTag::parse(tag.as_str()), Some(tag));
        }
        assert_eq!(AttributeTag::parse("acc"), Some(AttributeTag::Account));
        assert_eq!(AttributeTag::parse("country"), None);
    }

    #[test]
    fn no_selectors_single_unnamed_group() {
        let book = book();
        let g = group(&[], &book);
        assert_eq!(g.names().collect::<Vec<_>>(), [""]);
        assert_eq!(g.bucket("").map(<[_]>::len), Some(4));
    }

    #[test]
    fn attribute_groups_sorted_per_selector() {
        let book = book();
        let selectors = [
            GroupSelector::Attribute(AttributeTag::Sector),
            GroupSelector::Attribute(AttributeTag::Market),
        ];
        let g = group(&selectors, &book);

        // Sector labels sorted, then market labels sorted; CASH has no sector
        assert_eq!(g.names().collect::<Vec<_>>(), ["Energy", "Tech", "EU", "US"]);
        assert_eq!(symbols(g.bucket("Tech").unwrap()), ["AAPL", "SAP"]);
        assert_eq!(symbols(g.bucket("US").unwrap()), ["AAPL", "XOM", "CASH"]);

        let indices: Vec<usize> = g.iter().map(|(_, i, _)| i).collect();
        assert_eq!(indices, [0, 0, 1, 1]);
    }

    #[test]
    fn label_claimed_by_first_selector() {
        let book = vec![pos("A", "X", "Y", 1), pos("B", "Y", "X", 1)];
        let selectors = [
            GroupSelector::Attribute(AttributeTag::Sector),
            GroupSelector::Attribute(AttributeTag::Market),
        ];
        let g = group(&selectors, &book);
        assert_eq!(g.names().collect::<Vec<_>>(), ["X", "Y"]);
        let all: Vec<(&str, usize, usize)> = g.iter().map(|(n, i, b)| (n, i, b.len())).collect();
        assert_eq!(all, [("X", 0, 2), ("Y", 0, 2)]);
    }

    #[test]
    fn account_selector_uses_display_names() {
        let book = book();
        let names = AccountNames::new().with(AccountId(1), "desk-a");
        let selectors = [GroupSelector::Attribute(AttributeTag::Account)];
        let g = Grouping::partition(&selectors, None, &book, &names, &mut Diagnostics::default());
        // Account 2 has no display name: ungrouped
        assert_eq!(g.names().collect::<Vec<_>>(), ["desk-a"]);
        assert_eq!(symbols(g.bucket("desk-a").unwrap()), ["AAPL", "XOM"]);
    }

    #[test]
    fn predicate_and_match_all() {
        let book = book();
        let selectors = [
            GroupSelector::predicate(
                FnExpression::predicate("market == 'US'", |p| p.security.market == "US").into_arc(),
                "US book",
            ),
            GroupSelector::predicate(FnExpression::predicate("true", |_| true).into_arc(), "All"),
        ];
        let g = group(&selectors, &book);
        assert_eq!(g.names().collect::<Vec<_>>(), ["US book", "All"]);
        assert_eq!(g.bucket("US book").map(<[_]>::len), Some(3));
        assert_eq!(g.bucket("All").map(<[_]>::len), Some(4));
        assert_eq!(selectors[0].name(), "US book");
    }

    #[test]
    fn filter_excludes_before_grouping() {
        let book = book();
        let filter =
            FnExpression::predicate("sector != 'Energy'", |p| p.security.sector != "Energy");
        let selectors = [GroupSelector::predicate(
            FnExpression::predicate("true", |_| true).into_arc(),
            "All",
        )];
        let g = Grouping::partition(
            &selectors,
            Some(&filter),
            &book,
            &AccountNames::new(),
            &mut Diagnostics::default(),
        );
        assert_eq!(symbols(g.bucket("All").unwrap()), ["AAPL", "SAP", "CASH"]);
    }

    #[test]
    fn failing_filter_admits_failing_predicate_excludes() {
        let book = book();
        let filter = FnExpression::new("bad filter", openrisk::Aggregate::None, |_, _| {
            Err(EvalError::Other("boom".into()))
        });
        let selectors = [GroupSelector::predicate(
            FnExpression::new("bad group", openrisk::Aggregate::None, |p, _| {
                if p.security.symbol == "XOM" {
                    Err(EvalError::Other("boom".into()))
                } else {
                    Ok(EvalValue::Bool(true))
                }
            })
            .into_arc(),
            "G",
        )];
        let mut diag = Diagnostics::default();
        let accounts = AccountNames::new();
        let g = Grouping::partition(&selectors, Some(&filter), &book, &accounts, &mut diag);
        assert_eq!(symbols(g.bucket("G").unwrap()), ["AAPL", "SAP", "CASH"]);
        assert_eq!(diag.filter_errors, 4);
        assert_eq!(diag.group_errors, 1);
    }

    #[test]
    fn nothing_matches_yields_no_groups() {
        let book = book();
        let selectors = [GroupSelector::predicate(
            FnExpression::predicate("false", |_| false).into_arc(),
            "None",
        )];
        let g = group(&selectors, &book);
        assert!(g.is_empty());
        assert_eq!(g.iter().count(), 0);
    }
}
