//! Core types: AccountId, Security, Position

use std::fmt;
use std::sync::Arc;

/// Trading account identifier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Static reference data for a tradable instrument.
///
/// The taxonomy fields drive the predefined group selectors. Empty strings
/// mean "unclassified" and keep the position out of that grouping.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Security {
    pub symbol: String,
    pub sector: String,
    pub industry: String,
    pub sub_industry: String,
    pub market: String,
    /// Instrument type (e.g. "STK", "FUT", "OPT")
    #[cfg_attr(feature = "serde", serde(rename = "type"))]
    pub kind: String,
    pub currency: String,
    /// Contract multiplier (1.0 for cash equities)
    pub multiplier: f64,
}

impl Security {
    /// Create a security with only a symbol set and a unit multiplier.
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            multiplier: 1.0,
            ..Default::default()
        }
    }
}

/// A holding of one security in one account.
///
/// Positions are immutable for the duration of an evaluation pass. The
/// security is shared so a snapshot of many accounts holding the same
/// instrument does not duplicate reference data.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Position {
    pub security: Arc<Security>,
    pub account: AccountId,
    /// Signed quantity: positive = long, negative = short
    pub quantity: f64,
    /// Average entry price
    pub avg_price: f64,
    /// Latest mark price
    pub price: f64,
}

impl Position {
    pub fn new(security: Arc<Security>, account: AccountId, quantity: f64, price: f64) -> Self {
        Self {
            security,
            account,
            quantity,
            avg_price: price,
            price,
        }
    }

    /// Signed market value: quantity * price * multiplier.
    pub fn market_value(&self) -> f64 {
        self.quantity * self.price * self.security.multiplier
    }

    /// Unrealized PnL against the average entry price.
    pub fn unrealized_pnl(&self) -> f64 {
        self.quantity * (self.price - self.avg_price) * self.security.multiplier
    }
}

/// Lookup of account display names, used by the `acc` group selector.
pub trait AccountDirectory {
    fn display_name(&self, account: AccountId) -> Option<&str>;
}

/// In-memory account directory.
#[derive(Clone, Debug, Default)]
pub struct AccountNames {
    names: rustc_hash::FxHashMap<AccountId, String>,
}

impl AccountNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, account: AccountId, name: impl Into<String>) {
        self.names.insert(account, name.into());
    }

    pub fn with(mut self, account: AccountId, name: impl Into<String>) -> Self {
        self.insert(account, name);
        self
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl AccountDirectory for AccountNames {
    fn display_name(&self, account: AccountId) -> Option<&str> {
        self.names.get(&account).map(String::as_str)
    }
}

impl FromIterator<(AccountId, String)> for AccountNames {
    fn from_iter<I: IntoIterator<Item = (AccountId, String)>>(iter: I) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
