//! Symbol value object for instrument identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A trading symbol.
///
/// Examples:
/// - Equity: "AAPL", "MSFT"
/// - Crypto pair: "BTC/USD"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Symbol(String);

impl Symbol {
    /// Create a new Symbol.
    ///
    /// The symbol is normalized to uppercase and trimmed.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into().trim().to_uppercase())
    }

    /// Get the symbol string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used to match this symbol against broker holdings.
    ///
    /// Brokers report crypto positions without the pair separator
    /// ("BTCUSD" for an order placed on "BTC/USD").
    #[must_use]
    pub fn holdings_key(&self) -> String {
        self.0.replace('/', "")
    }

    /// Check if the symbol is a crypto pair.
    #[must_use]
    pub fn is_pair(&self) -> bool {
        self.0.contains('/')
    }

    /// Check the symbol is non-empty and only contains ticker characters.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 21
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '/' || c == '.')
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
