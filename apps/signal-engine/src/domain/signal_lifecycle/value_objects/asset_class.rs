//! Asset class of a signal's instrument.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Asset class traded by a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetClass {
    /// Listed equities and ETFs.
    Equity,
    /// Spot crypto pairs.
    Crypto,
    /// Currency pairs.
    Forex,
}

impl AssetClass {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Equity => "EQUITY",
            Self::Crypto => "CRYPTO",
            Self::Forex => "FOREX",
        }
    }
}

impl fmt::Display for AssetClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetClass {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "EQUITY" => Ok(Self::Equity),
            "CRYPTO" => Ok(Self::Crypto),
            "FOREX" => Ok(Self::Forex),
            other => Err(format!("unknown asset class: {other}")),
        }
    }
}
