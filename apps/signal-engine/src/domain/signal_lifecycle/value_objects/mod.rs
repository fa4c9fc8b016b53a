//! Signal Lifecycle Value Objects

mod asset_class;
mod price_levels;
mod signal_status;

pub use asset_class::AssetClass;
pub use price_levels::{Direction, PriceLevels};
pub use signal_status::{SignalStatus, UnknownStatus};
