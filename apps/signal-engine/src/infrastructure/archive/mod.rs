//! Archive Adapters
//!
//! Cold storage for terminal signals.

mod jsonl;

pub use jsonl::JsonLinesColdStore;
