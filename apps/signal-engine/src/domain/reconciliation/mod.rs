//! Reconciliation Bounded Context
//!
//! Classification of disagreements between the operational store and the
//! broker, and the audit records written when they are corrected.

mod classifier;
mod record;

pub use classifier::MismatchClassifier;
pub use record::{CorrectiveAction, MismatchKind, ReconciliationRecord};
