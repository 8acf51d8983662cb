//! Allow/block classification.

pub mod classifier;
pub mod store;

pub use classifier::{Classifier, Decision, DomainSet, PatternError, PatternSet};
pub use store::{RuleError, RuleSnapshot, RuleStore};
