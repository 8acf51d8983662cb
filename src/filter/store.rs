//! Shared rule state.
//!
//! A [`RuleStore`] owns the classifier behind a reader-writer lock:
//! queries take read locks on the hot path, the admin surface takes the
//! write lock to add rules. Rules are only ever added, never removed,
//! so readers observe a monotonically growing rule set.

use parking_lot::RwLock;
use serde::Serialize;

use super::classifier::{Classifier, Decision, DomainSet, PatternError, PatternSet};
use crate::config::RulesConfig;
use crate::rulelist::RuleFileKind;
use crate::rulelist::loader::{FileLoader, LoadError};

/// Error building or mutating the rule store.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error(transparent)]
    Pattern(#[from] PatternError),

    #[error("failed to load rule file: {0}")]
    Load(#[from] LoadError),
}

/// Read-only view of the configured rules, for the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct RuleSnapshot {
    pub allow: Vec<String>,
    pub block: Vec<String>,
    pub patterns: Vec<String>,
}

/// Classifier wrapped for concurrent use.
pub struct RuleStore {
    inner: RwLock<Classifier>,
}

impl RuleStore {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            inner: RwLock::new(classifier),
        }
    }

    /// Build the store from configuration: inline entries first, then
    /// any configured rule files.
    pub async fn from_config(config: &RulesConfig) -> Result<Self, RuleError> {
        let mut allow = DomainSet::new(&config.allow);
        let mut block = DomainSet::new(&config.block);
        let mut patterns = PatternSet::new(&config.patterns)?;

        for path in &config.allow_files {
            for entry in FileLoader::load(path, RuleFileKind::Domains).await? {
                allow.insert(&entry);
            }
        }
        for path in &config.block_files {
            for entry in FileLoader::load(path, RuleFileKind::Domains).await? {
                block.insert(&entry);
            }
        }
        for path in &config.pattern_files {
            for source in FileLoader::load(path, RuleFileKind::Patterns).await? {
                patterns.push(&source)?;
            }
        }

        Ok(Self::new(Classifier::new(allow, block, patterns)))
    }

    /// Classify a domain under a read lock.
    pub fn classify(&self, domain: &str) -> Decision {
        self.inner.read().classify(domain)
    }

    pub fn add_allow(&self, domain: &str) {
        self.inner.write().add_allow(domain);
    }

    pub fn add_block(&self, domain: &str) {
        self.inner.write().add_block(domain);
    }

    pub fn add_pattern(&self, source: &str) -> Result<(), RuleError> {
        self.inner.write().add_pattern(source)?;
        Ok(())
    }

    /// Sorted copy of every rule tier.
    pub fn snapshot(&self) -> RuleSnapshot {
        let classifier = self.inner.read();

        let mut allow: Vec<String> = classifier.allowlist().iter().map(String::from).collect();
        let mut block: Vec<String> = classifier.blocklist().iter().map(String::from).collect();
        allow.sort_unstable();
        block.sort_unstable();
        // Patterns keep their evaluation order.
        let patterns = classifier.patterns().sources().map(String::from).collect();

        RuleSnapshot {
            allow,
            block,
            patterns,
        }
    }
}

impl Default for RuleStore {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}
