//! Domain classification against layered rule sets.
//!
//! Three tiers, checked in a fixed order: an allowlist (exact or parent
//! suffix), a blocklist (same matching), and an ordered list of
//! precompiled patterns. The allowlist always wins, patterns are the
//! last resort before the default allow.

use std::collections::HashSet;

use regex::{Regex, RegexBuilder};

/// Verdict for a single domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Block,
}

/// Error compiling a rule pattern.
#[derive(Debug, thiserror::Error)]
#[error("invalid pattern {pattern:?}: {source}")]
pub struct PatternError {
    pub pattern: String,
    #[source]
    pub source: regex::Error,
}

/// A set of domain rules matched exactly or as a parent suffix.
///
/// An entry matches a domain when the domain equals the entry or ends
/// with `"." + entry`. The suffix walk stops before the bare TLD, so an
/// entry like `com` only ever matches the literal query `com`. Entries
/// are stored lower-cased without trailing dots; a leading `*.` is
/// stripped since suffix semantics already cover subdomains.
#[derive(Debug, Clone, Default)]
pub struct DomainSet {
    entries: HashSet<String>,
}

impl DomainSet {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for entry in entries {
            set.insert(entry.as_ref());
        }
        set
    }

    /// Add a rule entry, normalizing it first. Empty entries are ignored.
    pub fn insert(&mut self, entry: &str) {
        let entry = entry.trim();
        let entry = entry.strip_prefix("*.").unwrap_or(entry);
        let entry = entry.trim_matches('.');
        if entry.is_empty() {
            return;
        }
        self.entries.insert(entry.to_ascii_lowercase());
    }

    /// Check a (normalized) domain against the set.
    #[inline]
    pub fn matches(&self, domain: &str) -> bool {
        if self.entries.contains(domain) {
            return true;
        }

        // Walk parent suffixes: for a.b.example.com check b.example.com,
        // then example.com, stopping before the bare TLD.
        let mut rest = domain;
        while let Some(dot) = rest.find('.') {
            rest = &rest[dot + 1..];
            if !rest.contains('.') {
                break;
            }
            if self.entries.contains(rest) {
                return true;
            }
        }

        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An ordered sequence of precompiled patterns.
///
/// Patterns are evaluated against the full domain string in insertion
/// order, case-insensitively. The engine is hidden behind [`matches`];
/// nothing else in the pipeline knows these are regexes.
///
/// [`matches`]: PatternSet::matches
#[derive(Debug, Clone, Default)]
pub struct PatternSet {
    patterns: Vec<Regex>,
}

impl PatternSet {
    pub fn new<I, S>(sources: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for source in sources {
            set.push(source.as_ref())?;
        }
        Ok(set)
    }

    /// Compile and append a pattern.
    pub fn push(&mut self, source: &str) -> Result<(), PatternError> {
        let pattern = RegexBuilder::new(source)
            .case_insensitive(true)
            .build()
            .map_err(|e| PatternError {
                pattern: source.to_string(),
                source: e,
            })?;
        self.patterns.push(pattern);
        Ok(())
    }

    /// Does any pattern match this domain?
    #[inline]
    pub fn matches(&self, domain: &str) -> bool {
        self.patterns.iter().any(|p| p.is_match(domain))
    }

    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(Regex::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// The layered classification engine.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    allow: DomainSet,
    block: DomainSet,
    patterns: PatternSet,
}

impl Classifier {
    pub fn new(allow: DomainSet, block: DomainSet, patterns: PatternSet) -> Self {
        Self {
            allow,
            block,
            patterns,
        }
    }

    /// Classify a domain.
    ///
    /// Precedence is fixed: empty (unparsed) domains are allowed,
    /// allowlist matches short-circuit every block check, blocklist
    /// matches beat patterns, and the default is allow.
    pub fn classify(&self, domain: &str) -> Decision {
        if domain.is_empty() {
            return Decision::Allow;
        }

        let normalized = domain.trim_end_matches('.').to_ascii_lowercase();
        if normalized.is_empty() {
            return Decision::Allow;
        }

        if self.allow.matches(&normalized) {
            return Decision::Allow;
        }
        if self.block.matches(&normalized) {
            return Decision::Block;
        }
        if self.patterns.matches(&normalized) {
            return Decision::Block;
        }

        Decision::Allow
    }

    pub fn add_allow(&mut self, domain: &str) {
        self.allow.insert(domain);
    }

    pub fn add_block(&mut self, domain: &str) {
        self.block.insert(domain);
    }

    pub fn add_pattern(&mut self, source: &str) -> Result<(), PatternError> {
        self.patterns.push(source)
    }

    pub fn allowlist(&self) -> &DomainSet {
        &self.allow
    }

    pub fn blocklist(&self) -> &DomainSet {
        &self.block
    }

    pub fn patterns(&self) -> &PatternSet {
        &self.patterns
    }
}
