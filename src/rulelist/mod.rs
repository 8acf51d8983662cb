//! Rule-list file parsing.
//!
//! Rule files feed the classifier's tiers: domain lists for the
//! allowlist and blocklist, pattern lists for the pattern tier. Both
//! formats are line-oriented with `#` comments.

pub mod loader;

mod domains;
mod patterns;

use std::io::BufRead;

pub use domains::DomainListParser;
pub use patterns::PatternListParser;

/// Error type for rule-list parsing operations.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// I/O error during reading.
    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Kinds of rule files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleFileKind {
    /// One domain per line, `*.` prefixes accepted.
    Domains,
    /// One regular expression per line, compiled downstream.
    Patterns,
}

/// Trait for rule-list parsers.
///
/// Parsers extract raw rule entries from file content; normalization and
/// compilation happen in the [`filter`](crate::filter) layer.
pub trait RuleFileParser: Send + Sync {
    /// Parse rule-list content and return the entries.
    fn parse(&self, reader: &mut dyn BufRead) -> Result<Vec<String>, ParseError>;
}

/// Returns a boxed parser for the given rule-file kind.
#[must_use]
pub fn parser_for_kind(kind: RuleFileKind) -> Box<dyn RuleFileParser> {
    match kind {
        RuleFileKind::Domains => Box::new(DomainListParser),
        RuleFileKind::Patterns => Box::new(PatternListParser),
    }
}
