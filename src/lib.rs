//! Doorman - a filtering DNS-over-HTTPS proxy.
//!
//! Doorman terminates DoH queries, blocks configured domains with
//! synthesized NXDOMAIN answers, and forwards everything else to an
//! upstream resolver with response caching and usage stats.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`config`]: Configuration loading and validation
//! - [`dns`]: Wire-format parsing, response synthesis, upstream resolution
//! - [`filter`]: Rule sets and domain classification
//! - [`rulelist`]: Rule file parsing and loading
//! - [`cache`]: Response caching with TTL support
//! - [`stats`]: Usage counters and top blocked domains
//! - [`server`]: Query pipeline orchestration
//! - [`http`]: The DoH endpoint and admin routes
//! - [`error`]: Error types
//!
//! # Testing
//!
//! All components are designed with trait-based abstractions to enable
//! comprehensive testing without network access:
//!
//! ```rust
//! use doorman::filter::{Classifier, Decision};
//!
//! let mut rules = Classifier::default();
//! rules.add_block("*.ads.example");
//! assert_eq!(rules.classify("tracking.ads.example"), Decision::Block);
//! ```

pub mod cache;
pub mod config;
pub mod dns;
pub mod error;
pub mod filter;
pub mod http;
pub mod metrics;
pub mod rulelist;
pub mod server;
pub mod stats;

pub use config::Config;
pub use error::{Error, Result};
