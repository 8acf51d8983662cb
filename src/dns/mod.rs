//! DNS protocol handling: wire parsing, blocked-response synthesis and
//! upstream resolution.

pub mod resolver;
pub mod synth;
pub mod wire;

pub use resolver::{DohResolver, Origin, Resolution, UpstreamResolver};
pub use wire::{Question, parse_question};

/// Content type for wire-format DoH bodies.
pub const DNS_MESSAGE_CONTENT_TYPE: &str = "application/dns-message";

/// Content type for the JSON query variant.
pub const DNS_JSON_CONTENT_TYPE: &str = "application/dns-json";
