//! Upstream DoH resolution.
//!
//! Abstracts the outbound transport behind a trait so the query pipeline
//! can be exercised with mock resolvers. The production implementation
//! speaks DoH over HTTPS: wire-format queries are POSTed, the JSON
//! variant is proxied as a GET against the same endpoints.

use std::future::Future;
use std::time::Duration;

use bytes::Bytes;
use reqwest::header;
use tracing::warn;

use super::{DNS_JSON_CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE};
use crate::config::UpstreamConfig;
use crate::error::{ResolveError, Result};

/// Which upstream endpoint produced a response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Origin {
    #[default]
    Primary,
    Fallback,
}

/// A successful upstream answer: the response body plus which endpoint
/// served it, so the HTTP layer can tag fallback responses.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub body: Bytes,
    pub origin: Origin,
}

/// Trait for DoH resolution against an upstream resolver.
///
/// Implementations must retry a configured fallback endpoint once when
/// the primary fails; the caller only sees the final outcome.
pub trait DohResolver: Send + Sync + Clone + 'static {
    /// Resolve a raw wire-format query and return the response bytes.
    fn resolve(
        &self,
        query: &[u8],
    ) -> impl Future<Output = std::result::Result<Resolution, ResolveError>> + Send;

    /// Resolve a name through the upstream's JSON API.
    fn resolve_json(
        &self,
        name: &str,
        rtype: &str,
    ) -> impl Future<Output = std::result::Result<Resolution, ResolveError>> + Send;
}

/// Production resolver forwarding to configured DoH endpoints.
#[derive(Clone)]
pub struct UpstreamResolver {
    client: reqwest::Client,
    primary: String,
    fallback: Option<String>,
}

impl UpstreamResolver {
    /// Create a resolver from the upstream configuration.
    ///
    /// The HTTP client is shared across requests and carries the
    /// configured timeout, so no upstream call can suspend indefinitely.
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("doorman/", env!("CARGO_PKG_VERSION")))
            .gzip(true)
            .build()
            .map_err(ResolveError::from)?;

        Ok(Self {
            client,
            primary: config.primary.clone(),
            fallback: config.fallback.clone(),
        })
    }

    async fn post_wire(
        &self,
        endpoint: &str,
        query: &[u8],
    ) -> std::result::Result<Bytes, ResolveError> {
        let response = self
            .client
            .post(endpoint)
            .header(header::CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE)
            .header(header::ACCEPT, DNS_MESSAGE_CONTENT_TYPE)
            .body(query.to_vec())
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ResolveError::Status(response.status().as_u16()));
        }

        Ok(response.bytes().await?)
    }

    async fn get_json(
        &self,
        endpoint: &str,
        name: &str,
        rtype: &str,
    ) -> std::result::Result<Bytes, ResolveError> {
        let response = self
            .client
            .get(endpoint)
            .query(&[("name", name), ("type", rtype)])
            .header(header::ACCEPT, DNS_JSON_CONTENT_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ResolveError::Status(response.status().as_u16()));
        }

        Ok(response.bytes().await?)
    }
}

impl DohResolver for UpstreamResolver {
    async fn resolve(&self, query: &[u8]) -> std::result::Result<Resolution, ResolveError> {
        match self.post_wire(&self.primary, query).await {
            Ok(body) => Ok(Resolution {
                body,
                origin: Origin::Primary,
            }),
            Err(primary_err) => {
                let Some(fallback) = self.fallback.as_deref() else {
                    return Err(primary_err);
                };
                warn!(error = %primary_err, "primary upstream failed, trying fallback");
                let body = self.post_wire(fallback, query).await?;
                Ok(Resolution {
                    body,
                    origin: Origin::Fallback,
                })
            }
        }
    }

    async fn resolve_json(
        &self,
        name: &str,
        rtype: &str,
    ) -> std::result::Result<Resolution, ResolveError> {
        match self.get_json(&self.primary, name, rtype).await {
            Ok(body) => Ok(Resolution {
                body,
                origin: Origin::Primary,
            }),
            Err(primary_err) => {
                let Some(fallback) = self.fallback.as_deref() else {
                    return Err(primary_err);
                };
                warn!(error = %primary_err, "primary upstream failed, trying fallback");
                let body = self.get_json(fallback, name, rtype).await?;
                Ok(Resolution {
                    body,
                    origin: Origin::Fallback,
                })
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use crate::dns::synth;
    use crate::dns::wire;
    use std::collections::HashMap;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio::sync::RwLock;

    /// Mock resolver for testing.
    ///
    /// Allows pre-configuring responses per domain and tracking calls.
    #[derive(Clone, Default)]
    pub struct MockResolver {
        /// Pre-configured wire responses by domain name.
        pub responses: Arc<RwLock<HashMap<String, Bytes>>>,
        /// Pre-configured JSON responses by (name, type).
        pub json_responses: Arc<RwLock<HashMap<(String, String), Bytes>>>,
        /// If set, resolve calls fail with this HTTP status.
        pub error_status: Arc<RwLock<Option<u16>>>,
        /// Origin to report on successful resolutions.
        pub origin: Arc<RwLock<Origin>>,
        /// Count of wire resolve calls.
        pub resolve_count: Arc<AtomicU64>,
        /// Count of JSON resolve calls.
        pub json_count: Arc<AtomicU64>,
    }

    impl MockResolver {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-configure the wire response for a domain.
        pub async fn add_response(&self, domain: &str, body: impl Into<Bytes>) {
            self.responses
                .write()
                .await
                .insert(domain.to_string(), body.into());
        }

        /// Pre-configure the JSON response for a (name, type) pair.
        pub async fn add_json_response(&self, name: &str, rtype: &str, body: impl Into<Bytes>) {
            self.json_responses
                .write()
                .await
                .insert((name.to_string(), rtype.to_string()), body.into());
        }

        /// Make all resolve calls fail with the given HTTP status.
        pub async fn set_error(&self, status: u16) {
            *self.error_status.write().await = Some(status);
        }

        /// Report successes as coming from the given origin.
        pub async fn set_origin(&self, origin: Origin) {
            *self.origin.write().await = origin;
        }

        pub fn resolve_count(&self) -> u64 {
            self.resolve_count.load(Ordering::SeqCst)
        }

        pub fn json_count(&self) -> u64 {
            self.json_count.load(Ordering::SeqCst)
        }
    }

    impl DohResolver for MockResolver {
        async fn resolve(&self, query: &[u8]) -> std::result::Result<Resolution, ResolveError> {
            self.resolve_count.fetch_add(1, Ordering::SeqCst);

            if let Some(status) = *self.error_status.read().await {
                return Err(ResolveError::Status(status));
            }

            let origin = *self.origin.read().await;
            let question = wire::parse_question(query);
            if let Some(body) = self.responses.read().await.get(&question.name) {
                return Ok(Resolution {
                    body: body.clone(),
                    origin,
                });
            }

            // No response configured: answer NXDOMAIN like a resolver
            // that knows nothing about the name.
            Ok(Resolution {
                body: synth::blocked_response(query).into(),
                origin,
            })
        }

        async fn resolve_json(
            &self,
            name: &str,
            rtype: &str,
        ) -> std::result::Result<Resolution, ResolveError> {
            self.json_count.fetch_add(1, Ordering::SeqCst);

            if let Some(status) = *self.error_status.read().await {
                return Err(ResolveError::Status(status));
            }

            let origin = *self.origin.read().await;
            let key = (name.to_string(), rtype.to_string());
            if let Some(body) = self.json_responses.read().await.get(&key) {
                return Ok(Resolution {
                    body: body.clone(),
                    origin,
                });
            }

            let body = serde_json::json!({ "Status": 0, "Answer": [] }).to_string();
            Ok(Resolution {
                body: body.into(),
                origin,
            })
        }
    }

    fn build_query(domain: &str) -> Vec<u8> {
        let mut message = vec![
            0x00, 0x07, 0x01, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
        ];
        for label in domain.split('.') {
            message.push(label.len() as u8);
            message.extend_from_slice(label.as_bytes());
        }
        message.push(0);
        message.extend_from_slice(&[0x00, 0x01, 0x00, 0x01]);
        message
    }

    #[tokio::test]
    async fn should_return_configured_response_for_domain() {
        let resolver = MockResolver::new();
        resolver
            .add_response("example.com", Bytes::from_static(b"answer"))
            .await;

        let resolution = resolver.resolve(&build_query("example.com")).await.unwrap();

        assert_eq!(resolution.body.as_ref(), b"answer");
        assert_eq!(resolution.origin, Origin::Primary);
        assert_eq!(resolver.resolve_count(), 1);
    }

    #[tokio::test]
    async fn should_synthesize_nxdomain_when_no_response_configured() {
        let resolver = MockResolver::new();
        let query = build_query("unknown.example");

        let resolution = resolver.resolve(&query).await.unwrap();

        assert_eq!(resolution.body[..2], query[..2]);
        assert_eq!(resolution.body[3] & 0x0F, 0x03);
    }

    #[tokio::test]
    async fn should_fail_when_error_status_configured() {
        let resolver = MockResolver::new();
        resolver.set_error(502).await;

        let result = resolver.resolve(&build_query("example.com")).await;

        assert!(matches!(result, Err(ResolveError::Status(502))));
    }

    #[tokio::test]
    async fn should_report_configured_origin() {
        let resolver = MockResolver::new();
        resolver.set_origin(Origin::Fallback).await;

        let resolution = resolver.resolve(&build_query("example.com")).await.unwrap();

        assert_eq!(resolution.origin, Origin::Fallback);
    }
}
