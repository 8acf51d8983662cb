//! Query pipeline orchestration.
//!
//! Coordinates question parsing, rule classification, the response
//! cache, and upstream resolution. Designed with trait-based
//! dependencies for testability; the HTTP layer only sees [`Reply`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use tracing::{debug, info, instrument, warn};

use crate::cache::{self, ResponseCache};
use crate::dns::resolver::Resolution;
use crate::dns::{DohResolver, Origin, synth, wire};
use crate::error::Result;
use crate::filter::{Decision, RuleStore};
use crate::stats::StatsTracker;

/// How a query was answered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Served {
    /// The domain matched the block rules; the body is synthesized.
    Blocked { domain: String },
    /// Answered from the response cache.
    CacheHit,
    /// Forwarded to an upstream resolver.
    Forwarded(Origin),
}

/// Outcome of handling a query: the response body plus how it was
/// produced, so the HTTP layer can set diagnostic headers.
#[derive(Debug, Clone)]
pub struct Reply {
    pub body: Bytes,
    pub served: Served,
}

/// DNS query handler that processes queries using the provided dependencies.
///
/// This struct encapsulates the core pipeline, separated from the HTTP
/// transport layer for easier testing. Rule store and stats are shared
/// with the admin endpoints through the accessors.
pub struct QueryHandler<C, R>
where
    C: ResponseCache,
    R: DohResolver,
{
    cache: C,
    resolver: R,
    rules: Arc<RuleStore>,
    stats: Arc<StatsTracker>,
    ttl: Duration,
}

impl<C, R> QueryHandler<C, R>
where
    C: ResponseCache,
    R: DohResolver,
{
    /// Create a new query handler.
    pub fn new(
        cache: C,
        resolver: R,
        rules: RuleStore,
        stats: StatsTracker,
        ttl: Duration,
    ) -> Self {
        Self {
            cache,
            resolver,
            rules: Arc::new(rules),
            stats: Arc::new(stats),
            ttl,
        }
    }

    /// Rule store shared with the admin endpoints.
    pub fn rules(&self) -> &RuleStore {
        &self.rules
    }

    /// Stats tracker shared with the admin endpoints.
    pub fn stats(&self) -> &StatsTracker {
        &self.stats
    }

    /// Handle a raw wire-format query and return the response.
    #[instrument(skip(self, raw), fields(domain))]
    pub async fn handle(&self, raw: Bytes) -> Result<Reply> {
        self.stats.record_total();
        counter!("doorman_queries_total").increment(1);

        let question = wire::parse_question(&raw);
        if question.is_unparsed() {
            // Nothing to classify; pass the query through untouched and
            // let the upstream answer whatever it answers.
            warn!("query has no parseable question, forwarding as-is");
            let resolution = self.forward(&raw).await?;
            self.stats.record_allowed();
            return Ok(Reply {
                body: resolution.body,
                served: Served::Forwarded(resolution.origin),
            });
        }

        tracing::Span::current().record("domain", question.name.as_str());

        match self.rules.classify(&question.name) {
            Decision::Block => {
                info!("domain {} is blocked", question.name);
                self.stats.record_blocked(&question.name);
                counter!("doorman_blocked_total").increment(1);
                return Ok(Reply {
                    body: synth::blocked_response(&raw).into(),
                    served: Served::Blocked {
                        domain: question.name,
                    },
                });
            }
            Decision::Allow => {}
        }

        let key = cache::wire_key(&question.name, question.qtype);
        if let Some(body) = self.cache.get(&key).await {
            debug!("cache hit for {}", question.name);
            counter!("doorman_cache_hits_total").increment(1);
            self.stats.record_allowed();
            return Ok(Reply {
                body,
                served: Served::CacheHit,
            });
        }

        debug!("cache miss for {}, forwarding to upstream", question.name);
        counter!("doorman_cache_misses_total").increment(1);

        let resolution = self.forward(&raw).await?;
        self.cache
            .insert(key, resolution.body.clone(), self.ttl)
            .await;
        self.stats.record_allowed();

        Ok(Reply {
            body: resolution.body,
            served: Served::Forwarded(resolution.origin),
        })
    }

    /// Handle a JSON-variant query for `name` with record type `rtype`.
    ///
    /// The name is lowercased and stripped of a trailing dot before
    /// classification, the type is uppercased; both feed the cache key,
    /// so `Example.COM.`/`a` and `example.com`/`A` share an entry.
    #[instrument(skip(self), fields(domain = %name))]
    pub async fn handle_json(&self, name: &str, rtype: &str) -> Result<Reply> {
        self.stats.record_total();
        counter!("doorman_queries_total").increment(1);

        let name = name.trim_end_matches('.').to_ascii_lowercase();
        let rtype = rtype.to_ascii_uppercase();

        match self.rules.classify(&name) {
            Decision::Block => {
                info!("domain {} is blocked", name);
                self.stats.record_blocked(&name);
                counter!("doorman_blocked_total").increment(1);
                let body = synth::blocked_json(&name, &rtype).to_string();
                return Ok(Reply {
                    body: body.into(),
                    served: Served::Blocked { domain: name },
                });
            }
            Decision::Allow => {}
        }

        let key = cache::json_key(&name, &rtype);
        if let Some(body) = self.cache.get(&key).await {
            debug!("cache hit for {}", name);
            counter!("doorman_cache_hits_total").increment(1);
            self.stats.record_allowed();
            return Ok(Reply {
                body,
                served: Served::CacheHit,
            });
        }

        debug!("cache miss for {}, forwarding to upstream", name);
        counter!("doorman_cache_misses_total").increment(1);

        let resolution = self.forward_json(&name, &rtype).await?;
        self.cache
            .insert(key, resolution.body.clone(), self.ttl)
            .await;
        self.stats.record_allowed();

        Ok(Reply {
            body: resolution.body,
            served: Served::Forwarded(resolution.origin),
        })
    }

    async fn forward(&self, raw: &[u8]) -> Result<Resolution> {
        let resolution = match self.resolver.resolve(raw).await {
            Ok(resolution) => resolution,
            Err(err) => {
                counter!("doorman_upstream_errors_total").increment(1);
                return Err(err.into());
            }
        };
        if resolution.origin == Origin::Fallback {
            counter!("doorman_upstream_fallbacks_total").increment(1);
        }
        Ok(resolution)
    }

    async fn forward_json(&self, name: &str, rtype: &str) -> Result<Resolution> {
        let resolution = match self.resolver.resolve_json(name, rtype).await {
            Ok(resolution) => resolution,
            Err(err) => {
                counter!("doorman_upstream_errors_total").increment(1);
                return Err(err.into());
            }
        };
        if resolution.origin == Origin::Fallback {
            counter!("doorman_upstream_fallbacks_total").increment(1);
        }
        Ok(resolution)
    }
}

impl<C, R> Clone for QueryHandler<C, R>
where
    C: ResponseCache,
    R: DohResolver,
{
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            resolver: self.resolver.clone(),
            rules: Arc::clone(&self.rules),
            stats: Arc::clone(&self.stats),
            ttl: self.ttl,
        }
    }
}
