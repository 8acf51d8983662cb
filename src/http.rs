//! HTTP transport for the DoH endpoint and the admin surface.
//!
//! Thin by design: request decoding and response tagging live here,
//! every decision about a query is made by [`QueryHandler`]. Routes:
//!
//!   GET  /dns-query?dns=<base64url>   wire-format query, RFC 8484
//!   POST /dns-query                   wire-format query in the body
//!   GET  /resolve?name=&type=         JSON variant
//!   GET  /admin/rules                 current rule lists
//!   POST /admin/rules                 add a rule entry
//!   GET  /admin/stats                 usage counters

use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::Bytes;
use serde::Deserialize;
use tracing::warn;

use crate::cache::ResponseCache;
use crate::dns::{DNS_JSON_CONTENT_TYPE, DNS_MESSAGE_CONTENT_TYPE, DohResolver, Origin};
use crate::server::{QueryHandler, Reply, Served};

/// RFC 8484 §6: maximum wire-format message size for DoH.
const MAX_MESSAGE_BYTES: usize = 65_535;

const X_CACHE: HeaderName = HeaderName::from_static("x-cache");
const X_BLOCKED_DOMAIN: HeaderName = HeaderName::from_static("x-blocked-domain");

/// Build the application router around a query handler.
pub fn router<C, R>(handler: QueryHandler<C, R>) -> Router
where
    C: ResponseCache,
    R: DohResolver,
{
    Router::new()
        .route("/dns-query", get(wire_get::<C, R>).post(wire_post::<C, R>))
        .route("/resolve", get(json_get::<C, R>))
        .route(
            "/admin/rules",
            get(list_rules::<C, R>).post(add_rule::<C, R>),
        )
        .route("/admin/stats", get(read_stats::<C, R>))
        .with_state(handler)
}

#[derive(Deserialize)]
struct WireParams {
    dns: String,
}

async fn wire_get<C, R>(
    State(handler): State<QueryHandler<C, R>>,
    Query(params): Query<WireParams>,
) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    let raw = decode_dns_param(&params.dns);
    if raw.len() > MAX_MESSAGE_BYTES {
        return (StatusCode::PAYLOAD_TOO_LARGE, "DNS message too large").into_response();
    }

    serve_wire(handler, raw.into()).await
}

async fn wire_post<C, R>(
    State(handler): State<QueryHandler<C, R>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    if !has_dns_content_type(&headers) {
        return (
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            "expected application/dns-message",
        )
            .into_response();
    }
    if body.len() > MAX_MESSAGE_BYTES {
        return (StatusCode::PAYLOAD_TOO_LARGE, "DNS message too large").into_response();
    }

    serve_wire(handler, body).await
}

async fn serve_wire<C, R>(handler: QueryHandler<C, R>, raw: Bytes) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    match handler.handle(raw).await {
        Ok(reply) => tagged_response(reply, DNS_MESSAGE_CONTENT_TYPE),
        Err(err) => {
            warn!(error = %err, "query handling failed");
            (StatusCode::BAD_GATEWAY, "upstream resolution failed").into_response()
        }
    }
}

#[derive(Deserialize)]
struct ResolveParams {
    name: Option<String>,
    #[serde(rename = "type")]
    rtype: Option<String>,
}

async fn json_get<C, R>(
    State(handler): State<QueryHandler<C, R>>,
    Query(params): Query<ResolveParams>,
) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    let Some(name) = params.name.filter(|name| !name.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "missing name parameter").into_response();
    };
    let rtype = params.rtype.unwrap_or_else(|| "A".to_string());

    match handler.handle_json(&name, &rtype).await {
        Ok(reply) => tagged_response(reply, DNS_JSON_CONTENT_TYPE),
        Err(err) => {
            warn!(error = %err, "query handling failed");
            (StatusCode::BAD_GATEWAY, "upstream resolution failed").into_response()
        }
    }
}

/// Which rule list an addition targets.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
enum RuleList {
    Allow,
    Block,
    Pattern,
}

#[derive(Deserialize)]
struct AddRule {
    list: RuleList,
    value: String,
}

async fn list_rules<C, R>(State(handler): State<QueryHandler<C, R>>) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    Json(handler.rules().snapshot()).into_response()
}

async fn add_rule<C, R>(
    State(handler): State<QueryHandler<C, R>>,
    Json(request): Json<AddRule>,
) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    match request.list {
        RuleList::Allow => handler.rules().add_allow(&request.value),
        RuleList::Block => handler.rules().add_block(&request.value),
        RuleList::Pattern => {
            if let Err(err) = handler.rules().add_pattern(&request.value) {
                return (StatusCode::UNPROCESSABLE_ENTITY, err.to_string()).into_response();
            }
        }
    }

    StatusCode::NO_CONTENT.into_response()
}

async fn read_stats<C, R>(State(handler): State<QueryHandler<C, R>>) -> Response
where
    C: ResponseCache,
    R: DohResolver,
{
    Json(handler.stats().snapshot()).into_response()
}

/// Decode the `dns` query parameter from base64url.
///
/// Tolerates missing padding, per RFC 8484 examples. Malformed input
/// yields an empty buffer rather than an error, so the pipeline treats
/// it like any other unparseable query.
fn decode_dns_param(value: &str) -> Vec<u8> {
    let mut normalized = value.replace('-', "+").replace('_', "/");
    while normalized.len() % 4 != 0 {
        normalized.push('=');
    }
    STANDARD.decode(normalized).unwrap_or_default()
}

fn has_dns_content_type(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or(value).trim())
        .is_some_and(|media| media.eq_ignore_ascii_case(DNS_MESSAGE_CONTENT_TYPE))
}

fn tagged_response(reply: Reply, content_type: &'static str) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );

    match &reply.served {
        Served::Blocked { domain } => {
            // Label bytes outside visible ASCII cannot ride in a header.
            if let Ok(value) = HeaderValue::from_str(domain) {
                headers.insert(X_BLOCKED_DOMAIN, value);
            }
        }
        Served::CacheHit => {
            headers.insert(X_CACHE, HeaderValue::from_static("HIT"));
        }
        Served::Forwarded(Origin::Primary) => {
            headers.insert(X_CACHE, HeaderValue::from_static("MISS"));
        }
        Served::Forwarded(Origin::Fallback) => {
            headers.insert(X_CACHE, HeaderValue::from_static("FALLBACK"));
        }
    }

    (StatusCode::OK, headers, reply.body).into_response()
}
