use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header::USER_AGENT},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
}

pub async fn set_request_context(mut request: Request<Body>, next: Next) -> Response {
    let request_id = Uuid::new_v4().to_string();
    let ctx = RequestContext {
        request_id: request_id.clone(),
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

/// Log failed requests together with the [`ErrorReport`] the handler
/// attached: server errors at `error`, client errors at `warn`.
pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();

    if status.is_client_error() || status.is_server_error() {
        let elapsed_ms = start.elapsed().as_millis();
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "catalogd::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "catalogd::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

/// Characters that end a crawler keyword such as `bot` in `Googlebot/2.1`.
const KEYWORD_DELIMITERS: &[char] = &['-', '_', ' ', '.', '/', ';', '@', '(', ')'];
const CRAWLER_KEYWORDS: &[&str] = &["bot", "crawler", "spider"];

/// User-agent based crawler rejection.
#[derive(Debug, Clone, Default)]
pub struct BotFilter {
    tokens: Vec<String>,
}

impl BotFilter {
    /// `tokens` are matched case-sensitively anywhere in the user agent, in
    /// addition to the built-in keyword rules.
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    pub fn is_bot(&self, user_agent: &str) -> bool {
        if user_agent == "/" {
            return true;
        }
        if self
            .tokens
            .iter()
            .any(|token| user_agent.contains(token.as_str()))
        {
            return true;
        }
        let lower = user_agent.to_ascii_lowercase();
        CRAWLER_KEYWORDS
            .iter()
            .any(|keyword| keyword_terminated(&lower, keyword))
    }
}

/// `keyword` occurs followed by a delimiter or the end of `haystack`.
fn keyword_terminated(haystack: &str, keyword: &str) -> bool {
    haystack.match_indices(keyword).any(|(at, _)| {
        haystack[at + keyword.len()..]
            .chars()
            .next()
            .is_none_or(|next| KEYWORD_DELIMITERS.contains(&next))
    })
}

pub async fn reject_bots(
    State(filter): State<Arc<BotFilter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let user_agent = request
        .headers()
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    if filter.is_bot(user_agent) {
        debug!(user_agent, path = %request.uri().path(), "Rejected crawler");
        return StatusCode::FORBIDDEN.into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> BotFilter {
        BotFilter::new(vec!["Mediapartners-ISUCON".into(), "isubot".into()])
    }

    #[test]
    fn keyword_needs_delimiter_or_end() {
        let filter = filter();
        assert!(filter.is_bot("Mozilla/5.0 (compatible; Googlebot/2.1)"));
        assert!(filter.is_bot("FriendlySpider"));
        assert!(filter.is_bot("some crawler (https://example.invalid/)"));
        assert!(!filter.is_bot("Mozilla/5.0 (X11; Linux x86_64) Firefox/120.0"));
        assert!(!filter.is_bot("robotics-lab-browser"));
    }

    #[test]
    fn configured_tokens_and_bare_slash_are_rejected() {
        let filter = filter();
        assert!(filter.is_bot("/"));
        assert!(filter.is_bot("Mediapartners-ISUCON"));
        assert!(filter.is_bot("x isubot"));
        assert!(!filter.is_bot(""));
    }
}
