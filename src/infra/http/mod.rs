mod chairs;
mod estates;
mod middleware;
mod system;

pub use middleware::{BotFilter, RequestContext};

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::DefaultBodyLimit,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware as axum_middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use bytes::Bytes;

use crate::application::chairs::ChairService;
use crate::application::error::CatalogError;
use crate::application::estates::EstateService;
use crate::application::maintenance::MaintenanceService;
use crate::domain::conditions::SearchConditions;

use middleware::{log_responses, reject_bots, set_request_context};

#[derive(Clone)]
pub struct AppState {
    pub chairs: Arc<ChairService>,
    pub estates: Arc<EstateService>,
    pub maintenance: Arc<MaintenanceService>,
    pub conditions: Arc<SearchConditions>,
}

/// Router options that are not part of [`AppState`].
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Rejects crawler traffic before any handler runs when set.
    pub bot_filter: Option<BotFilter>,
    /// Body size limit for CSV uploads, in bytes.
    pub max_upload_bytes: Option<usize>,
}

pub fn build_router(state: AppState, options: RouterOptions) -> Router {
    let uploads = Router::new()
        .route("/api/chair", post(chairs::post_chairs))
        .route("/api/estate", post(estates::post_estates));
    let uploads = match options.max_upload_bytes {
        Some(limit) => uploads.layer(DefaultBodyLimit::max(limit)),
        None => uploads,
    };

    let router = Router::new()
        .route("/initialize", post(system::initialize))
        .route("/api/chair/search", get(chairs::search_chairs))
        .route("/api/chair/low_priced", get(chairs::low_priced_chairs))
        .route(
            "/api/chair/search/condition",
            get(chairs::chair_search_condition),
        )
        .route("/api/chair/buy/{id}", post(chairs::buy_chair))
        .route("/api/chair/{id}", get(chairs::chair_detail))
        .route("/api/estate/search", get(estates::search_estates))
        .route("/api/estate/low_priced", get(estates::low_priced_estates))
        .route(
            "/api/estate/search/condition",
            get(estates::estate_search_condition),
        )
        .route("/api/estate/req_doc/{id}", post(estates::request_document))
        .route("/api/estate/nazotte", post(estates::search_area))
        .route("/api/estate/{id}", get(estates::estate_detail))
        .route(
            "/api/recommended_estate/{id}",
            get(estates::recommended_estates),
        )
        .merge(uploads)
        .with_state(state)
        .layer(axum_middleware::from_fn(log_responses))
        .layer(axum_middleware::from_fn(set_request_context));

    match options.bot_filter {
        Some(filter) => router.layer(axum_middleware::from_fn_with_state(
            Arc::new(filter),
            reject_bots,
        )),
        None => router,
    }
}

/// 200 with an already encoded JSON body.
fn json_bytes(body: Bytes) -> Response {
    Response::builder()
        .status(StatusCode::OK)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn parse_id(raw: &str) -> Result<i64, CatalogError> {
    raw.trim()
        .parse()
        .map_err(|_| CatalogError::invalid_input(format!("`{raw}` is not a valid id")))
}

/// Purchase and document requests must name a contact address.
fn require_contact(body: &[u8]) -> Result<String, CatalogError> {
    let request: catalogd_api_types::ContactRequest = serde_json::from_slice(body)
        .map_err(|err| CatalogError::invalid_input(format!("invalid contact request: {err}")))?;
    if request.email.trim().is_empty() {
        return Err(CatalogError::invalid_input("email must not be empty"));
    }
    Ok(request.email)
}
