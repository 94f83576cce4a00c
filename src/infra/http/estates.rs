use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use catalogd_api_types::Coordinates;

use crate::application::error::CatalogError;
use crate::application::estates::EstateSearchParams;
use crate::domain::geometry::Polygon;

use super::chairs::read_upload;
use super::{AppState, json_bytes, parse_id, require_contact};

pub(super) async fn estate_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let estate = state.estates.detail(parse_id(&id)?).await?;
    Ok(Json(estate).into_response())
}

pub(super) async fn search_estates(
    State(state): State<AppState>,
    Query(params): Query<EstateSearchParams>,
) -> Result<Response, CatalogError> {
    let body = state.estates.search(&params).await?;
    Ok(json_bytes(body))
}

pub(super) async fn low_priced_estates(
    State(state): State<AppState>,
) -> Result<Response, CatalogError> {
    let body = state.estates.lowest_priced().await?;
    Ok(json_bytes(body))
}

pub(super) async fn estate_search_condition(State(state): State<AppState>) -> Response {
    json_bytes(state.conditions.estate_json())
}

pub(super) async fn post_estates(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<StatusCode, CatalogError> {
    let data = read_upload(multipart, "estates").await?;
    state.estates.ingest_csv(&data).await?;
    Ok(StatusCode::CREATED)
}

pub(super) async fn request_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, CatalogError> {
    require_contact(&body)?;
    state.estates.request_document(parse_id(&id)?).await?;
    Ok(StatusCode::OK)
}

pub(super) async fn search_area(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Response, CatalogError> {
    let coordinates: Coordinates = serde_json::from_slice(&body)
        .map_err(|err| CatalogError::invalid_input(format!("invalid coordinates: {err}")))?;
    let polygon = Polygon::from_coordinates(&coordinates.coordinates)?;
    let body = state.estates.search_area(&polygon).await?;
    Ok(json_bytes(body))
}

pub(super) async fn recommended_estates(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let body = state
        .estates
        .recommended_for_chair(parse_id(&id)?)
        .await?;
    Ok(json_bytes(body))
}
