use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::application::chairs::ChairSearchParams;
use crate::application::error::CatalogError;

use super::{AppState, json_bytes, parse_id, require_contact};

pub(super) async fn chair_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, CatalogError> {
    let chair = state.chairs.detail(parse_id(&id)?).await?;
    Ok(Json(chair).into_response())
}

pub(super) async fn search_chairs(
    State(state): State<AppState>,
    Query(params): Query<ChairSearchParams>,
) -> Result<Response, CatalogError> {
    let body = state.chairs.search(&params).await?;
    Ok(json_bytes(body))
}

pub(super) async fn low_priced_chairs(
    State(state): State<AppState>,
) -> Result<Response, CatalogError> {
    let body = state.chairs.lowest_priced().await?;
    Ok(json_bytes(body))
}

pub(super) async fn chair_search_condition(State(state): State<AppState>) -> Response {
    json_bytes(state.conditions.chair_json())
}

pub(super) async fn post_chairs(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<StatusCode, CatalogError> {
    let data = read_upload(multipart, "chairs").await?;
    state.chairs.ingest_csv(&data).await?;
    Ok(StatusCode::CREATED)
}

pub(super) async fn buy_chair(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<StatusCode, CatalogError> {
    require_contact(&body)?;
    state.chairs.buy(parse_id(&id)?).await?;
    Ok(StatusCode::OK)
}

/// Contents of the multipart file field `name`.
pub(super) async fn read_upload(
    mut multipart: Multipart,
    name: &'static str,
) -> Result<Bytes, CatalogError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| CatalogError::invalid_input(format!("invalid multipart payload: {err}")))?
    {
        if field.name() == Some(name) {
            return field.bytes().await.map_err(|err| {
                CatalogError::invalid_input(format!("failed to read upload: {err}"))
            });
        }
    }
    Err(CatalogError::invalid_input(format!(
        "multipart field `{name}` is missing"
    )))
}
