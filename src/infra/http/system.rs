use axum::{Json, extract::State};
use catalogd_api_types::InitializeResponse;

use crate::application::error::CatalogError;

use super::AppState;

pub(super) async fn initialize(
    State(state): State<AppState>,
) -> Result<Json<InitializeResponse>, CatalogError> {
    Ok(Json(state.maintenance.initialize().await?))
}
