use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;
use tokio::task::JoinError;

use crate::{
    application::{ingest::IngestError, repos::RepoError},
    domain::error::DomainError,
    infra::error::InfraError,
};

#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = vec![error.to_string()];
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// Failure of a catalog operation, as seen by clients.
///
/// `Clone` because a single origin failure is handed to every request
/// coalesced onto it.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("upstream failure: {message}")]
    Upstream { message: String },
    #[error("internal error: {message}")]
    Internal { message: String },
}

impl CatalogError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::NotFound { .. } => StatusCode::NOT_FOUND,
            CatalogError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
            CatalogError::Upstream { .. } | CatalogError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn presentation_message(&self) -> &'static str {
        match self {
            CatalogError::NotFound { .. } => "Resource not found",
            CatalogError::InvalidInput { .. } => "Request could not be processed",
            CatalogError::Upstream { .. } | CatalogError::Internal { .. } => {
                "Internal server error"
            }
        }
    }
}

impl From<RepoError> for CatalogError {
    fn from(error: RepoError) -> Self {
        match error {
            RepoError::NotFound => CatalogError::not_found("record"),
            RepoError::Duplicate { .. } | RepoError::Persistence(_) | RepoError::Timeout => {
                CatalogError::upstream(error.to_string())
            }
        }
    }
}

impl From<DomainError> for CatalogError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::NotFound { entity } => CatalogError::NotFound { entity },
            DomainError::Validation { message } => CatalogError::InvalidInput { message },
        }
    }
}

impl From<IngestError> for CatalogError {
    fn from(error: IngestError) -> Self {
        CatalogError::invalid_input(error.to_string())
    }
}

impl From<JoinError> for CatalogError {
    fn from(error: JoinError) -> Self {
        CatalogError::internal(format!("background computation failed: {error}"))
    }
}

impl From<serde_json::Error> for CatalogError {
    fn from(error: serde_json::Error) -> Self {
        CatalogError::internal(format!("response encoding failed: {error}"))
    }
}

impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let report = ErrorReport::from_error("application::error::CatalogError", status, &self);
        let mut response = (status, self.presentation_message()).into_response();
        report.attach(&mut response);
        response
    }
}

/// Top-level failure of a command run from `main`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_failures_map_to_taxonomy() {
        assert_eq!(
            CatalogError::from(RepoError::NotFound).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            CatalogError::from(RepoError::Duplicate {
                constraint: "chair_pkey".into()
            })
            .status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CatalogError::from(RepoError::Timeout).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            CatalogError::from(RepoError::Persistence("connection reset".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn response_hides_detail_and_carries_report() {
        let response =
            CatalogError::upstream("relation \"chair\" does not exist").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("error report attached");
        assert!(report.messages[0].contains("relation"));
    }
}
