use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::core::NfseError;

/// Error returned by the HTTP handlers.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Nfse(#[from] NfseError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Nfse(
                NfseError::Upload(_)
                | NfseError::NoUpload
                | NfseError::MissingColumn { .. }
                | NfseError::MalformedValue { .. }
                | NfseError::UnresolvedRows { .. }
                | NfseError::InvalidRow { .. }
                | NfseError::Workbook(_),
            ) => StatusCode::BAD_REQUEST,
            Self::Nfse(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Nfse(NfseError::Upload(_)) => "UPLOAD_REJECTED",
            Self::Nfse(NfseError::NoUpload) => "NO_UPLOAD",
            Self::Nfse(
                NfseError::MissingColumn { .. }
                | NfseError::MalformedValue { .. }
                | NfseError::UnresolvedRows { .. }
                | NfseError::InvalidRow { .. }
                | NfseError::Workbook(_),
            ) => "INVALID_WORKBOOK",
            Self::Nfse(_) | Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.error_code(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_problems_are_client_errors() {
        assert_eq!(
            ApiError::from(NfseError::NoUpload).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(NfseError::MissingColumn {
                sheet: "dm".into(),
                column: "cidade/uf".into()
            })
            .error_code(),
            "INVALID_WORKBOOK"
        );
    }

    #[test]
    fn server_problems_are_internal() {
        assert_eq!(
            ApiError::from(NfseError::Reference("missing".into())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            ApiError::Internal("join".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
