//! Mapping of service errors onto HTTP responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use crud_core::CrudError;
use serde::Serialize;

/// Handler error wrapping a [`CrudError`].
///
/// Already-exists maps to 409. Not-found on update and integrity
/// violations map to 500, the latter with the violated constraint nested
/// under `cause`.
#[derive(Debug)]
pub struct ApiError(pub CrudError);

impl From<CrudError> for ApiError {
    fn from(err: CrudError) -> Self {
        ApiError(err)
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<ErrorCause>,
}

#[derive(Debug, Serialize)]
struct ErrorCause {
    constraint: String,
    operation: String,
    detail: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CrudError::AlreadyExists(_) => StatusCode::CONFLICT,
            CrudError::NotFound(_)
            | CrudError::IntegrityViolation { .. }
            | CrudError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, kind = self.0.kind(), "Request failed");
        } else {
            tracing::warn!(error = %self.0, kind = self.0.kind(), "Request rejected");
        }

        let cause = match &self.0 {
            CrudError::IntegrityViolation {
                constraint,
                operation,
                detail,
            } => Some(ErrorCause {
                constraint: constraint.clone(),
                operation: operation.clone(),
                detail: detail.clone(),
            }),
            _ => None,
        };

        let body = ErrorBody {
            error: self.0.kind(),
            message: self.0.to_string(),
            cause,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (CrudError::AlreadyExists("a".into()), StatusCode::CONFLICT),
            (CrudError::NotFound("b".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (
                CrudError::integrity("fk", "delete", "failed"),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
            (CrudError::Database("c".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError(err).status(), expected);
        }
    }
}
