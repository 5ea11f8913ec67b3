//! Mapping of core error kinds onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::common::MembershipError;

impl MembershipError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            MembershipError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            MembershipError::NotFound(_) => StatusCode::NOT_FOUND,
            MembershipError::Conflict(_) => StatusCode::CONFLICT,
            MembershipError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message; input errors are returned verbatim
    fn public_message(&self) -> String {
        match self {
            MembershipError::InvalidInput(msg) => msg.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for MembershipError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_map_to_statuses() {
        assert_eq!(
            MembershipError::invalid("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            MembershipError::not_found("x").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            MembershipError::Conflict("x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            MembershipError::Storage(anyhow::anyhow!("x")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
