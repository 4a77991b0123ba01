use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::WorkflowError;

/// Envelope every JSON endpoint answers with.
#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<serde_json::Value>,
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> axum::response::Response {
        let status =
            StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self)).into_response()
    }
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a success response
    pub fn success(status: StatusCode, message: impl Into<String>, data: T) -> Self {
        ApiResponse {
            success: true,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: Some(data),
            errors: None,
        }
    }

    /// Create an error response
    pub fn error(
        status: StatusCode,
        message: impl Into<String>,
        errors: Option<serde_json::Value>,
    ) -> Self {
        ApiResponse {
            success: false,
            status_code: status.as_u16(),
            message: message.into(),
            timestamp: Utc::now().to_rfc3339(),
            data: None,
            errors,
        }
    }
}

impl From<WorkflowError> for ApiResponse<()> {
    fn from(err: WorkflowError) -> Self {
        let status = err.status_code();
        if status.is_server_error() {
            error!("request failed: {err}");
            return ApiResponse::error(status, "Internal server error", None);
        }
        warn!("request rejected: {err}");
        ApiResponse::error(status, err.to_string(), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn workflow_errors_keep_their_status() {
        let response: ApiResponse<()> = WorkflowError::NotOwner(Uuid::nil()).into();
        assert!(!response.success);
        assert_eq!(response.status_code, 403);
        assert!(response.message.contains("assigned to someone else"));
        assert!(response.errors.is_none());
    }

    #[test]
    fn store_failures_stay_out_of_the_body() {
        let err = WorkflowError::from(crate::error::StoreError::Corrupt {
            id: Uuid::nil(),
            reason: "details tagged email on a database request".into(),
        });
        let body = serde_json::to_value(ApiResponse::from(err)).unwrap();
        assert_eq!(body["status_code"], 500);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("errors").is_none());
        assert!(!body.to_string().contains("details tagged"));
    }

    #[test]
    fn success_omits_error_field() {
        let body = serde_json::to_value(ApiResponse::success(StatusCode::OK, "ok", 7)).unwrap();
        assert_eq!(body["data"], 7);
        assert_eq!(body["success"], true);
        assert!(body.get("errors").is_none());
    }
}
