//! Mapping of domain errors to JSON responses.
//!
//! Every error body has the shape `{"error": CODE, "message": text}`.
//! Server-side failures are logged and answered with a generic message.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use expensa_core::access::AccessError;
use expensa_core::workflow::WorkflowError;
use expensa_db::{ApprovalRuleError, UserError};
use expensa_shared::AppError;
use serde_json::json;
use tracing::error;

/// Builds an error response.
pub fn error_response(status: StatusCode, code: &str, message: impl Into<String>) -> Response {
    (
        status,
        Json(json!({
            "error": code,
            "message": message.into()
        })),
    )
        .into_response()
}

/// Generic 500 response.
pub fn internal_error() -> Response {
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "An error occurred",
    )
}

fn from_parts(status: u16, code: &str, message: String) -> Response {
    match StatusCode::from_u16(status) {
        Ok(s) if !s.is_server_error() => error_response(s, code, message),
        _ => {
            error!(code, message = %message, "Request failed");
            internal_error()
        }
    }
}

/// Maps a generic application error.
pub fn app_error_response(e: &AppError) -> Response {
    from_parts(e.status_code(), e.error_code(), e.to_string())
}

/// Maps a workflow error.
pub fn workflow_error_response(e: &WorkflowError) -> Response {
    if let WorkflowError::PreviousStepsPending {
        step,
        blocking_steps,
    } = e
    {
        return (
            StatusCode::CONFLICT,
            Json(json!({
                "error": e.error_code(),
                "message": e.to_string(),
                "step": step,
                "blocking_steps": blocking_steps
            })),
        )
            .into_response();
    }
    from_parts(e.status_code(), e.error_code(), e.to_string())
}

/// Maps a user directory error.
pub fn user_error_response(e: &UserError) -> Response {
    from_parts(e.status_code(), e.error_code(), e.to_string())
}

/// Maps an approval rule error.
pub fn rule_error_response(e: &ApprovalRuleError) -> Response {
    from_parts(e.status_code(), e.error_code(), e.to_string())
}

/// Maps a missing capability.
pub fn access_error_response(e: &AccessError) -> Response {
    error_response(StatusCode::FORBIDDEN, "FORBIDDEN", e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use expensa_core::access::{Capability, UserRole};
    use expensa_shared::types::{ExpenseId, UserId};
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_guard_violation_lists_blocking_steps() {
        let e = WorkflowError::PreviousStepsPending {
            step: 3,
            blocking_steps: vec![1, 2],
        };
        let response = workflow_error_response(&e);
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let body = body_json(response).await;
        assert_eq!(body["error"], "PREVIOUS_STEPS_PENDING");
        assert_eq!(body["blocking_steps"], json!([1, 2]));
    }

    #[tokio::test]
    async fn test_conflict_and_not_found_codes() {
        let already = WorkflowError::AlreadyDecided {
            approver_id: UserId::new(),
            step: 1,
        };
        assert_eq!(
            workflow_error_response(&already).status(),
            StatusCode::CONFLICT
        );

        let missing = WorkflowError::ExpenseNotFound(ExpenseId::new());
        let response = workflow_error_response(&missing);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["error"], "EXPENSE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_database_errors_are_hidden() {
        let e = WorkflowError::Database("connection reset by peer".to_string());
        let response = workflow_error_response(&e);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("peer"));
    }

    #[tokio::test]
    async fn test_validation_error_is_bad_request() {
        let response =
            app_error_response(&AppError::Validation("Username is required".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "VALIDATION_ERROR");
        assert_eq!(body["message"], "Validation error: Username is required");
    }

    #[tokio::test]
    async fn test_access_error_is_forbidden() {
        let e = UserRole::Employee
            .require(Capability::ManageRules)
            .unwrap_err();
        let response = access_error_response(&e);
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_json(response).await["error"], "FORBIDDEN");
    }
}
