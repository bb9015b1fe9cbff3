//! Approver routes: pending queue and decisions.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;

use crate::{
    AppState,
    error::{error_response, workflow_error_response},
    middleware::CurrentActor,
};
use expensa_core::access::Capability;
use expensa_core::workflow::DecisionAction;
use expensa_db::WorkflowRepository;
use expensa_shared::types::{ExpenseId, OrganizationId};

/// Creates the approval routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/approvals/pending",
            get(list_pending),
        )
        .route(
            "/organizations/{org_id}/expenses/{expense_id}/decisions",
            post(record_decision),
        )
}

/// Request body for recording a decision.
#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    /// approve or reject.
    pub action: String,
    /// Optional comment kept on the decision.
    pub comment: Option<String>,
}

/// GET `/organizations/{org_id}/approvals/pending` - Decisions waiting on the actor.
///
/// Each entry carries `actionable`, false while earlier sequential steps
/// are still open.
async fn list_pending(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
) -> impl IntoResponse {
    if let Err(response) = actor.require(org_id, Capability::DecideApprovals) {
        return response;
    }

    match WorkflowRepository::new((*state.db).clone())
        .pending_for_approver(org_id, actor.id())
        .await
    {
        Ok(pending) => (StatusCode::OK, Json(json!({ "data": pending }))).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// POST `/organizations/{org_id}/expenses/{expense_id}/decisions` - Approve or reject.
async fn record_decision(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((org_id, expense_id)): Path<(OrganizationId, ExpenseId)>,
    Json(payload): Json<DecisionRequest>,
) -> impl IntoResponse {
    if let Err(response) = actor.require(org_id, Capability::DecideApprovals) {
        return response;
    }

    let Some(action) = DecisionAction::parse(&payload.action) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_ACTION",
            format!("Invalid action: {}", payload.action),
        );
    };

    let comment = payload
        .comment
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty());

    match WorkflowRepository::new((*state.db).clone())
        .record_decision(org_id, expense_id, actor.id(), action, comment)
        .await
    {
        Ok(recorded) => (StatusCode::OK, Json(recorded)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, middleware::from_fn_with_state};
    use expensa_core::currency::RateTableConverter;
    use sea_orm::DatabaseConnection;
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::middleware::actor_middleware;

    fn app() -> Router {
        let state = AppState {
            db: Arc::new(DatabaseConnection::Disconnected),
            converter: Arc::new(RateTableConverter::default()),
        };
        Router::new()
            .merge(routes())
            .layer(from_fn_with_state(state.clone(), actor_middleware))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_decision_without_actor_is_unauthorized() {
        let uri = format!(
            "/organizations/{}/expenses/{}/decisions",
            OrganizationId::new(),
            ExpenseId::new()
        );
        let response = app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(uri)
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"action":"approve"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_pending_without_actor_is_unauthorized() {
        let uri = format!("/organizations/{}/approvals/pending", OrganizationId::new());
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_decision_request_comment_is_optional() {
        let request: DecisionRequest = serde_json::from_str(r#"{"action":"reject"}"#).unwrap();
        assert_eq!(DecisionAction::parse(&request.action), Some(DecisionAction::Reject));
        assert!(request.comment.is_none());
    }
}
