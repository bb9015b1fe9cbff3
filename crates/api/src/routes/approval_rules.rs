//! Approval rule management routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    AppState,
    error::{error_response, rule_error_response},
    middleware::CurrentActor,
};
use expensa_core::access::Capability;
use expensa_core::workflow::{RuleDraft, RuleType};
use expensa_db::{ApprovalRuleRepository, UpdateApprovalRuleInput};
use expensa_shared::types::{ApprovalRuleId, OrganizationId, UserId};

/// Creates the approval rules routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/approval-rules",
            get(list_approval_rules).post(create_approval_rule),
        )
        .route(
            "/organizations/{org_id}/approval-rules/{rule_id}",
            get(get_approval_rule).patch(update_approval_rule),
        )
}

// ============================================================================
// Request Types
// ============================================================================

/// Request body for creating an approval rule.
#[derive(Debug, Deserialize)]
pub struct CreateApprovalRuleRequest {
    /// Name of the rule.
    pub name: String,
    /// sequential, percentage, specific, or hybrid.
    pub rule_type: String,
    /// Required approval percentage (1-100).
    pub percentage_threshold: Option<i32>,
    /// Approver whose approval finalizes the expense.
    pub specific_approver_id: Option<UserId>,
    /// Put the submitter's manager in front of the chain.
    #[serde(default)]
    pub is_manager_first: bool,
    /// Lower wins when several rules are active.
    #[serde(default)]
    pub priority: i16,
    /// Approvers in step order.
    #[serde(default)]
    pub approvers: Vec<UserId>,
}

/// Request body for updating an approval rule.
///
/// `percentage_threshold` and `specific_approver_id` accept `null` to clear.
#[derive(Debug, Deserialize)]
pub struct UpdateApprovalRuleRequest {
    /// New name.
    pub name: Option<String>,
    /// New threshold.
    #[serde(default, deserialize_with = "double_option")]
    pub percentage_threshold: Option<Option<i32>>,
    /// New specific approver.
    #[serde(default, deserialize_with = "double_option")]
    pub specific_approver_id: Option<Option<UserId>>,
    /// New manager-first flag.
    pub is_manager_first: Option<bool>,
    /// New priority.
    pub priority: Option<i16>,
    /// Active status.
    pub is_active: Option<bool>,
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ============================================================================
// Route Handlers
// ============================================================================

/// GET `/organizations/{org_id}/approval-rules` - List rules in selection order.
async fn list_approval_rules(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
) -> impl IntoResponse {
    if let Err(response) = actor.require_member(org_id) {
        return response;
    }

    match ApprovalRuleRepository::new((*state.db).clone())
        .list_rules(org_id)
        .await
    {
        Ok(rules) => (StatusCode::OK, Json(json!({ "data": rules }))).into_response(),
        Err(e) => rule_error_response(&e),
    }
}

/// POST `/organizations/{org_id}/approval-rules` - Create a rule.
async fn create_approval_rule(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
    Json(payload): Json<CreateApprovalRuleRequest>,
) -> impl IntoResponse {
    if let Err(response) = actor.require(org_id, Capability::ManageRules) {
        return response;
    }

    let Some(rule_type) = RuleType::parse(&payload.rule_type) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_RULE_TYPE",
            format!("Invalid rule type: {}", payload.rule_type),
        );
    };

    let draft = RuleDraft {
        name: payload.name,
        rule_type,
        percentage_threshold: payload.percentage_threshold,
        specific_approver_id: payload.specific_approver_id,
        is_manager_first: payload.is_manager_first,
        priority: payload.priority,
        approvers: payload.approvers,
    };

    match ApprovalRuleRepository::new((*state.db).clone())
        .create_rule(org_id, draft)
        .await
    {
        Ok(rule) => {
            info!(
                org_id = %org_id,
                rule_id = %rule.id,
                created_by = %actor.id(),
                "Approval rule created via API"
            );
            (StatusCode::CREATED, Json(rule)).into_response()
        }
        Err(e) => rule_error_response(&e),
    }
}

/// GET `/organizations/{org_id}/approval-rules/{rule_id}` - Get a rule.
async fn get_approval_rule(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((org_id, rule_id)): Path<(OrganizationId, ApprovalRuleId)>,
) -> impl IntoResponse {
    if let Err(response) = actor.require_member(org_id) {
        return response;
    }

    match ApprovalRuleRepository::new((*state.db).clone())
        .get_rule(org_id, rule_id)
        .await
    {
        Ok(rule) => (StatusCode::OK, Json(rule)).into_response(),
        Err(e) => rule_error_response(&e),
    }
}

/// PATCH `/organizations/{org_id}/approval-rules/{rule_id}` - Update a rule.
///
/// Expenses already bound to the rule keep their materialized decisions.
async fn update_approval_rule(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((org_id, rule_id)): Path<(OrganizationId, ApprovalRuleId)>,
    Json(payload): Json<UpdateApprovalRuleRequest>,
) -> impl IntoResponse {
    if let Err(response) = actor.require(org_id, Capability::ManageRules) {
        return response;
    }

    let input = UpdateApprovalRuleInput {
        name: payload.name,
        percentage_threshold: payload.percentage_threshold,
        specific_approver_id: payload.specific_approver_id,
        is_manager_first: payload.is_manager_first,
        priority: payload.priority,
        is_active: payload.is_active,
    };

    match ApprovalRuleRepository::new((*state.db).clone())
        .update_rule(org_id, rule_id, input)
        .await
    {
        Ok(rule) => {
            info!(org_id = %org_id, rule_id = %rule_id, "Approval rule updated");
            (StatusCode::OK, Json(rule)).into_response()
        }
        Err(e) => rule_error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let cleared: UpdateApprovalRuleRequest =
            serde_json::from_str(r#"{"percentage_threshold": null}"#).unwrap();
        assert_eq!(cleared.percentage_threshold, Some(None));
        assert_eq!(cleared.specific_approver_id, None);

        let set: UpdateApprovalRuleRequest =
            serde_json::from_str(r#"{"percentage_threshold": 60, "is_active": false}"#).unwrap();
        assert_eq!(set.percentage_threshold, Some(Some(60)));
        assert_eq!(set.is_active, Some(false));
    }

    #[test]
    fn test_create_request_defaults() {
        let request: CreateApprovalRuleRequest =
            serde_json::from_str(r#"{"name": "Default", "rule_type": "percentage"}"#).unwrap();
        assert!(!request.is_manager_first);
        assert_eq!(request.priority, 0);
        assert!(request.approvers.is_empty());
    }
}
