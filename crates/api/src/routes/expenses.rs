//! Expense routes: submission, scoped listing and detail.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::str::FromStr;
use tracing::{error, info, warn};

use crate::{
    AppState,
    error::{app_error_response, error_response, internal_error, workflow_error_response},
    middleware::CurrentActor,
    routes::organizations::is_currency_code,
};
use expensa_core::access::{Capability, UserRole};
use expensa_core::currency::resolve_company_amount;
use expensa_core::workflow::{Actor, ExpenseCategory, NewExpense};
use expensa_db::{
    ExpenseDetail, ExpenseRepository, ExpenseScope, OrganizationRepository, UserRepository,
    WorkflowRepository,
};
use expensa_shared::AppError;
use expensa_shared::types::{ExpenseId, OrganizationId, PageRequest};

/// Creates the expense routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/organizations/{org_id}/expenses",
            get(list_expenses).post(submit_expense),
        )
        .route(
            "/organizations/{org_id}/expenses/{expense_id}",
            get(get_expense),
        )
}

/// Request body for submitting an expense.
#[derive(Debug, Deserialize)]
pub struct SubmitExpenseRequest {
    /// Claimed amount as a decimal string.
    pub amount: String,
    /// Currency of the claim (ISO 4217).
    pub currency: String,
    /// Expense category.
    pub category: String,
    /// What the expense was for.
    pub description: String,
    /// Where the money was spent.
    #[serde(default)]
    pub merchant_name: String,
    /// When the money was spent.
    pub expense_date: NaiveDate,
}

/// Visibility scope implied by the actor's role.
pub(crate) fn scope_for(actor: &Actor) -> ExpenseScope {
    if actor.role.can(Capability::ViewAllExpenses) {
        ExpenseScope::All
    } else if actor.role.can(Capability::ViewTeamExpenses) {
        ExpenseScope::Team(actor.id)
    } else {
        ExpenseScope::Own(actor.id)
    }
}

/// Whether `actor` may read `detail`. `is_report` tells if the owner
/// reports directly to the actor.
pub(crate) fn can_view(actor: &Actor, detail: &ExpenseDetail, is_report: bool) -> bool {
    actor.role == UserRole::Admin
        || detail.expense.employee_id == actor.id
        || (is_report && actor.role.can(Capability::ViewTeamExpenses))
        || detail.decisions.iter().any(|d| d.approver_id == actor.id)
}

/// Largest claim `expenses.amount` holds: ten digits, two of them decimals.
const MAX_AMOUNT: Decimal = Decimal::from_parts(1_410_065_407, 2, 0, false, 2);

#[allow(clippy::result_large_err)]
fn parse_amount(s: &str) -> Result<Decimal, Response> {
    let invalid = |message: &str| {
        Err(error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_AMOUNT",
            message.to_string(),
        ))
    };
    let Ok(amount) = Decimal::from_str(s.trim()) else {
        return invalid("Invalid amount format");
    };
    if amount <= Decimal::ZERO {
        return invalid("Amount must be positive");
    }
    if amount.normalize().scale() > 2 {
        return invalid("Amount has more than two decimal places");
    }
    if amount > MAX_AMOUNT {
        return invalid("Amount exceeds 99999999.99");
    }
    Ok(amount)
}

/// POST /organizations/{org_id}/expenses - Submit an expense.
///
/// Converts the amount into the company currency and starts the approval
/// workflow in the same request.
async fn submit_expense(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
    Json(payload): Json<SubmitExpenseRequest>,
) -> impl IntoResponse {
    if let Err(response) = actor.require(org_id, Capability::SubmitExpense) {
        return response;
    }

    let amount = match parse_amount(&payload.amount) {
        Ok(a) => a,
        Err(response) => return response,
    };
    if !is_currency_code(&payload.currency) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CURRENCY",
            "Currency must be a three-letter ISO 4217 code",
        );
    }
    let Some(category) = ExpenseCategory::parse(&payload.category) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CATEGORY",
            format!("Invalid category: {}", payload.category),
        );
    };
    if payload.description.trim().is_empty() {
        return app_error_response(&AppError::Validation(
            "Description is required".to_string(),
        ));
    }

    let org = match OrganizationRepository::new((*state.db).clone())
        .find_by_id(org_id)
        .await
    {
        Ok(Some(org)) => org,
        Ok(None) => {
            return error_response(
                StatusCode::NOT_FOUND,
                "ORGANIZATION_NOT_FOUND",
                "Organization not found",
            );
        }
        Err(e) => {
            error!(error = %e, "Failed to load organization");
            return internal_error();
        }
    };

    let converted =
        resolve_company_amount(&*state.converter, amount, &payload.currency, &org.currency);
    if converted.degraded {
        warn!(
            org_id = %org_id,
            from = %payload.currency,
            to = %org.currency,
            "No exchange rate, storing claimed amount unconverted"
        );
    }

    let input = NewExpense {
        organization_id: org_id,
        employee_id: actor.id(),
        amount,
        currency: payload.currency,
        category,
        description: payload.description.trim().to_string(),
        merchant_name: payload.merchant_name.trim().to_string(),
        expense_date: payload.expense_date,
    };

    match WorkflowRepository::new((*state.db).clone())
        .submit_expense(input, converted.amount, actor.0.manager_id)
        .await
    {
        Ok(submitted) => (StatusCode::CREATED, Json(submitted)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// GET /organizations/{org_id}/expenses - List expenses visible to the actor.
async fn list_expenses(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
    Query(page): Query<PageRequest>,
) -> impl IntoResponse {
    if let Err(response) = actor.require_member(org_id) {
        return response;
    }

    match ExpenseRepository::new((*state.db).clone())
        .list(org_id, scope_for(&actor.0), &page)
        .await
    {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(e) => workflow_error_response(&e),
    }
}

/// GET /organizations/{org_id}/expenses/{expense_id} - Expense with decisions and history.
async fn get_expense(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path((org_id, expense_id)): Path<(OrganizationId, ExpenseId)>,
) -> impl IntoResponse {
    if let Err(response) = actor.require_member(org_id) {
        return response;
    }

    let detail = match ExpenseRepository::new((*state.db).clone())
        .get_detail(org_id, expense_id)
        .await
    {
        Ok(detail) => detail,
        Err(e) => return workflow_error_response(&e),
    };

    let is_report = if actor.0.role.can(Capability::ViewTeamExpenses) {
        match UserRepository::new((*state.db).clone())
            .team_member_ids(actor.id())
            .await
        {
            Ok(ids) => ids.contains(&detail.expense.employee_id),
            Err(e) => {
                error!(error = %e, "Failed to load team");
                return internal_error();
            }
        }
    } else {
        false
    };

    if !can_view(&actor.0, &detail, is_report) {
        // Same answer as a missing expense.
        return error_response(
            StatusCode::NOT_FOUND,
            "EXPENSE_NOT_FOUND",
            format!("Expense {expense_id} not found"),
        );
    }

    info!(expense_id = %expense_id, viewer = %actor.id(), "Expense viewed");
    (StatusCode::OK, Json(detail)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use expensa_core::workflow::{ApprovalDecision, Expense};
    use expensa_shared::types::UserId;
    use rstest::rstest;

    fn actor(role: UserRole) -> Actor {
        Actor {
            id: UserId::new(),
            organization_id: Some(OrganizationId::new()),
            username: "bob".to_string(),
            email: "bob@example.com".to_string(),
            role,
            manager_id: None,
        }
    }

    fn detail(owner: UserId, approvers: &[UserId]) -> ExpenseDetail {
        let expense = Expense::submit(
            NewExpense {
                organization_id: OrganizationId::new(),
                employee_id: owner,
                amount: Decimal::ONE_HUNDRED,
                currency: "EUR".to_string(),
                category: ExpenseCategory::Office,
                description: "Chair".to_string(),
                merchant_name: String::new(),
                expense_date: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
            },
            Decimal::ONE_HUNDRED,
            Utc::now(),
        );
        let decisions = approvers
            .iter()
            .zip(1..)
            .map(|(a, step)| ApprovalDecision::pending(expense.id, *a, step))
            .collect();
        ExpenseDetail {
            expense,
            decisions,
            transitions: Vec::new(),
        }
    }

    #[test]
    fn test_scope_follows_role() {
        let admin = actor(UserRole::Admin);
        let manager = actor(UserRole::Manager);
        let employee = actor(UserRole::Employee);

        assert_eq!(scope_for(&admin), ExpenseScope::All);
        assert_eq!(scope_for(&manager), ExpenseScope::Team(manager.id));
        assert_eq!(scope_for(&employee), ExpenseScope::Own(employee.id));
    }

    #[test]
    fn test_visibility() {
        let employee = actor(UserRole::Employee);
        let other = actor(UserRole::Employee);
        let manager = actor(UserRole::Manager);
        let approver = actor(UserRole::Manager);
        let admin = actor(UserRole::Admin);
        let d = detail(employee.id, &[approver.id]);

        assert!(can_view(&employee, &d, false));
        assert!(!can_view(&other, &d, false));
        assert!(can_view(&manager, &d, true));
        assert!(!can_view(&manager, &d, false));
        assert!(can_view(&approver, &d, false));
        assert!(can_view(&admin, &d, false));
        // An employee listed as a report still needs the team capability.
        assert!(!can_view(&other, &d, true));
    }

    #[rstest]
    #[case("12.50", true)]
    #[case(" 3 ", true)]
    #[case("0", false)]
    #[case("-4.00", false)]
    #[case("ten", false)]
    #[case("1.234", false)]
    #[case("1.2300", true)]
    #[case("99999999.99", true)]
    #[case("100000000.00", false)]
    #[case("79228162514264337593543950335", false)]
    fn test_parse_amount(#[case] input: &str, #[case] ok: bool) {
        assert_eq!(parse_amount(input).is_ok(), ok);
    }

    #[test]
    fn test_max_amount_is_column_limit() {
        assert_eq!(MAX_AMOUNT, Decimal::from_str("99999999.99").unwrap());
    }
}
