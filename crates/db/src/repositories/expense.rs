//! Expense queries: scoped listings and expense detail.

use expensa_core::workflow::{ApprovalDecision, Expense, StatusTransition, WorkflowError};
use expensa_shared::types::{ExpenseId, OrganizationId, PageRequest, PageResponse, UserId};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{expense_approvals, expense_status_transitions, expenses, users};

use super::convert::{decision_from_model, expense_from_model, transition_from_model};

/// Which expenses an actor may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpenseScope {
    /// Only the actor's own expenses.
    Own(UserId),
    /// The actor's own expenses and those of their direct reports.
    Team(UserId),
    /// Every expense of the organization.
    All,
}

/// An expense with its decisions and status history.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseDetail {
    /// The expense.
    pub expense: Expense,
    /// Decisions in step order.
    pub decisions: Vec<ApprovalDecision>,
    /// Status history, oldest first.
    pub transitions: Vec<StatusTransition>,
}

/// Repository for reading expenses.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists expenses visible under `scope`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Database` if a query fails.
    pub async fn list(
        &self,
        organization_id: OrganizationId,
        scope: ExpenseScope,
        page: &PageRequest,
    ) -> Result<PageResponse<Expense>, WorkflowError> {
        let page = page.normalized();
        let mut query = expenses::Entity::find()
            .filter(expenses::Column::OrganizationId.eq(Uuid::from(organization_id)));

        match scope {
            ExpenseScope::Own(user_id) => {
                query = query.filter(expenses::Column::EmployeeId.eq(Uuid::from(user_id)));
            }
            ExpenseScope::Team(manager_id) => {
                let mut employee_ids: Vec<Uuid> = users::Entity::find()
                    .filter(users::Column::ManagerId.eq(Uuid::from(manager_id)))
                    .all(&self.db)
                    .await
                    .map_err(|e| WorkflowError::Database(e.to_string()))?
                    .into_iter()
                    .map(|u| u.id)
                    .collect();
                employee_ids.push(Uuid::from(manager_id));
                query = query.filter(expenses::Column::EmployeeId.is_in(employee_ids));
            }
            ExpenseScope::All => {}
        }

        let total = query
            .clone()
            .count(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let rows = query
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(PageResponse::new(
            rows.into_iter().map(expense_from_model).collect(),
            page.page,
            page.per_page,
            total,
        ))
    }

    /// Gets an expense with its decisions and history.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound` if the expense does not exist in the organization.
    pub async fn get_detail(
        &self,
        organization_id: OrganizationId,
        expense_id: ExpenseId,
    ) -> Result<ExpenseDetail, WorkflowError> {
        let expense = expenses::Entity::find_by_id(Uuid::from(expense_id))
            .filter(expenses::Column::OrganizationId.eq(Uuid::from(organization_id)))
            .one(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))?;

        let decisions = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.eq(expense.id))
            .order_by_asc(expense_approvals::Column::StepNumber)
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        let transitions = expense_status_transitions::Entity::find()
            .filter(expense_status_transitions::Column::ExpenseId.eq(expense.id))
            .order_by_asc(expense_status_transitions::Column::OccurredAt)
            .all(&self.db)
            .await
            .map_err(|e| WorkflowError::Database(e.to_string()))?;

        Ok(ExpenseDetail {
            expense: expense_from_model(expense),
            decisions: decisions.into_iter().map(decision_from_model).collect(),
            transitions: transitions.into_iter().map(transition_from_model).collect(),
        })
    }
}
