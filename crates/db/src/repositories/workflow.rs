//! Workflow repository: persists submissions and approver decisions.
//!
//! Both operations run in one database transaction each. Recording a decision
//! locks the expense row first, so concurrent decisions on the same expense
//! are applied one after the other.

use std::collections::HashMap;

use chrono::Utc;
use expensa_core::workflow::{
    ApprovalDecision, DecisionAction, DecisionStatus, Expense, ExpenseStatus, NewExpense,
    SequentialGuard, StatusTransition, WorkflowError, WorkflowService,
};
use expensa_shared::types::{ApprovalRuleId, ExpenseId, OrganizationId, UserId};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use serde::Serialize;
use uuid::Uuid;

use crate::entities::{expense_approvals, expenses};

use super::approval_rule::{load_rule, load_rules, load_rules_by_id};
use super::convert::{
    decision_from_model, decision_status_to_db, decision_to_active, expense_from_model,
    expense_status_to_db, expense_to_active, transition_to_active,
};

/// A submitted expense with the workflow it started.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedExpense {
    /// The expense after initiation.
    pub expense: Expense,
    /// Pending decisions in step order.
    pub decisions: Vec<ApprovalDecision>,
    /// Status change, when the expense was approved right away.
    pub transition: Option<StatusTransition>,
}

/// A recorded decision with the expense state that resulted.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedDecision {
    /// The expense after the decision.
    pub expense: Expense,
    /// The updated decision.
    pub decision: ApprovalDecision,
    /// Status change, when the decision finalized the expense.
    pub transition: Option<StatusTransition>,
}

/// A decision waiting for an approver.
#[derive(Debug, Clone, Serialize)]
pub struct PendingApproval {
    /// The expense under review.
    pub expense: Expense,
    /// The approver's pending decision.
    pub decision: ApprovalDecision,
    /// False while earlier steps of a sequential rule are still open.
    pub actionable: bool,
}

/// Workflow repository for expense approval.
#[derive(Debug, Clone)]
pub struct WorkflowRepository {
    db: DatabaseConnection,
}

impl WorkflowRepository {
    /// Creates a new workflow repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persists a new expense and starts its approval workflow.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Database` if a write fails. Nothing is kept in
    /// that case.
    pub async fn submit_expense(
        &self,
        input: NewExpense,
        amount_in_company_currency: Decimal,
        owner_manager_id: Option<UserId>,
    ) -> Result<SubmittedExpense, WorkflowError> {
        let now = Utc::now();
        let mut expense = Expense::submit(input, amount_in_company_currency, now);

        let txn = self.db.begin().await.map_err(db_err)?;

        expense_to_active(&expense)
            .insert(&txn)
            .await
            .map_err(db_err)?;

        let rules = load_rules(&txn, expense.organization_id, true)
            .await
            .map_err(db_err)?;
        let initiation =
            WorkflowService::initiate_workflow(&mut expense, &rules, owner_manager_id, now)?;

        save_expense_state(&txn, &expense).await?;

        for decision in &initiation.decisions {
            decision_to_active(decision, now)
                .insert(&txn)
                .await
                .map_err(|e| conflict_or_db(e, WorkflowError::AlreadyInitiated(expense.id)))?;
        }

        if let Some(transition) = &initiation.transition {
            transition_to_active(transition)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            expense_id = %expense.id,
            employee_id = %expense.employee_id,
            status = %expense.status,
            approval_rule_id = ?expense.approval_rule_id,
            decisions = initiation.decisions.len(),
            "Expense submitted"
        );

        Ok(SubmittedExpense {
            expense,
            decisions: initiation.decisions,
            transition: initiation.transition,
        })
    }

    /// Records an approver's decision on an expense.
    ///
    /// # Errors
    ///
    /// Returns `ExpenseNotFound`, the engine's workflow errors
    /// (`ExpenseFinalized`, `PreviousStepsPending`, `AlreadyDecided`,
    /// `NoPendingDecision`), or `Database`.
    pub async fn record_decision(
        &self,
        organization_id: OrganizationId,
        expense_id: ExpenseId,
        approver_id: UserId,
        action: DecisionAction,
        comment: Option<String>,
    ) -> Result<RecordedDecision, WorkflowError> {
        let txn = self.db.begin().await.map_err(db_err)?;

        let model = expenses::Entity::find_by_id(Uuid::from(expense_id))
            .filter(expenses::Column::OrganizationId.eq(Uuid::from(organization_id)))
            .lock_exclusive()
            .one(&txn)
            .await
            .map_err(db_err)?
            .ok_or(WorkflowError::ExpenseNotFound(expense_id))?;
        let mut expense = expense_from_model(model);

        let rule = match expense.approval_rule_id {
            Some(rule_id) => load_rule(&txn, rule_id).await.map_err(db_err)?,
            None => None,
        };

        let mut decisions = load_decisions(&txn, expense_id).await?;

        let now = Utc::now();
        let outcome = WorkflowService::record_decision(
            &mut expense,
            rule.as_ref(),
            &mut decisions,
            approver_id,
            action,
            comment,
            now,
        )?;

        let decision = &outcome.decision;
        expense_approvals::ActiveModel {
            id: Set(decision.id.into()),
            status: Set(decision_status_to_db(decision.status)),
            comment: Set(decision.comment.clone()),
            decided_at: Set(decision.decided_at.map(Into::into)),
            ..Default::default()
        }
        .update(&txn)
        .await
        .map_err(|e| {
            conflict_or_db(
                e,
                WorkflowError::AlreadyDecided {
                    approver_id,
                    step: decision.step_number,
                },
            )
        })?;

        save_expense_state(&txn, &expense).await?;

        if let Some(transition) = &outcome.transition {
            transition_to_active(transition)
                .insert(&txn)
                .await
                .map_err(db_err)?;
        }

        txn.commit().await.map_err(db_err)?;

        tracing::info!(
            expense_id = %expense.id,
            approver_id = %approver_id,
            action = %action.as_str(),
            step = decision.step_number,
            status = %expense.status,
            "Approval decision recorded"
        );

        Ok(RecordedDecision {
            expense,
            decision: outcome.decision,
            transition: outcome.transition,
        })
    }

    /// Lists pending decisions assigned to `approver_id` on pending expenses.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Database` if a query fails.
    pub async fn pending_for_approver(
        &self,
        organization_id: OrganizationId,
        approver_id: UserId,
    ) -> Result<Vec<PendingApproval>, WorkflowError> {
        let rows = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ApproverId.eq(Uuid::from(approver_id)))
            .filter(
                expense_approvals::Column::Status
                    .eq(decision_status_to_db(DecisionStatus::Pending)),
            )
            .find_also_related(expenses::Entity)
            .filter(expenses::Column::OrganizationId.eq(Uuid::from(organization_id)))
            .filter(expenses::Column::Status.eq(expense_status_to_db(ExpenseStatus::Pending)))
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expense_approvals::Column::StepNumber)
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let rows: Vec<_> = rows
            .into_iter()
            .filter_map(|(decision, expense)| {
                expense.map(|e| (expense_from_model(e), decision_from_model(decision)))
            })
            .collect();
        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut rule_ids: Vec<ApprovalRuleId> =
            rows.iter().filter_map(|(e, _)| e.approval_rule_id).collect();
        rule_ids.sort_unstable();
        rule_ids.dedup();
        let rules = load_rules_by_id(&self.db, &rule_ids).await.map_err(db_err)?;

        let expense_ids = rows.iter().map(|(e, _)| Uuid::from(e.id));
        let all_decisions = expense_approvals::Entity::find()
            .filter(expense_approvals::Column::ExpenseId.is_in(expense_ids))
            .order_by_asc(expense_approvals::Column::StepNumber)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        let by_expense = group_by_expense(all_decisions.into_iter().map(decision_from_model));

        Ok(rows
            .into_iter()
            .map(|(expense, decision)| {
                let rule = expense.approval_rule_id.and_then(|id| rules.get(&id));
                let siblings = by_expense.get(&expense.id).map_or(&[][..], Vec::as_slice);
                let actionable =
                    SequentialGuard::check(rule, siblings, decision.step_number).is_ok();
                PendingApproval {
                    expense,
                    decision,
                    actionable,
                }
            })
            .collect())
    }
}

/// Groups decisions by expense, keeping their input order.
fn group_by_expense(
    decisions: impl IntoIterator<Item = ApprovalDecision>,
) -> HashMap<ExpenseId, Vec<ApprovalDecision>> {
    let mut grouped: HashMap<ExpenseId, Vec<ApprovalDecision>> = HashMap::new();
    for decision in decisions {
        grouped.entry(decision.expense_id).or_default().push(decision);
    }
    grouped
}

async fn load_decisions<C: ConnectionTrait>(
    conn: &C,
    expense_id: ExpenseId,
) -> Result<Vec<ApprovalDecision>, WorkflowError> {
    let rows = expense_approvals::Entity::find()
        .filter(expense_approvals::Column::ExpenseId.eq(Uuid::from(expense_id)))
        .order_by_asc(expense_approvals::Column::StepNumber)
        .all(conn)
        .await
        .map_err(db_err)?;

    Ok(rows.into_iter().map(decision_from_model).collect())
}

async fn save_expense_state<C: ConnectionTrait>(
    conn: &C,
    expense: &Expense,
) -> Result<(), WorkflowError> {
    expenses::ActiveModel {
        id: Set(expense.id.into()),
        status: Set(expense_status_to_db(expense.status)),
        approval_rule_id: Set(expense.approval_rule_id.map(Uuid::from)),
        current_step: Set(expense.current_step),
        updated_at: Set(expense.updated_at.into()),
        ..Default::default()
    }
    .update(conn)
    .await
    .map_err(db_err)?;
    Ok(())
}

fn db_err(e: DbErr) -> WorkflowError {
    WorkflowError::Database(e.to_string())
}

/// Maps a unique violation to `conflict`, anything else to `Database`.
fn conflict_or_db(e: DbErr, conflict: WorkflowError) -> WorkflowError {
    match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => conflict,
        _ => db_err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_by_expense_keeps_step_order() {
        let first = ExpenseId::new();
        let second = ExpenseId::new();
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());

        let grouped = group_by_expense(vec![
            ApprovalDecision::pending(first, a, 1),
            ApprovalDecision::pending(second, c, 1),
            ApprovalDecision::pending(first, b, 2),
        ]);

        assert_eq!(grouped.len(), 2);
        let steps: Vec<_> = grouped[&first]
            .iter()
            .map(|d| (d.approver_id, d.step_number))
            .collect();
        assert_eq!(steps, vec![(a, 1), (b, 2)]);
        assert_eq!(grouped[&second].len(), 1);
    }

    #[test]
    fn test_group_by_expense_empty() {
        assert!(group_by_expense(Vec::new()).is_empty());
    }
}
