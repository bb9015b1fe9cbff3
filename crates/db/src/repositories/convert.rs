//! Conversions between database models and domain types.

use chrono::{DateTime, FixedOffset, Utc};
use expensa_core::access::UserRole as CoreRole;
use expensa_core::workflow::{
    Actor, ApprovalDecision, ApprovalRule, ApprovalStep, DecisionStatus, Expense,
    ExpenseCategory as CoreCategory, ExpenseStatus as CoreExpenseStatus, RuleType,
    StatusTransition, TransitionCause as CoreCause,
};
use expensa_shared::types::{
    ApprovalRuleId, ApprovalStepId, DecisionId, ExpenseId, OrganizationId, TransitionId, UserId,
};
use sea_orm::Set;

use crate::entities::{
    approval_rules, approval_steps, expense_approvals, expense_status_transitions, expenses,
    sea_orm_active_enums::{
        ApprovalRuleType, ApprovalStatus, ExpenseCategory, ExpenseStatus, TransitionCause,
        UserRole,
    },
    users,
};

pub(crate) fn to_utc(ts: DateTime<FixedOffset>) -> DateTime<Utc> {
    ts.with_timezone(&Utc)
}

pub(crate) fn role_to_core(role: UserRole) -> CoreRole {
    match role {
        UserRole::Admin => CoreRole::Admin,
        UserRole::Manager => CoreRole::Manager,
        UserRole::Employee => CoreRole::Employee,
    }
}

pub(crate) fn role_to_db(role: CoreRole) -> UserRole {
    match role {
        CoreRole::Admin => UserRole::Admin,
        CoreRole::Manager => UserRole::Manager,
        CoreRole::Employee => UserRole::Employee,
    }
}

pub(crate) fn rule_type_to_core(rule_type: ApprovalRuleType) -> RuleType {
    match rule_type {
        ApprovalRuleType::Sequential => RuleType::Sequential,
        ApprovalRuleType::Percentage => RuleType::Percentage,
        ApprovalRuleType::Specific => RuleType::Specific,
        ApprovalRuleType::Hybrid => RuleType::Hybrid,
    }
}

pub(crate) fn rule_type_to_db(rule_type: RuleType) -> ApprovalRuleType {
    match rule_type {
        RuleType::Sequential => ApprovalRuleType::Sequential,
        RuleType::Percentage => ApprovalRuleType::Percentage,
        RuleType::Specific => ApprovalRuleType::Specific,
        RuleType::Hybrid => ApprovalRuleType::Hybrid,
    }
}

pub(crate) fn expense_status_to_core(status: ExpenseStatus) -> CoreExpenseStatus {
    match status {
        ExpenseStatus::Pending => CoreExpenseStatus::Pending,
        ExpenseStatus::Approved => CoreExpenseStatus::Approved,
        ExpenseStatus::Rejected => CoreExpenseStatus::Rejected,
    }
}

pub(crate) fn expense_status_to_db(status: CoreExpenseStatus) -> ExpenseStatus {
    match status {
        CoreExpenseStatus::Pending => ExpenseStatus::Pending,
        CoreExpenseStatus::Approved => ExpenseStatus::Approved,
        CoreExpenseStatus::Rejected => ExpenseStatus::Rejected,
    }
}

pub(crate) fn decision_status_to_core(status: ApprovalStatus) -> DecisionStatus {
    match status {
        ApprovalStatus::Pending => DecisionStatus::Pending,
        ApprovalStatus::Approved => DecisionStatus::Approved,
        ApprovalStatus::Rejected => DecisionStatus::Rejected,
    }
}

pub(crate) fn decision_status_to_db(status: DecisionStatus) -> ApprovalStatus {
    match status {
        DecisionStatus::Pending => ApprovalStatus::Pending,
        DecisionStatus::Approved => ApprovalStatus::Approved,
        DecisionStatus::Rejected => ApprovalStatus::Rejected,
    }
}

pub(crate) fn category_to_core(category: ExpenseCategory) -> CoreCategory {
    match category {
        ExpenseCategory::Travel => CoreCategory::Travel,
        ExpenseCategory::Food => CoreCategory::Food,
        ExpenseCategory::Office => CoreCategory::Office,
        ExpenseCategory::Transport => CoreCategory::Transport,
        ExpenseCategory::Accommodation => CoreCategory::Accommodation,
        ExpenseCategory::Entertainment => CoreCategory::Entertainment,
        ExpenseCategory::Other => CoreCategory::Other,
    }
}

pub(crate) fn category_to_db(category: CoreCategory) -> ExpenseCategory {
    match category {
        CoreCategory::Travel => ExpenseCategory::Travel,
        CoreCategory::Food => ExpenseCategory::Food,
        CoreCategory::Office => ExpenseCategory::Office,
        CoreCategory::Transport => ExpenseCategory::Transport,
        CoreCategory::Accommodation => ExpenseCategory::Accommodation,
        CoreCategory::Entertainment => ExpenseCategory::Entertainment,
        CoreCategory::Other => ExpenseCategory::Other,
    }
}

pub(crate) fn cause_to_core(cause: TransitionCause) -> CoreCause {
    match cause {
        TransitionCause::AutoApprovedNoRule => CoreCause::AutoApprovedNoRule,
        TransitionCause::AutoApprovedNoApprovers => CoreCause::AutoApprovedNoApprovers,
        TransitionCause::Evaluated => CoreCause::Evaluated,
        TransitionCause::DirectReject => CoreCause::DirectReject,
    }
}

pub(crate) fn cause_to_db(cause: CoreCause) -> TransitionCause {
    match cause {
        CoreCause::AutoApprovedNoRule => TransitionCause::AutoApprovedNoRule,
        CoreCause::AutoApprovedNoApprovers => TransitionCause::AutoApprovedNoApprovers,
        CoreCause::Evaluated => TransitionCause::Evaluated,
        CoreCause::DirectReject => TransitionCause::DirectReject,
    }
}

pub(crate) fn actor_from_model(user: users::Model) -> Actor {
    Actor {
        id: UserId::from(user.id),
        organization_id: user.organization_id.map(OrganizationId::from),
        username: user.username,
        email: user.email,
        role: role_to_core(user.role),
        manager_id: user.manager_id.map(UserId::from),
    }
}

pub(crate) fn rule_from_models(
    rule: approval_rules::Model,
    steps: Vec<approval_steps::Model>,
) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::from(rule.id),
        organization_id: OrganizationId::from(rule.organization_id),
        name: rule.name,
        rule_type: rule_type_to_core(rule.rule_type),
        percentage_threshold: rule.percentage_threshold,
        specific_approver_id: rule.specific_approver_id.map(UserId::from),
        is_manager_first: rule.is_manager_first,
        is_active: rule.is_active,
        priority: rule.priority,
        created_at: to_utc(rule.created_at),
        steps: steps
            .into_iter()
            .map(|s| ApprovalStep {
                id: ApprovalStepId::from(s.id),
                approver_id: UserId::from(s.approver_id),
                sequence: s.sequence,
            })
            .collect(),
    }
}

pub(crate) fn expense_from_model(model: expenses::Model) -> Expense {
    Expense {
        id: ExpenseId::from(model.id),
        organization_id: OrganizationId::from(model.organization_id),
        employee_id: UserId::from(model.employee_id),
        amount: model.amount,
        currency: model.currency,
        amount_in_company_currency: model.amount_in_company_currency,
        category: category_to_core(model.category),
        description: model.description,
        merchant_name: model.merchant_name,
        expense_date: model.expense_date,
        status: expense_status_to_core(model.status),
        approval_rule_id: model.approval_rule_id.map(ApprovalRuleId::from),
        current_step: model.current_step,
        created_at: to_utc(model.created_at),
        updated_at: to_utc(model.updated_at),
    }
}

pub(crate) fn expense_to_active(expense: &Expense) -> expenses::ActiveModel {
    expenses::ActiveModel {
        id: Set(expense.id.into()),
        organization_id: Set(expense.organization_id.into()),
        employee_id: Set(expense.employee_id.into()),
        amount: Set(expense.amount),
        currency: Set(expense.currency.clone()),
        amount_in_company_currency: Set(expense.amount_in_company_currency),
        category: Set(category_to_db(expense.category)),
        description: Set(expense.description.clone()),
        merchant_name: Set(expense.merchant_name.clone()),
        expense_date: Set(expense.expense_date),
        status: Set(expense_status_to_db(expense.status)),
        approval_rule_id: Set(expense.approval_rule_id.map(Into::into)),
        current_step: Set(expense.current_step),
        created_at: Set(expense.created_at.into()),
        updated_at: Set(expense.updated_at.into()),
    }
}

pub(crate) fn decision_from_model(model: expense_approvals::Model) -> ApprovalDecision {
    ApprovalDecision {
        id: DecisionId::from(model.id),
        expense_id: ExpenseId::from(model.expense_id),
        approver_id: UserId::from(model.approver_id),
        status: decision_status_to_core(model.status),
        comment: model.comment,
        step_number: model.step_number,
        decided_at: model.decided_at.map(to_utc),
    }
}

pub(crate) fn decision_to_active(
    decision: &ApprovalDecision,
    created_at: DateTime<Utc>,
) -> expense_approvals::ActiveModel {
    expense_approvals::ActiveModel {
        id: Set(decision.id.into()),
        expense_id: Set(decision.expense_id.into()),
        approver_id: Set(decision.approver_id.into()),
        status: Set(decision_status_to_db(decision.status)),
        comment: Set(decision.comment.clone()),
        step_number: Set(decision.step_number),
        decided_at: Set(decision.decided_at.map(Into::into)),
        created_at: Set(created_at.into()),
    }
}

pub(crate) fn transition_from_model(model: expense_status_transitions::Model) -> StatusTransition {
    StatusTransition {
        id: TransitionId::from(model.id),
        expense_id: ExpenseId::from(model.expense_id),
        from_status: expense_status_to_core(model.from_status),
        to_status: expense_status_to_core(model.to_status),
        cause: cause_to_core(model.cause),
        actor_id: model.actor_id.map(UserId::from),
        occurred_at: to_utc(model.occurred_at),
    }
}

pub(crate) fn transition_to_active(
    transition: &StatusTransition,
) -> expense_status_transitions::ActiveModel {
    expense_status_transitions::ActiveModel {
        id: Set(transition.id.into()),
        expense_id: Set(transition.expense_id.into()),
        from_status: Set(expense_status_to_db(transition.from_status)),
        to_status: Set(expense_status_to_db(transition.to_status)),
        cause: Set(cause_to_db(transition.cause)),
        actor_id: Set(transition.actor_id.map(Into::into)),
        occurred_at: Set(transition.occurred_at.into()),
    }
}
