//! Workflow error types for expense approval.
//!
//! This module defines the errors raised while configuring approval rules,
//! starting a workflow, and recording approver decisions.

use expensa_shared::types::{ApprovalRuleId, ExpenseId, UserId};
use thiserror::Error;

use crate::workflow::types::ExpenseStatus;

/// Errors that can occur during workflow operations.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Attempted an invalid status transition.
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        /// The current status.
        from: ExpenseStatus,
        /// The attempted target status.
        to: ExpenseStatus,
    },

    /// The workflow of this expense was already started.
    #[error("Workflow for expense {0} was already initiated")]
    AlreadyInitiated(ExpenseId),

    /// The expense reached a terminal status.
    #[error("Expense {expense_id} is already {status}")]
    ExpenseFinalized {
        /// The expense.
        expense_id: ExpenseId,
        /// Its terminal status.
        status: ExpenseStatus,
    },

    /// Sequential rule: earlier steps have not been approved yet.
    #[error("Step {step} must wait until steps {blocking_steps:?} are approved")]
    PreviousStepsPending {
        /// Step number of the decision being recorded.
        step: i32,
        /// Lower steps that are not approved.
        blocking_steps: Vec<i32>,
    },

    /// The approver already recorded their decision.
    #[error("Approver {approver_id} already decided on step {step}")]
    AlreadyDecided {
        /// The approver.
        approver_id: UserId,
        /// The decided step.
        step: i32,
    },

    /// The approver has no decision on this expense.
    #[error("No pending approval for user {approver_id} on expense {expense_id}")]
    NoPendingDecision {
        /// The expense.
        expense_id: ExpenseId,
        /// The approver.
        approver_id: UserId,
    },

    /// The rule handed to the engine is not the one bound to the expense.
    #[error("Rule {given:?} does not match rule {bound:?} bound to the expense")]
    RuleMismatch {
        /// Rule bound on the expense.
        bound: Option<ApprovalRuleId>,
        /// Rule supplied by the caller.
        given: Option<ApprovalRuleId>,
    },

    /// Expense not found.
    #[error("Expense {0} not found")]
    ExpenseNotFound(ExpenseId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl WorkflowError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidTransition { .. } => 400,

            Self::ExpenseNotFound(_) | Self::NoPendingDecision { .. } => 404,

            Self::AlreadyInitiated(_)
            | Self::ExpenseFinalized { .. }
            | Self::PreviousStepsPending { .. }
            | Self::AlreadyDecided { .. } => 409,

            Self::RuleMismatch { .. } | Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::AlreadyInitiated(_) => "WORKFLOW_ALREADY_INITIATED",
            Self::ExpenseFinalized { .. } => "EXPENSE_FINALIZED",
            Self::PreviousStepsPending { .. } => "PREVIOUS_STEPS_PENDING",
            Self::AlreadyDecided { .. } => "CONFLICT",
            Self::NoPendingDecision { .. } => "NO_PENDING_DECISION",
            Self::RuleMismatch { .. } => "RULE_MISMATCH",
            Self::ExpenseNotFound(_) => "EXPENSE_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

/// Approval rule configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Rule name is empty.
    #[error("Rule name is required")]
    NameRequired,

    /// Percentage threshold outside 1..=100.
    #[error("Percentage threshold {0} must be between 1 and 100")]
    ThresholdOutOfRange(i32),

    /// Percentage rule without threshold.
    #[error("Percentage rules require a percentage threshold")]
    ThresholdRequired,

    /// Specific rule without a specific approver.
    #[error("Specific rules require a specific approver")]
    SpecificApproverRequired,

    /// Hybrid rule with neither condition configured.
    #[error("Hybrid rules require a specific approver or a percentage threshold")]
    HybridConditionRequired,

    /// Two steps share a sequence number.
    #[error("Step sequence {0} is used more than once")]
    DuplicateSequence(i32),

    /// Step sequences start at 1.
    #[error("Step sequence {0} must be positive")]
    NonPositiveSequence(i32),
}

impl RuleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NameRequired => 400,
            _ => 422,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NameRequired => "NAME_REQUIRED",
            Self::ThresholdOutOfRange(_) => "THRESHOLD_OUT_OF_RANGE",
            Self::ThresholdRequired => "THRESHOLD_REQUIRED",
            Self::SpecificApproverRequired => "SPECIFIC_APPROVER_REQUIRED",
            Self::HybridConditionRequired => "HYBRID_CONDITION_REQUIRED",
            Self::DuplicateSequence(_) => "DUPLICATE_SEQUENCE",
            Self::NonPositiveSequence(_) => "INVALID_SEQUENCE",
        }
    }
}
