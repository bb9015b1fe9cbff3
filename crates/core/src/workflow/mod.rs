//! Expense approval workflow.
//!
//! This module implements rule selection, approval materialization, the
//! completion policies for each rule type, and the expense status machine.
//!
//! # Modules
//!
//! - `types` - Workflow enums (`ExpenseStatus`, `DecisionStatus`, `RuleType`)
//! - `error` - Workflow and rule configuration errors
//! - `rule` - Approval rules and their approver steps
//! - `model` - Actors, expenses, decisions, status history
//! - `initiator` - Rule selection and decision materialization
//! - `evaluator` - Completion policy per rule type
//! - `guard` - Ordering guard for sequential rules
//! - `service` - `initiate_workflow` / `record_decision`

pub mod error;
pub mod evaluator;
pub mod guard;
pub mod initiator;
pub mod model;
pub mod rule;
pub mod service;
pub mod types;

#[cfg(test)]
mod evaluator_props;
#[cfg(test)]
mod initiator_props;
#[cfg(test)]
mod service_props;

pub use error::{RuleError, WorkflowError};
pub use evaluator::{Verdict, WorkflowEvaluator};
pub use guard::SequentialGuard;
pub use initiator::WorkflowInitiator;
pub use model::{
    Actor, ApprovalDecision, Expense, ExpenseCategory, NewExpense, StatusTransition,
};
pub use rule::{ApprovalRule, ApprovalStep, RuleDraft};
pub use service::{DecisionOutcome, Initiation, WorkflowService};
pub use types::{DecisionAction, DecisionStatus, ExpenseStatus, RuleType, TransitionCause};
