//! Workflow domain types for expense approval.
//!
//! This module defines the status enums of expenses and approval decisions,
//! the rule types, and the causes recorded in the status history.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Expense status in the approval workflow.
///
/// The valid transitions are:
/// - Pending → Approved (evaluator, or no applicable rule)
/// - Pending → Rejected (evaluator, or a direct reject)
///
/// `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseStatus {
    /// Waiting for approval signal.
    Pending,
    /// Fully approved.
    Approved,
    /// Rejected.
    Rejected,
}

impl ExpenseStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true if no further transitions are permitted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Returns true if `self → to` is a valid transition.
    #[must_use]
    pub fn can_transition_to(&self, to: Self) -> bool {
        matches!(
            (self, to),
            (Self::Pending, Self::Approved | Self::Rejected)
        )
    }
}

impl fmt::Display for ExpenseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Status of a single approver's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    /// The approver has not acted yet.
    Pending,
    /// The approver approved.
    Approved,
    /// The approver rejected.
    Rejected,
}

impl DecisionStatus {
    /// Returns the string representation of the status.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Returns true once the approver has acted.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for DecisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Action an approver takes on their pending decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionAction {
    /// Approve; the evaluator decides the expense status afterwards.
    Approve,
    /// Reject; the expense is rejected immediately.
    Reject,
}

impl DecisionAction {
    /// Parses an action from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "approve" => Some(Self::Approve),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }

    /// Returns the string representation of the action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    /// The decision status this action records.
    #[must_use]
    pub fn decision_status(self) -> DecisionStatus {
        match self {
            Self::Approve => DecisionStatus::Approved,
            Self::Reject => DecisionStatus::Rejected,
        }
    }
}

/// Completion policy of an approval rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Every step approves in order; the first rejection rejects.
    Sequential,
    /// A share of approvals reaching the threshold approves.
    Percentage,
    /// The designated approver's approval is enough.
    Specific,
    /// Specific approver OR percentage threshold.
    Hybrid,
}

impl RuleType {
    /// Returns the string representation of the rule type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Percentage => "percentage",
            Self::Specific => "specific",
            Self::Hybrid => "hybrid",
        }
    }

    /// Parses a rule type from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "sequential" => Some(Self::Sequential),
            "percentage" => Some(Self::Percentage),
            "specific" => Some(Self::Specific),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an expense changed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransitionCause {
    /// The organization had no active rule at submission.
    AutoApprovedNoRule,
    /// The selected rule produced no approvers.
    AutoApprovedNoApprovers,
    /// The evaluator reached a verdict after a decision.
    Evaluated,
    /// An approver rejected.
    DirectReject,
}

impl TransitionCause {
    /// Returns the string representation of the cause.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AutoApprovedNoRule => "auto_approved_no_rule",
            Self::AutoApprovedNoApprovers => "auto_approved_no_approvers",
            Self::Evaluated => "evaluated",
            Self::DirectReject => "direct_reject",
        }
    }

    /// Parses a cause from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "auto_approved_no_rule" => Some(Self::AutoApprovedNoRule),
            "auto_approved_no_approvers" => Some(Self::AutoApprovedNoApprovers),
            "evaluated" => Some(Self::Evaluated),
            "direct_reject" => Some(Self::DirectReject),
            _ => None,
        }
    }
}

impl fmt::Display for TransitionCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
