//! Workflow evaluator: per-rule-type completion policy.
//!
//! The evaluator is a pure function of the bound rule and the full decision
//! set. It never mutates anything; `WorkflowService` applies its verdict.

use expensa_shared::types::UserId;

use crate::workflow::model::ApprovalDecision;
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::{DecisionStatus, ExpenseStatus, RuleType};

/// Outcome of evaluating a decision set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Enough approval signal: approve the expense.
    Approved,
    /// Reject the expense.
    Rejected,
    /// Keep waiting.
    Pending,
}

impl Verdict {
    /// The terminal status this verdict finalizes to, if any.
    #[must_use]
    pub fn terminal_status(self) -> Option<ExpenseStatus> {
        match self {
            Self::Approved => Some(ExpenseStatus::Approved),
            Self::Rejected => Some(ExpenseStatus::Rejected),
            Self::Pending => None,
        }
    }
}

/// Stateless evaluator for approval completion.
pub struct WorkflowEvaluator;

impl WorkflowEvaluator {
    /// Evaluates `decisions` under `rule`.
    ///
    /// An expense without a bound rule has nothing to wait for and is approved.
    #[must_use]
    pub fn evaluate(rule: Option<&ApprovalRule>, decisions: &[ApprovalDecision]) -> Verdict {
        let Some(rule) = rule else {
            return Verdict::Approved;
        };

        if rule.rule_type == RuleType::Sequential {
            return Self::sequential(decisions);
        }

        let specific_met = || {
            rule.specific_approver_id
                .is_some_and(|approver| Self::approved_by(approver, decisions))
        };
        let threshold_met = || {
            rule.percentage_threshold
                .is_some_and(|threshold| Self::threshold_met(threshold, decisions))
        };

        let met = match rule.rule_type {
            RuleType::Specific => specific_met(),
            RuleType::Percentage => threshold_met(),
            RuleType::Hybrid => specific_met() || threshold_met(),
            RuleType::Sequential => false,
        };

        if met || Self::all_approved(decisions) {
            Verdict::Approved
        } else {
            Verdict::Pending
        }
    }

    /// Fail-fast scan in step order.
    ///
    /// The first non-approved decision decides: pending keeps the expense
    /// pending, rejected rejects it. Later decisions are not looked at.
    fn sequential(decisions: &[ApprovalDecision]) -> Verdict {
        let mut ordered: Vec<_> = decisions.iter().collect();
        ordered.sort_by_key(|d| d.step_number);

        for decision in ordered {
            match decision.status {
                DecisionStatus::Pending => return Verdict::Pending,
                DecisionStatus::Rejected => return Verdict::Rejected,
                DecisionStatus::Approved => {}
            }
        }
        Verdict::Approved
    }

    fn approved_by(approver: UserId, decisions: &[ApprovalDecision]) -> bool {
        decisions
            .iter()
            .any(|d| d.approver_id == approver && d.status == DecisionStatus::Approved)
    }

    /// `approved / total * 100 >= threshold`, compared exactly in integers.
    ///
    /// An empty decision set never meets a threshold.
    #[must_use]
    pub fn threshold_met(threshold: i32, decisions: &[ApprovalDecision]) -> bool {
        let total = decisions.len() as u64;
        if total == 0 {
            return false;
        }
        let approved = decisions
            .iter()
            .filter(|d| d.status == DecisionStatus::Approved)
            .count() as u64;
        let Ok(threshold) = u64::try_from(threshold) else {
            return true;
        };
        approved * 100 >= threshold * total
    }

    /// No decision pending and every decision approved. Vacuously true when empty.
    #[must_use]
    pub fn all_approved(decisions: &[ApprovalDecision]) -> bool {
        decisions
            .iter()
            .all(|d| d.status == DecisionStatus::Approved)
    }
}
