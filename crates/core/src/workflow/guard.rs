//! Ordering guard for sequential rules.

use crate::workflow::error::WorkflowError;
use crate::workflow::model::ApprovalDecision;
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::{DecisionStatus, RuleType};

/// Refuses out-of-order decisions under sequential rules.
pub struct SequentialGuard;

impl SequentialGuard {
    /// Checks that `step` may be decided now.
    ///
    /// Under a sequential rule every decision with a lower step number must
    /// already be approved. Other rule types, and expenses without a rule,
    /// always pass.
    ///
    /// # Errors
    ///
    /// Returns `PreviousStepsPending` listing the lower steps that block.
    pub fn check(
        rule: Option<&ApprovalRule>,
        decisions: &[ApprovalDecision],
        step: i32,
    ) -> Result<(), WorkflowError> {
        if rule.is_none_or(|r| r.rule_type != RuleType::Sequential) {
            return Ok(());
        }

        let mut blocking_steps: Vec<i32> = decisions
            .iter()
            .filter(|d| d.step_number < step && d.status != DecisionStatus::Approved)
            .map(|d| d.step_number)
            .collect();

        if blocking_steps.is_empty() {
            return Ok(());
        }

        blocking_steps.sort_unstable();
        blocking_steps.dedup();
        Err(WorkflowError::PreviousStepsPending {
            step,
            blocking_steps,
        })
    }
}
