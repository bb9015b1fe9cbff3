//! Workflow service: starts approval workflows and records decisions.
//!
//! The service works on in-memory aggregates (expense, bound rule, decision
//! set) and mutates them in place. Persistence is the caller's job; every
//! status change comes back as a `StatusTransition` to be stored alongside.

use chrono::{DateTime, Utc};
use expensa_shared::types::{TransitionId, UserId};

use crate::workflow::error::WorkflowError;
use crate::workflow::evaluator::{Verdict, WorkflowEvaluator};
use crate::workflow::guard::SequentialGuard;
use crate::workflow::initiator::WorkflowInitiator;
use crate::workflow::model::{ApprovalDecision, Expense, StatusTransition};
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::{DecisionAction, DecisionStatus, ExpenseStatus, TransitionCause};

/// Result of starting a workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Initiation {
    /// Pending decisions in step order. Empty when the expense was auto-approved.
    pub decisions: Vec<ApprovalDecision>,
    /// Status change, when the expense was finalized right away.
    pub transition: Option<StatusTransition>,
}

/// Result of recording one approver's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionOutcome {
    /// The updated decision.
    pub decision: ApprovalDecision,
    /// Verdict for the expense after the decision.
    pub verdict: Verdict,
    /// Status change, when the decision finalized the expense.
    pub transition: Option<StatusTransition>,
}

/// Stateless service driving the expense approval workflow.
pub struct WorkflowService;

impl WorkflowService {
    /// Binds a rule to a freshly submitted expense and lays out its decisions.
    ///
    /// With no active rule the expense is approved immediately. A rule that
    /// yields no approvers approves it as well.
    ///
    /// # Errors
    ///
    /// `AlreadyInitiated` if the expense already left the initial state.
    pub fn initiate_workflow(
        expense: &mut Expense,
        rules: &[ApprovalRule],
        owner_manager_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<Initiation, WorkflowError> {
        if expense.status != ExpenseStatus::Pending || expense.approval_rule_id.is_some() {
            return Err(WorkflowError::AlreadyInitiated(expense.id));
        }

        let Some(rule) = WorkflowInitiator::select_rule(rules) else {
            let transition = Self::finalize(
                expense,
                ExpenseStatus::Approved,
                TransitionCause::AutoApprovedNoRule,
                None,
                now,
            )?;
            return Ok(Initiation {
                decisions: Vec::new(),
                transition: Some(transition),
            });
        };

        expense.approval_rule_id = Some(rule.id);
        let decisions = WorkflowInitiator::materialize(rule, expense.id, owner_manager_id);

        let transition = if decisions.is_empty() {
            Some(Self::finalize(
                expense,
                ExpenseStatus::Approved,
                TransitionCause::AutoApprovedNoApprovers,
                None,
                now,
            )?)
        } else {
            expense.current_step = Self::current_step(&decisions);
            expense.updated_at = now;
            None
        };

        Ok(Initiation {
            decisions,
            transition,
        })
    }

    /// Records `approver_id`'s decision on the expense.
    ///
    /// Targets the approver's lowest pending step. A reject finalizes the
    /// expense as rejected without consulting the evaluator; an approve runs
    /// the evaluator on the updated decision set.
    ///
    /// # Errors
    ///
    /// - `ExpenseFinalized` if the expense is already approved or rejected
    /// - `RuleMismatch` if `rule` is not the rule bound to the expense
    /// - `AlreadyDecided` if the approver has no pending step left
    /// - `NoPendingDecision` if the approver holds no decision at all
    /// - `PreviousStepsPending` if a sequential rule has earlier steps open
    pub fn record_decision(
        expense: &mut Expense,
        rule: Option<&ApprovalRule>,
        decisions: &mut [ApprovalDecision],
        approver_id: UserId,
        action: DecisionAction,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<DecisionOutcome, WorkflowError> {
        if expense.status.is_terminal() {
            return Err(WorkflowError::ExpenseFinalized {
                expense_id: expense.id,
                status: expense.status,
            });
        }

        let given = rule.map(|r| r.id);
        if given != expense.approval_rule_id {
            return Err(WorkflowError::RuleMismatch {
                bound: expense.approval_rule_id,
                given,
            });
        }

        let index = Self::target_decision(expense, decisions, approver_id)?;
        let step = decisions[index].step_number;

        SequentialGuard::check(rule, decisions, step)?;

        decisions[index].decide(action.decision_status(), comment, now)?;

        let (verdict, cause) = match action {
            DecisionAction::Reject => (Verdict::Rejected, TransitionCause::DirectReject),
            DecisionAction::Approve => (
                WorkflowEvaluator::evaluate(rule, decisions),
                TransitionCause::Evaluated,
            ),
        };

        let transition = match verdict.terminal_status() {
            Some(to) => Some(Self::finalize(expense, to, cause, Some(approver_id), now)?),
            None => None,
        };

        expense.current_step = Self::current_step(decisions);
        expense.updated_at = now;

        Ok(DecisionOutcome {
            decision: decisions[index].clone(),
            verdict,
            transition,
        })
    }

    /// Re-runs the evaluator and applies its verdict.
    ///
    /// Safe to call repeatedly: a terminal expense is left untouched and an
    /// unchanged decision set produces the same verdict.
    ///
    /// # Errors
    ///
    /// `RuleMismatch` if `rule` is not the rule bound to the expense.
    pub fn evaluate_expense(
        expense: &mut Expense,
        rule: Option<&ApprovalRule>,
        decisions: &[ApprovalDecision],
        now: DateTime<Utc>,
    ) -> Result<Option<StatusTransition>, WorkflowError> {
        if expense.status.is_terminal() {
            return Ok(None);
        }

        let given = rule.map(|r| r.id);
        if given != expense.approval_rule_id {
            return Err(WorkflowError::RuleMismatch {
                bound: expense.approval_rule_id,
                given,
            });
        }

        let verdict = WorkflowEvaluator::evaluate(rule, decisions);
        let Some(to) = verdict.terminal_status() else {
            return Ok(None);
        };

        let transition = Self::finalize(expense, to, TransitionCause::Evaluated, None, now)?;
        expense.current_step = Self::current_step(decisions);
        Ok(Some(transition))
    }

    /// Lowest step number still pending, 0 when nothing is pending.
    #[must_use]
    pub fn current_step(decisions: &[ApprovalDecision]) -> i32 {
        decisions
            .iter()
            .filter(|d| d.status == DecisionStatus::Pending)
            .map(|d| d.step_number)
            .min()
            .unwrap_or(0)
    }

    fn target_decision(
        expense: &Expense,
        decisions: &[ApprovalDecision],
        approver_id: UserId,
    ) -> Result<usize, WorkflowError> {
        let pending = decisions
            .iter()
            .enumerate()
            .filter(|(_, d)| d.approver_id == approver_id && d.status == DecisionStatus::Pending)
            .min_by_key(|(_, d)| d.step_number)
            .map(|(i, _)| i);

        if let Some(index) = pending {
            return Ok(index);
        }

        match decisions
            .iter()
            .filter(|d| d.approver_id == approver_id)
            .map(|d| d.step_number)
            .max()
        {
            Some(step) => Err(WorkflowError::AlreadyDecided { approver_id, step }),
            None => Err(WorkflowError::NoPendingDecision {
                expense_id: expense.id,
                approver_id,
            }),
        }
    }

    fn finalize(
        expense: &mut Expense,
        to: ExpenseStatus,
        cause: TransitionCause,
        actor_id: Option<UserId>,
        now: DateTime<Utc>,
    ) -> Result<StatusTransition, WorkflowError> {
        let from = expense.status;
        if !from.can_transition_to(to) {
            return Err(WorkflowError::InvalidTransition { from, to });
        }

        expense.status = to;
        expense.updated_at = now;

        Ok(StatusTransition {
            id: TransitionId::new(),
            expense_id: expense.id,
            from_status: from,
            to_status: to,
            cause,
            actor_id,
            occurred_at: now,
        })
    }
}
