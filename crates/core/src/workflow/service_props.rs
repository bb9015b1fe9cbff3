//! Property-based tests for WorkflowService.
//!
//! Random decision sequences are replayed against a workflow and the
//! status-machine invariants are checked after every step.

use chrono::{Duration, NaiveDate, Utc};
use expensa_shared::types::{ApprovalRuleId, ApprovalStepId, OrganizationId, UserId};
use proptest::prelude::*;
use rust_decimal_macros::dec;

use crate::workflow::model::{Expense, ExpenseCategory, NewExpense};
use crate::workflow::rule::{ApprovalRule, ApprovalStep};
use crate::workflow::service::WorkflowService;
use crate::workflow::types::{
    DecisionAction, DecisionStatus, ExpenseStatus, RuleType, TransitionCause,
};

fn arb_rule_type() -> impl Strategy<Value = RuleType> {
    prop_oneof![
        Just(RuleType::Sequential),
        Just(RuleType::Percentage),
        Just(RuleType::Specific),
        Just(RuleType::Hybrid),
    ]
}

fn arb_action() -> impl Strategy<Value = DecisionAction> {
    prop_oneof![
        3 => Just(DecisionAction::Approve),
        1 => Just(DecisionAction::Reject),
    ]
}

fn new_expense() -> Expense {
    Expense::submit(
        NewExpense {
            organization_id: OrganizationId::new(),
            employee_id: UserId::new(),
            amount: dec!(250.00),
            currency: "USD".to_string(),
            category: ExpenseCategory::Travel,
            description: "Conference".to_string(),
            merchant_name: String::new(),
            expense_date: NaiveDate::from_ymd_opt(2026, 9, 30).unwrap(),
        },
        dec!(250.00),
        Utc::now(),
    )
}

fn rule_of(rule_type: RuleType, approvers: &[UserId], threshold: i32) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::new(),
        organization_id: OrganizationId::new(),
        name: "generated".to_string(),
        rule_type,
        percentage_threshold: Some(threshold),
        specific_approver_id: approvers.last().copied(),
        is_manager_first: false,
        is_active: true,
        priority: 0,
        created_at: Utc::now(),
        steps: approvers
            .iter()
            .zip(1..)
            .map(|(approver_id, sequence)| ApprovalStep {
                id: ApprovalStepId::new(),
                approver_id: *approver_id,
                sequence,
            })
            .collect(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// No active rule: approved on submission with zero decisions.
    #[test]
    fn prop_auto_approval_without_active_rule(inactive in 0usize..4) {
        let rules: Vec<_> = (0..inactive)
            .map(|_| {
                let mut r = rule_of(RuleType::Sequential, &[UserId::new()], 50);
                r.is_active = false;
                r
            })
            .collect();
        let mut expense = new_expense();

        let init = WorkflowService::initiate_workflow(&mut expense, &rules, None, Utc::now())
            .unwrap();

        prop_assert!(init.decisions.is_empty());
        prop_assert_eq!(expense.status, ExpenseStatus::Approved);
        prop_assert_eq!(expense.approval_rule_id, None);
    }

    /// A reject always rejects, even when the approvals already meet the threshold.
    #[test]
    fn prop_direct_reject_overrides_threshold(threshold in 1i32..=75) {
        let people: Vec<_> = (0..4).map(|_| UserId::new()).collect();
        let rule = rule_of(RuleType::Percentage, &people, threshold);
        let mut expense = new_expense();
        let mut decisions =
            WorkflowService::initiate_workflow(&mut expense, &[rule.clone()], None, Utc::now())
                .unwrap()
                .decisions;

        // Three approvals recorded without a re-evaluation in between.
        for d in decisions.iter_mut().take(3) {
            d.decide(DecisionStatus::Approved, None, Utc::now()).unwrap();
        }
        prop_assert_eq!(expense.status, ExpenseStatus::Pending);

        let outcome = WorkflowService::record_decision(
            &mut expense,
            Some(&rule),
            &mut decisions,
            people[3],
            DecisionAction::Reject,
            None,
            Utc::now(),
        )
        .unwrap();

        prop_assert_eq!(expense.status, ExpenseStatus::Rejected);
        prop_assert_eq!(outcome.transition.unwrap().cause, TransitionCause::DirectReject);
    }

    /// Random decision sequences keep the status machine and timestamps consistent.
    #[test]
    fn prop_replayed_decisions_respect_invariants(
        rule_type in arb_rule_type(),
        n in 1usize..6,
        threshold in 1i32..=100,
        script in prop::collection::vec((any::<prop::sample::Index>(), arb_action()), 0..12),
    ) {
        let people: Vec<_> = (0..n).map(|_| UserId::new()).collect();
        let rule = rule_of(rule_type, &people, threshold);
        let mut expense = new_expense();
        let mut now = Utc::now();
        let mut decisions =
            WorkflowService::initiate_workflow(&mut expense, &[rule.clone()], None, now)
                .unwrap()
                .decisions;

        let mut transitions = Vec::new();
        for (who, action) in script {
            now += Duration::seconds(1);
            let before_status = expense.status;
            let before = decisions.clone();
            let approver = people[who.index(n)];

            match WorkflowService::record_decision(
                &mut expense,
                Some(&rule),
                &mut decisions,
                approver,
                action,
                None,
                now,
            ) {
                Ok(outcome) => {
                    prop_assert_eq!(before_status, ExpenseStatus::Pending);
                    if let Some(t) = outcome.transition {
                        prop_assert_eq!(t.from_status, ExpenseStatus::Pending);
                        prop_assert!(t.to_status.is_terminal());
                        transitions.push(t);
                    }
                }
                Err(_) => {
                    prop_assert_eq!(expense.status, before_status);
                    prop_assert_eq!(&decisions, &before);
                }
            }

            // Timestamps set once are never rewritten.
            for (old, new) in before.iter().zip(&decisions) {
                if old.decided_at.is_some() {
                    prop_assert_eq!(old.decided_at, new.decided_at);
                    prop_assert_eq!(old.status, new.status);
                }
            }
            if before_status.is_terminal() {
                prop_assert_eq!(expense.status, before_status);
            }
        }

        prop_assert!(transitions.len() <= 1);
        if let Some(t) = transitions.first() {
            prop_assert_eq!(t.to_status, expense.status);
        }
    }

    /// Re-evaluating with no decision change never moves the status again.
    #[test]
    fn prop_evaluate_expense_is_idempotent(
        rule_type in arb_rule_type(),
        n in 1usize..6,
        threshold in 1i32..=100,
        statuses in prop::collection::vec(
            prop_oneof![Just(DecisionStatus::Pending), Just(DecisionStatus::Approved)],
            6,
        ),
    ) {
        let people: Vec<_> = (0..n).map(|_| UserId::new()).collect();
        let rule = rule_of(rule_type, &people, threshold);
        let mut expense = new_expense();
        let mut decisions =
            WorkflowService::initiate_workflow(&mut expense, &[rule.clone()], None, Utc::now())
                .unwrap()
                .decisions;
        for (d, status) in decisions.iter_mut().zip(statuses) {
            d.decide(status, None, Utc::now()).unwrap();
        }

        WorkflowService::evaluate_expense(&mut expense, Some(&rule), &decisions, Utc::now())
            .unwrap();
        let first = expense.status;
        let again =
            WorkflowService::evaluate_expense(&mut expense, Some(&rule), &decisions, Utc::now())
                .unwrap();

        prop_assert_eq!(expense.status, first);
        if first.is_terminal() {
            prop_assert!(again.is_none());
        }
    }
}

#[test]
fn test_direct_reject_after_three_of_four_below_threshold() {
    let people: Vec<_> = (0..4).map(|_| UserId::new()).collect();
    let rule = rule_of(RuleType::Percentage, &people, 100);
    let mut expense = new_expense();
    let mut decisions =
        WorkflowService::initiate_workflow(&mut expense, &[rule.clone()], None, Utc::now())
            .unwrap()
            .decisions;

    for approver in &people[..3] {
        WorkflowService::record_decision(
            &mut expense,
            Some(&rule),
            &mut decisions,
            *approver,
            DecisionAction::Approve,
            None,
            Utc::now(),
        )
        .unwrap();
    }
    assert_eq!(expense.status, ExpenseStatus::Pending);

    WorkflowService::record_decision(
        &mut expense,
        Some(&rule),
        &mut decisions,
        people[3],
        DecisionAction::Reject,
        None,
        Utc::now(),
    )
    .unwrap();
    assert_eq!(expense.status, ExpenseStatus::Rejected);
}
