//! Property-based tests for WorkflowEvaluator.

use chrono::Utc;
use expensa_shared::types::{ApprovalRuleId, ExpenseId, OrganizationId, UserId};
use proptest::prelude::*;

use crate::workflow::evaluator::{Verdict, WorkflowEvaluator};
use crate::workflow::model::ApprovalDecision;
use crate::workflow::rule::ApprovalRule;
use crate::workflow::types::{DecisionStatus, RuleType};

fn arb_decision_status() -> impl Strategy<Value = DecisionStatus> {
    prop_oneof![
        Just(DecisionStatus::Pending),
        Just(DecisionStatus::Approved),
        Just(DecisionStatus::Rejected),
    ]
}

fn arb_rule_type() -> impl Strategy<Value = RuleType> {
    prop_oneof![
        Just(RuleType::Sequential),
        Just(RuleType::Percentage),
        Just(RuleType::Specific),
        Just(RuleType::Hybrid),
    ]
}

fn decisions_from(statuses: &[DecisionStatus]) -> Vec<ApprovalDecision> {
    let expense_id = ExpenseId::new();
    statuses
        .iter()
        .zip(1..)
        .map(|(status, step)| {
            let mut d = ApprovalDecision::pending(expense_id, UserId::new(), step);
            d.status = *status;
            d
        })
        .collect()
}

fn rule_of(rule_type: RuleType, threshold: Option<i32>, specific: Option<UserId>) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::new(),
        organization_id: OrganizationId::new(),
        name: "generated".to_string(),
        rule_type,
        percentage_threshold: threshold,
        specific_approver_id: specific,
        is_manager_first: false,
        is_active: true,
        priority: 0,
        created_at: Utc::now(),
        steps: vec![],
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Evaluating twice over an unchanged decision set gives the same verdict.
    #[test]
    fn prop_evaluation_is_idempotent(
        rule_type in arb_rule_type(),
        threshold in 1i32..=100,
        statuses in prop::collection::vec(arb_decision_status(), 0..8),
        specific_index in any::<prop::sample::Index>(),
    ) {
        let decisions = decisions_from(&statuses);
        let specific = (!decisions.is_empty())
            .then(|| decisions[specific_index.index(decisions.len())].approver_id);
        let rule = rule_of(rule_type, Some(threshold), specific);

        let first = WorkflowEvaluator::evaluate(Some(&rule), &decisions);
        let second = WorkflowEvaluator::evaluate(Some(&rule), &decisions);
        prop_assert_eq!(first, second);
    }

    /// Sequential: an outstanding step keeps the expense pending whatever follows.
    #[test]
    fn prop_sequential_fail_fast(
        approved_prefix in 0usize..5,
        tail in prop::collection::vec(arb_decision_status(), 0..5),
    ) {
        let mut statuses = vec![DecisionStatus::Approved; approved_prefix];
        statuses.push(DecisionStatus::Pending);
        statuses.extend(tail);

        let rule = rule_of(RuleType::Sequential, None, None);
        prop_assert_eq!(
            WorkflowEvaluator::evaluate(Some(&rule), &decisions_from(&statuses)),
            Verdict::Pending
        );
    }

    /// Sequential: the first rejection in step order rejects, even with later steps open.
    #[test]
    fn prop_sequential_short_circuit_rejection(
        approved_prefix in 0usize..5,
        tail in prop::collection::vec(arb_decision_status(), 0..5),
    ) {
        let mut statuses = vec![DecisionStatus::Approved; approved_prefix];
        statuses.push(DecisionStatus::Rejected);
        statuses.extend(tail);

        let rule = rule_of(RuleType::Sequential, None, None);
        prop_assert_eq!(
            WorkflowEvaluator::evaluate(Some(&rule), &decisions_from(&statuses)),
            Verdict::Rejected
        );
    }

    /// Percentage: approved iff approved * 100 >= threshold * total, inclusive.
    #[test]
    fn prop_percentage_exact_comparison(
        total in 1usize..12,
        approved_seed in any::<prop::sample::Index>(),
        threshold in 1i32..=100,
    ) {
        let approved = approved_seed.index(total + 1);
        let mut statuses = vec![DecisionStatus::Approved; approved];
        statuses.resize(total, DecisionStatus::Pending);

        let rule = rule_of(RuleType::Percentage, Some(threshold), None);
        let verdict = WorkflowEvaluator::evaluate(Some(&rule), &decisions_from(&statuses));

        let expected = approved as u64 * 100 >= u64::try_from(threshold).unwrap() * total as u64;
        prop_assert_eq!(verdict == Verdict::Approved, expected);
    }

    /// Non-sequential rules never reject through evaluation.
    #[test]
    fn prop_non_sequential_never_rejects(
        rule_type in prop_oneof![
            Just(RuleType::Percentage),
            Just(RuleType::Specific),
            Just(RuleType::Hybrid),
        ],
        statuses in prop::collection::vec(arb_decision_status(), 0..8),
        threshold in 1i32..=100,
    ) {
        let decisions = decisions_from(&statuses);
        let rule = rule_of(rule_type, Some(threshold), decisions.first().map(|d| d.approver_id));
        prop_assert_ne!(
            WorkflowEvaluator::evaluate(Some(&rule), &decisions),
            Verdict::Rejected
        );
    }
}

#[test]
fn test_percentage_boundary_two_of_four_at_fifty() {
    let rule = rule_of(RuleType::Percentage, Some(50), None);
    let decisions = decisions_from(&[
        DecisionStatus::Approved,
        DecisionStatus::Approved,
        DecisionStatus::Pending,
        DecisionStatus::Pending,
    ]);
    assert_eq!(
        WorkflowEvaluator::evaluate(Some(&rule), &decisions),
        Verdict::Approved
    );
}
