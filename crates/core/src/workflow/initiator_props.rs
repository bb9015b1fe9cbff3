//! Property-based tests for WorkflowInitiator.

use chrono::Utc;
use expensa_shared::types::{ApprovalRuleId, ApprovalStepId, ExpenseId, OrganizationId, UserId};
use proptest::prelude::*;

use crate::workflow::initiator::WorkflowInitiator;
use crate::workflow::rule::{ApprovalRule, ApprovalStep};
use crate::workflow::types::{DecisionStatus, RuleType};

fn arb_rule_type() -> impl Strategy<Value = RuleType> {
    prop_oneof![
        Just(RuleType::Sequential),
        Just(RuleType::Percentage),
        Just(RuleType::Specific),
        Just(RuleType::Hybrid),
    ]
}

fn rule_with(rule_type: RuleType, approvers: &[UserId], manager_first: bool) -> ApprovalRule {
    ApprovalRule {
        id: ApprovalRuleId::new(),
        organization_id: OrganizationId::new(),
        name: "generated".to_string(),
        rule_type,
        percentage_threshold: Some(50),
        specific_approver_id: approvers.first().copied(),
        is_manager_first: manager_first,
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

    /// Step numbers are exactly 1..=n and every decision starts pending.
    #[test]
    fn prop_step_numbers_are_contiguous(
        rule_type in arb_rule_type(),
        n in 0usize..8,
        manager_first in any::<bool>(),
        has_manager in any::<bool>(),
    ) {
        let approvers: Vec<_> = (0..n).map(|_| UserId::new()).collect();
        let rule = rule_with(rule_type, &approvers, manager_first);
        let manager = has_manager.then(UserId::new);

        let decisions = WorkflowInitiator::materialize(&rule, ExpenseId::new(), manager);

        let expected_len = n + usize::from(manager_first && has_manager);
        prop_assert_eq!(decisions.len(), expected_len);
        for (i, d) in decisions.iter().enumerate() {
            prop_assert_eq!(d.step_number, i32::try_from(i).unwrap() + 1);
            prop_assert_eq!(d.status, DecisionStatus::Pending);
            prop_assert!(d.decided_at.is_none());
        }
    }

    /// The manager always holds step 1 and the listed steps shift by one.
    #[test]
    fn prop_manager_first_offsets_steps(
        rule_type in arb_rule_type(),
        n in 0usize..8,
    ) {
        let approvers: Vec<_> = (0..n).map(|_| UserId::new()).collect();
        let rule = rule_with(rule_type, &approvers, true);
        let manager = UserId::new();

        let decisions = WorkflowInitiator::materialize(&rule, ExpenseId::new(), Some(manager));

        prop_assert_eq!(decisions[0].approver_id, manager);
        prop_assert_eq!(decisions[0].step_number, 1);
        for (i, approver) in approvers.iter().enumerate() {
            prop_assert_eq!(decisions[i + 1].approver_id, *approver);
            prop_assert_eq!(decisions[i + 1].step_number, i32::try_from(i).unwrap() + 2);
        }
    }

    /// Selection returns an active rule with the lowest priority, first on ties.
    #[test]
    fn prop_selection_lowest_active_priority(
        specs in prop::collection::vec((-5i16..5, any::<bool>()), 0..10),
    ) {
        let rules: Vec<_> = specs
            .iter()
            .map(|(priority, active)| {
                let mut r = rule_with(RuleType::Sequential, &[], false);
                r.priority = *priority;
                r.is_active = *active;
                r
            })
            .collect();

        let expected = rules
            .iter()
            .filter(|r| r.is_active)
            .map(|r| r.priority)
            .min()
            .and_then(|p| rules.iter().find(|r| r.is_active && r.priority == p))
            .map(|r| r.id);

        prop_assert_eq!(WorkflowInitiator::select_rule(&rules).map(|r| r.id), expected);
    }
}
