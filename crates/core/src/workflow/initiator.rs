//! Workflow initiator: rule selection and approval materialization.

use expensa_shared::types::{ExpenseId, UserId};

use crate::workflow::model::ApprovalDecision;
use crate::workflow::rule::ApprovalRule;

/// Stateless engine selecting a rule and laying out its approval steps.
pub struct WorkflowInitiator;

impl WorkflowInitiator {
    /// Selects the rule that applies to a new expense.
    ///
    /// Picks the active rule with the lowest `priority`. Ties keep the order
    /// of `rules`, so with equal priorities this is the first active rule.
    #[must_use]
    pub fn select_rule(rules: &[ApprovalRule]) -> Option<&ApprovalRule> {
        rules
            .iter()
            .filter(|r| r.is_active)
            .min_by(|a, b| a.priority.cmp(&b.priority))
    }

    /// Builds the pending decisions for `rule`.
    ///
    /// The owner's manager takes step 1 when the rule asks for it and the
    /// owner has one; the rule's steps follow in sequence order. Step numbers
    /// are assigned 1, 2, 3… in creation order.
    #[must_use]
    pub fn materialize(
        rule: &ApprovalRule,
        expense_id: ExpenseId,
        owner_manager_id: Option<UserId>,
    ) -> Vec<ApprovalDecision> {
        let manager_seat = owner_manager_id.filter(|_| rule.is_manager_first);

        manager_seat
            .into_iter()
            .chain(rule.ordered_steps().into_iter().map(|s| s.approver_id))
            .zip(1..)
            .map(|(approver_id, step)| ApprovalDecision::pending(expense_id, approver_id, step))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use expensa_shared::types::{ApprovalRuleId, ApprovalStepId, OrganizationId};

    use crate::workflow::rule::ApprovalStep;
    use crate::workflow::types::{DecisionStatus, RuleType};

    fn rule(priority: i16, is_active: bool, approvers: &[UserId]) -> ApprovalRule {
        ApprovalRule {
            id: ApprovalRuleId::new(),
            organization_id: OrganizationId::new(),
            name: format!("rule-{priority}"),
            rule_type: RuleType::Sequential,
            percentage_threshold: None,
            specific_approver_id: None,
            is_manager_first: false,
            is_active,
            priority,
            created_at: Utc::now(),
            steps: approvers
                .iter()
                .zip(1..)
                .map(|(id, sequence)| ApprovalStep {
                    id: ApprovalStepId::new(),
                    approver_id: *id,
                    sequence,
                })
                .collect(),
        }
    }

    #[test]
    fn test_select_none_when_no_active_rule() {
        let rules = vec![rule(0, false, &[]), rule(1, false, &[])];
        assert!(WorkflowInitiator::select_rule(&rules).is_none());
        assert!(WorkflowInitiator::select_rule(&[]).is_none());
    }

    #[test]
    fn test_select_first_active_on_equal_priority() {
        let rules = vec![rule(0, false, &[]), rule(0, true, &[]), rule(0, true, &[])];
        let selected = WorkflowInitiator::select_rule(&rules).unwrap();
        assert_eq!(selected.id, rules[1].id);
    }

    #[test]
    fn test_select_lowest_priority() {
        let mut late = rule(-1, true, &[]);
        late.created_at = Utc::now() + Duration::days(1);
        let rules = vec![rule(5, true, &[]), late.clone(), rule(0, true, &[])];
        assert_eq!(WorkflowInitiator::select_rule(&rules).unwrap().id, late.id);
    }

    #[test]
    fn test_materialize_steps_in_sequence_order() {
        let (a, b, c) = (UserId::new(), UserId::new(), UserId::new());
        let mut r = rule(0, true, &[a, b, c]);
        r.steps.swap(0, 2);

        let decisions = WorkflowInitiator::materialize(&r, ExpenseId::new(), None);
        let layout: Vec<_> = decisions
            .iter()
            .map(|d| (d.approver_id, d.step_number))
            .collect();
        assert_eq!(layout, vec![(a, 1), (b, 2), (c, 3)]);
        assert!(decisions.iter().all(|d| d.status == DecisionStatus::Pending));
    }

    #[test]
    fn test_manager_first_takes_step_one() {
        let (manager, a, b) = (UserId::new(), UserId::new(), UserId::new());
        let mut r = rule(0, true, &[a, b]);
        r.is_manager_first = true;

        let decisions = WorkflowInitiator::materialize(&r, ExpenseId::new(), Some(manager));
        let layout: Vec<_> = decisions
            .iter()
            .map(|d| (d.approver_id, d.step_number))
            .collect();
        assert_eq!(layout, vec![(manager, 1), (a, 2), (b, 3)]);
    }

    #[test]
    fn test_manager_first_without_manager_is_skipped() {
        let a = UserId::new();
        let mut r = rule(0, true, &[a]);
        r.is_manager_first = true;

        let decisions = WorkflowInitiator::materialize(&r, ExpenseId::new(), None);
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].approver_id, a);
        assert_eq!(decisions[0].step_number, 1);
    }

    #[test]
    fn test_manager_ignored_when_rule_does_not_ask() {
        let a = UserId::new();
        let r = rule(0, true, &[a]);
        let decisions = WorkflowInitiator::materialize(&r, ExpenseId::new(), Some(UserId::new()));
        assert_eq!(decisions.len(), 1);
        assert_eq!(decisions[0].approver_id, a);
    }
}
