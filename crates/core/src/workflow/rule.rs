//! Approval rules and their ordered approver steps.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use expensa_shared::types::{ApprovalRuleId, ApprovalStepId, OrganizationId, UserId};
use serde::{Deserialize, Serialize};

use crate::workflow::error::RuleError;
use crate::workflow::types::RuleType;

/// One ordered seat in a rule's approver list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    /// Unique identifier for the step.
    pub id: ApprovalStepId,
    /// The approver occupying this seat.
    pub approver_id: UserId,
    /// Position in the list (unique within the rule).
    pub sequence: i32,
}

/// Approval rule configured for an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalRule {
    /// Unique identifier for the rule.
    pub id: ApprovalRuleId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Human-readable name for the rule.
    pub name: String,
    /// Completion policy.
    pub rule_type: RuleType,
    /// Required approval share in percent (1..=100).
    pub percentage_threshold: Option<i32>,
    /// Approver whose approval alone completes `specific`/`hybrid` rules.
    pub specific_approver_id: Option<UserId>,
    /// Ask the submitter's manager before the listed steps.
    pub is_manager_first: bool,
    /// Only active rules are selected for new expenses.
    pub is_active: bool,
    /// Selection precedence (lower = higher priority).
    pub priority: i16,
    /// When the rule was created; breaks priority ties.
    pub created_at: DateTime<Utc>,
    /// Approver steps.
    pub steps: Vec<ApprovalStep>,
}

impl ApprovalRule {
    /// Returns the steps in ascending sequence order.
    #[must_use]
    pub fn ordered_steps(&self) -> Vec<&ApprovalStep> {
        let mut steps: Vec<_> = self.steps.iter().collect();
        steps.sort_by_key(|s| s.sequence);
        steps
    }

    /// Checks the rule configuration.
    pub fn validate(&self) -> Result<(), RuleError> {
        if self.name.trim().is_empty() {
            return Err(RuleError::NameRequired);
        }

        if let Some(threshold) = self.percentage_threshold
            && !(1..=100).contains(&threshold)
        {
            return Err(RuleError::ThresholdOutOfRange(threshold));
        }

        match self.rule_type {
            RuleType::Percentage if self.percentage_threshold.is_none() => {
                return Err(RuleError::ThresholdRequired);
            }
            RuleType::Specific if self.specific_approver_id.is_none() => {
                return Err(RuleError::SpecificApproverRequired);
            }
            RuleType::Hybrid
                if self.specific_approver_id.is_none() && self.percentage_threshold.is_none() =>
            {
                return Err(RuleError::HybridConditionRequired);
            }
            _ => {}
        }

        let mut seen = HashSet::with_capacity(self.steps.len());
        for step in &self.steps {
            if step.sequence < 1 {
                return Err(RuleError::NonPositiveSequence(step.sequence));
            }
            if !seen.insert(step.sequence) {
                return Err(RuleError::DuplicateSequence(step.sequence));
            }
        }

        Ok(())
    }
}

/// Input for building a new approval rule from an ordered approver list.
#[derive(Debug, Clone)]
pub struct RuleDraft {
    /// Rule name.
    pub name: String,
    /// Completion policy.
    pub rule_type: RuleType,
    /// Required approval share in percent.
    pub percentage_threshold: Option<i32>,
    /// Approver whose approval alone completes `specific`/`hybrid` rules.
    pub specific_approver_id: Option<UserId>,
    /// Ask the submitter's manager first.
    pub is_manager_first: bool,
    /// Selection precedence (lower = higher priority).
    pub priority: i16,
    /// Approvers in the order they are asked.
    pub approvers: Vec<UserId>,
}

impl RuleDraft {
    /// Builds and validates the rule. Steps get sequences 1, 2, 3… in list order.
    pub fn build(
        self,
        organization_id: OrganizationId,
        now: DateTime<Utc>,
    ) -> Result<ApprovalRule, RuleError> {
        let steps = self
            .approvers
            .into_iter()
            .zip(1..)
            .map(|(approver_id, sequence)| ApprovalStep {
                id: ApprovalStepId::new(),
                approver_id,
                sequence,
            })
            .collect();

        let rule = ApprovalRule {
            id: ApprovalRuleId::new(),
            organization_id,
            name: self.name.trim().to_string(),
            rule_type: self.rule_type,
            percentage_threshold: self.percentage_threshold,
            specific_approver_id: self.specific_approver_id,
            is_manager_first: self.is_manager_first,
            is_active: true,
            priority: self.priority,
            created_at: now,
            steps,
        };
        rule.validate()?;
        Ok(rule)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn draft(rule_type: RuleType) -> RuleDraft {
        RuleDraft {
            name: "Default".to_string(),
            rule_type,
            percentage_threshold: None,
            specific_approver_id: None,
            is_manager_first: false,
            priority: 0,
            approvers: vec![UserId::new(), UserId::new(), UserId::new()],
        }
    }

    #[test]
    fn test_build_assigns_sequences_in_order() {
        let d = draft(RuleType::Sequential);
        let approvers = d.approvers.clone();
        let rule = d.build(OrganizationId::new(), Utc::now()).unwrap();

        let steps = rule.ordered_steps();
        assert_eq!(steps.len(), 3);
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.approver_id, approvers[i]);
            assert_eq!(step.sequence, i32::try_from(i).unwrap() + 1);
        }
        assert!(rule.is_active);
    }

    #[test]
    fn test_ordered_steps_sorts_by_sequence() {
        let mut rule = draft(RuleType::Sequential)
            .build(OrganizationId::new(), Utc::now())
            .unwrap();
        rule.steps.reverse();
        let sequences: Vec<_> = rule.ordered_steps().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[rstest]
    #[case(0)]
    #[case(101)]
    #[case(-5)]
    fn test_threshold_out_of_range(#[case] threshold: i32) {
        let mut d = draft(RuleType::Percentage);
        d.percentage_threshold = Some(threshold);
        assert_eq!(
            d.build(OrganizationId::new(), Utc::now()).unwrap_err(),
            RuleError::ThresholdOutOfRange(threshold)
        );
    }

    #[rstest]
    #[case(1)]
    #[case(50)]
    #[case(100)]
    fn test_threshold_in_range(#[case] threshold: i32) {
        let mut d = draft(RuleType::Percentage);
        d.percentage_threshold = Some(threshold);
        assert!(d.build(OrganizationId::new(), Utc::now()).is_ok());
    }

    #[test]
    fn test_percentage_requires_threshold() {
        assert_eq!(
            draft(RuleType::Percentage)
                .build(OrganizationId::new(), Utc::now())
                .unwrap_err(),
            RuleError::ThresholdRequired
        );
    }

    #[test]
    fn test_specific_requires_approver() {
        assert_eq!(
            draft(RuleType::Specific)
                .build(OrganizationId::new(), Utc::now())
                .unwrap_err(),
            RuleError::SpecificApproverRequired
        );
    }

    #[test]
    fn test_hybrid_requires_a_condition() {
        assert_eq!(
            draft(RuleType::Hybrid)
                .build(OrganizationId::new(), Utc::now())
                .unwrap_err(),
            RuleError::HybridConditionRequired
        );

        let mut d = draft(RuleType::Hybrid);
        d.percentage_threshold = Some(60);
        assert!(d.build(OrganizationId::new(), Utc::now()).is_ok());
    }

    #[test]
    fn test_blank_name_rejected() {
        let mut d = draft(RuleType::Sequential);
        d.name = "   ".to_string();
        assert_eq!(
            d.build(OrganizationId::new(), Utc::now()).unwrap_err(),
            RuleError::NameRequired
        );
    }

    #[test]
    fn test_duplicate_sequence_rejected() {
        let mut rule = draft(RuleType::Sequential)
            .build(OrganizationId::new(), Utc::now())
            .unwrap();
        rule.steps[2].sequence = 1;
        assert_eq!(rule.validate(), Err(RuleError::DuplicateSequence(1)));
    }
}
