//! Actors, expenses, approval decisions and the status history.

use chrono::{DateTime, NaiveDate, Utc};
use expensa_shared::types::{
    ApprovalRuleId, DecisionId, ExpenseId, OrganizationId, TransitionId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::access::UserRole;
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{DecisionStatus, ExpenseStatus, TransitionCause};

/// A user acting as expense owner and/or approver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Unique identifier.
    pub id: UserId,
    /// Organization membership (absent while bootstrapping).
    pub organization_id: Option<OrganizationId>,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Role in the organization.
    pub role: UserRole,
    /// Direct manager. Weak reference; cycles are not checked.
    pub manager_id: Option<UserId>,
}

impl Actor {
    /// Returns true if the actor belongs to `organization_id`.
    #[must_use]
    pub fn belongs_to(&self, organization_id: OrganizationId) -> bool {
        self.organization_id == Some(organization_id)
    }
}

/// Expense category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseCategory {
    /// Travel.
    Travel,
    /// Food & dining.
    Food,
    /// Office supplies.
    Office,
    /// Transportation.
    Transport,
    /// Accommodation.
    Accommodation,
    /// Entertainment.
    Entertainment,
    /// Anything else.
    Other,
}

impl ExpenseCategory {
    /// Returns the string representation of the category.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Travel => "travel",
            Self::Food => "food",
            Self::Office => "office",
            Self::Transport => "transport",
            Self::Accommodation => "accommodation",
            Self::Entertainment => "entertainment",
            Self::Other => "other",
        }
    }

    /// Parses a category from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "travel" => Some(Self::Travel),
            "food" => Some(Self::Food),
            "office" => Some(Self::Office),
            "transport" => Some(Self::Transport),
            "accommodation" => Some(Self::Accommodation),
            "entertainment" => Some(Self::Entertainment),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ExpenseCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An expense claim moving through the approval workflow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique identifier.
    pub id: ExpenseId,
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// The employee who submitted the claim.
    pub employee_id: UserId,
    /// Claimed amount.
    pub amount: Decimal,
    /// Currency of the claimed amount.
    pub currency: String,
    /// Amount in the organization's currency.
    pub amount_in_company_currency: Decimal,
    /// Category.
    pub category: ExpenseCategory,
    /// Free-text description.
    pub description: String,
    /// Merchant name (may be empty).
    pub merchant_name: String,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
    /// Workflow status.
    pub status: ExpenseStatus,
    /// Rule the workflow was bound to. `None` means no rule applied.
    pub approval_rule_id: Option<ApprovalRuleId>,
    /// Lowest step number still pending, 0 when none is.
    pub current_step: i32,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Input for submitting an expense.
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Owning organization.
    pub organization_id: OrganizationId,
    /// Submitting employee.
    pub employee_id: UserId,
    /// Claimed amount.
    pub amount: Decimal,
    /// Currency of the claimed amount.
    pub currency: String,
    /// Category.
    pub category: ExpenseCategory,
    /// Description.
    pub description: String,
    /// Merchant name.
    pub merchant_name: String,
    /// Date the expense was incurred.
    pub expense_date: NaiveDate,
}

impl Expense {
    /// Creates a pending expense with no rule bound.
    #[must_use]
    pub fn submit(
        input: NewExpense,
        amount_in_company_currency: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ExpenseId::new(),
            organization_id: input.organization_id,
            employee_id: input.employee_id,
            amount: input.amount,
            currency: input.currency.trim().to_uppercase(),
            amount_in_company_currency,
            category: input.category,
            description: input.description,
            merchant_name: input.merchant_name,
            expense_date: input.expense_date,
            status: ExpenseStatus::Pending,
            approval_rule_id: None,
            current_step: 0,
            created_at: now,
            updated_at: now,
        }
    }
}

/// One approver's response for one step of one expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalDecision {
    /// Unique identifier.
    pub id: DecisionId,
    /// The expense.
    pub expense_id: ExpenseId,
    /// The approver.
    pub approver_id: UserId,
    /// Decision status.
    pub status: DecisionStatus,
    /// Free-text comment.
    pub comment: String,
    /// Step number this decision occupies.
    pub step_number: i32,
    /// Set the first time the status leaves `pending`; never changed after.
    pub decided_at: Option<DateTime<Utc>>,
}

impl ApprovalDecision {
    /// Creates a pending decision.
    #[must_use]
    pub fn pending(expense_id: ExpenseId, approver_id: UserId, step_number: i32) -> Self {
        Self {
            id: DecisionId::new(),
            expense_id,
            approver_id,
            status: DecisionStatus::Pending,
            comment: String::new(),
            step_number,
            decided_at: None,
        }
    }

    /// Records the approver's decision.
    ///
    /// Fails with `AlreadyDecided` if the decision left `pending` before.
    pub fn decide(
        &mut self,
        status: DecisionStatus,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), WorkflowError> {
        if self.status.is_terminal() {
            return Err(WorkflowError::AlreadyDecided {
                approver_id: self.approver_id,
                step: self.step_number,
            });
        }

        self.status = status;
        if let Some(comment) = comment {
            self.comment = comment;
        }
        if status.is_terminal() && self.decided_at.is_none() {
            self.decided_at = Some(now);
        }
        Ok(())
    }
}

/// One entry of an expense's status history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTransition {
    /// Unique identifier.
    pub id: TransitionId,
    /// The expense.
    pub expense_id: ExpenseId,
    /// Status before.
    pub from_status: ExpenseStatus,
    /// Status after.
    pub to_status: ExpenseStatus,
    /// What caused the change.
    pub cause: TransitionCause,
    /// Approver whose decision caused it, if any.
    pub actor_id: Option<UserId>,
    /// When it happened.
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn new_expense() -> NewExpense {
        NewExpense {
            organization_id: OrganizationId::new(),
            employee_id: UserId::new(),
            amount: dec!(120.50),
            currency: " usd ".to_string(),
            category: ExpenseCategory::Travel,
            description: "Taxi to client".to_string(),
            merchant_name: String::new(),
            expense_date: NaiveDate::from_ymd_opt(2026, 10, 1).unwrap(),
        }
    }

    #[test]
    fn test_submit_starts_pending_without_rule() {
        let now = Utc::now();
        let expense = Expense::submit(new_expense(), dec!(110.86), now);
        assert_eq!(expense.status, ExpenseStatus::Pending);
        assert_eq!(expense.approval_rule_id, None);
        assert_eq!(expense.current_step, 0);
        assert_eq!(expense.currency, "USD");
        assert_eq!(expense.amount_in_company_currency, dec!(110.86));
    }

    #[test]
    fn test_decide_sets_timestamp_once() {
        let now = Utc::now();
        let mut decision = ApprovalDecision::pending(ExpenseId::new(), UserId::new(), 1);
        decision
            .decide(DecisionStatus::Approved, Some("ok".into()), now)
            .unwrap();
        assert_eq!(decision.decided_at, Some(now));
        assert_eq!(decision.comment, "ok");

        let later = now + Duration::minutes(5);
        let err = decision
            .decide(DecisionStatus::Rejected, None, later)
            .unwrap_err();
        assert!(matches!(err, WorkflowError::AlreadyDecided { step: 1, .. }));
        assert_eq!(decision.status, DecisionStatus::Approved);
        assert_eq!(decision.decided_at, Some(now));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(ExpenseCategory::parse("FOOD"), Some(ExpenseCategory::Food));
        assert_eq!(ExpenseCategory::parse("gadgets"), None);
    }

    #[test]
    fn test_actor_membership() {
        let org = OrganizationId::new();
        let actor = Actor {
            id: UserId::new(),
            organization_id: Some(org),
            username: "ana".to_string(),
            email: "ana@example.com".to_string(),
            role: UserRole::Employee,
            manager_id: None,
        };
        assert!(actor.belongs_to(org));
        assert!(!actor.belongs_to(OrganizationId::new()));
    }
}
