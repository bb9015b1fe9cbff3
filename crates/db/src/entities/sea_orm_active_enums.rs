//! `SeaORM` active enums mapped to Postgres enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// `user_role` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "user_role")]
pub enum UserRole {
    /// Administrator.
    #[sea_orm(string_value = "admin")]
    Admin,
    /// Manager.
    #[sea_orm(string_value = "manager")]
    Manager,
    /// Employee.
    #[sea_orm(string_value = "employee")]
    Employee,
}

/// `approval_rule_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "approval_rule_type")]
pub enum ApprovalRuleType {
    /// Steps in order.
    #[sea_orm(string_value = "sequential")]
    Sequential,
    /// Share of approvals.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// One designated approver.
    #[sea_orm(string_value = "specific")]
    Specific,
    /// Specific approver or share of approvals.
    #[sea_orm(string_value = "hybrid")]
    Hybrid,
}

/// `expense_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "expense_status")]
pub enum ExpenseStatus {
    /// Awaiting decisions.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Rejected.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// `approval_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "approval_status")]
pub enum ApprovalStatus {
    /// Not decided yet.
    #[sea_orm(string_value = "pending")]
    Pending,
    /// Approved.
    #[sea_orm(string_value = "approved")]
    Approved,
    /// Rejected.
    #[sea_orm(string_value = "rejected")]
    Rejected,
}

/// `expense_category` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "expense_category")]
pub enum ExpenseCategory {
    /// Travel.
    #[sea_orm(string_value = "travel")]
    Travel,
    /// Food & dining.
    #[sea_orm(string_value = "food")]
    Food,
    /// Office supplies.
    #[sea_orm(string_value = "office")]
    Office,
    /// Transportation.
    #[sea_orm(string_value = "transport")]
    Transport,
    /// Accommodation.
    #[sea_orm(string_value = "accommodation")]
    Accommodation,
    /// Entertainment.
    #[sea_orm(string_value = "entertainment")]
    Entertainment,
    /// Other.
    #[sea_orm(string_value = "other")]
    Other,
}

/// `transition_cause` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transition_cause")]
pub enum TransitionCause {
    /// No active rule on submission.
    #[sea_orm(string_value = "auto_approved_no_rule")]
    AutoApprovedNoRule,
    /// Rule produced no approvers.
    #[sea_orm(string_value = "auto_approved_no_approvers")]
    AutoApprovedNoApprovers,
    /// Evaluator verdict.
    #[sea_orm(string_value = "evaluated")]
    Evaluated,
    /// Reject action.
    #[sea_orm(string_value = "direct_reject")]
    DirectReject,
}
