//! Roles and capabilities.
//!
//! The workflow engine assumes its caller is already authorized. Callers
//! resolve the acting user's [`UserRole`] and check the [`Capability`] an
//! operation needs before handing an identified approver to the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Role of a user inside an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Manages users and approval rules, sees every expense.
    Admin,
    /// Approves expenses and sees the expenses of direct reports.
    Manager,
    /// Submits expenses.
    Employee,
}

impl UserRole {
    /// Parse a role from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "manager" => Some(Self::Manager),
            "employee" => Some(Self::Employee),
            _ => None,
        }
    }

    /// Returns the string representation of the role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Employee => "employee",
        }
    }

    /// Returns true if this role grants `capability`.
    #[must_use]
    pub fn can(self, capability: Capability) -> bool {
        match capability {
            Capability::SubmitExpense => true,
            Capability::DecideApprovals | Capability::ViewTeamExpenses => {
                matches!(self, Self::Admin | Self::Manager)
            }
            Capability::ManageUsers | Capability::ManageRules | Capability::ViewAllExpenses => {
                self == Self::Admin
            }
        }
    }

    /// Fails with [`AccessError`] unless this role grants `capability`.
    pub fn require(self, capability: Capability) -> Result<(), AccessError> {
        if self.can(capability) {
            Ok(())
        } else {
            Err(AccessError {
                role: self,
                capability,
            })
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation a caller may need permission for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Create users and assign managers.
    ManageUsers,
    /// Create, activate and reprioritize approval rules.
    ManageRules,
    /// Submit an expense claim.
    SubmitExpense,
    /// Approve or reject pending decisions.
    DecideApprovals,
    /// List the expenses of direct reports.
    ViewTeamExpenses,
    /// List every expense of the organization.
    ViewAllExpenses,
}

impl Capability {
    /// Returns the string representation of the capability.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ManageUsers => "manage_users",
            Self::ManageRules => "manage_rules",
            Self::SubmitExpense => "submit_expense",
            Self::DecideApprovals => "decide_approvals",
            Self::ViewTeamExpenses => "view_team_expenses",
            Self::ViewAllExpenses => "view_all_expenses",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A role lacked a required capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Role {role} lacks capability {capability}")]
pub struct AccessError {
    /// The caller's role.
    pub role: UserRole,
    /// The capability that was required.
    pub capability: Capability,
}
