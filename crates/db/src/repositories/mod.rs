//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod approval_rule;
mod convert;
pub mod expense;
pub mod organization;
pub mod user;
pub mod workflow;

pub use approval_rule::{ApprovalRuleError, ApprovalRuleRepository, UpdateApprovalRuleInput};
pub use expense::{ExpenseDetail, ExpenseRepository, ExpenseScope};
pub use organization::{NewOrganization, OrganizationRepository};
pub use user::{NewUser, UserError, UserRepository};
pub use workflow::{PendingApproval, RecordedDecision, SubmittedExpense, WorkflowRepository};
