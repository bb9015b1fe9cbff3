//! `SeaORM` entity definitions.

pub mod approval_rules;
pub mod approval_steps;
pub mod expense_approvals;
pub mod expense_status_transitions;
pub mod expenses;
pub mod organizations;
pub mod sea_orm_active_enums;
pub mod users;
