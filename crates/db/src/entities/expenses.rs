//! `SeaORM` Entity for expenses table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::sea_orm_active_enums::{ExpenseCategory, ExpenseStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "expenses")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub organization_id: Uuid,
    pub employee_id: Uuid,
    #[sea_orm(column_type = "Decimal(Some((10, 2)))")]
    pub amount: Decimal,
    pub currency: String,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub amount_in_company_currency: Decimal,
    pub category: ExpenseCategory,
    pub description: String,
    pub merchant_name: String,
    pub expense_date: Date,
    pub status: ExpenseStatus,
    pub approval_rule_id: Option<Uuid>,
    pub current_step: i32,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::organizations::Entity",
        from = "Column::OrganizationId",
        to = "super::organizations::Column::Id"
    )]
    Organizations,
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::EmployeeId",
        to = "super::users::Column::Id"
    )]
    Employee,
    #[sea_orm(
        belongs_to = "super::approval_rules::Entity",
        from = "Column::ApprovalRuleId",
        to = "super::approval_rules::Column::Id"
    )]
    ApprovalRules,
    #[sea_orm(has_many = "super::expense_approvals::Entity")]
    ExpenseApprovals,
    #[sea_orm(has_many = "super::expense_status_transitions::Entity")]
    ExpenseStatusTransitions,
}

impl Related<super::organizations::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Organizations.def()
    }
}

impl Related<super::expense_approvals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseApprovals.def()
    }
}

impl Related<super::expense_status_transitions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ExpenseStatusTransitions.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
