//! Approval rule repository.
//!
//! Rules are stored with their ordered approver steps and always handed out
//! as domain [`ApprovalRule`]s, steps included.

use std::collections::HashMap;

use expensa_core::access::Capability;
use expensa_core::workflow::{ApprovalRule, RuleDraft, RuleError};
use expensa_shared::types::{ApprovalRuleId, OrganizationId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{approval_rules, approval_steps, users};

use super::convert::{role_to_core, rule_from_models, rule_type_to_db};

/// Errors that can occur during approval rule operations.
#[derive(Debug, Error)]
pub enum ApprovalRuleError {
    /// Approval rule not found.
    #[error("Approval rule {0} not found")]
    NotFound(ApprovalRuleId),

    /// Invalid rule configuration.
    #[error(transparent)]
    Invalid(#[from] RuleError),

    /// An approver is not a member of the organization.
    #[error("Approver {0} is not a member of this organization")]
    ApproverNotInOrganization(UserId),

    /// An approver's role may not decide on expenses.
    #[error("User {0} cannot approve expenses")]
    ApproverCannotApprove(UserId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ApprovalRuleError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Invalid(e) => e.status_code(),
            Self::ApproverNotInOrganization(_) | Self::ApproverCannotApprove(_) => 422,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "RULE_NOT_FOUND",
            Self::Invalid(e) => e.error_code(),
            Self::ApproverNotInOrganization(_) => "APPROVER_NOT_IN_ORGANIZATION",
            Self::ApproverCannotApprove(_) => "APPROVER_CANNOT_APPROVE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

/// Input for updating an approval rule. Steps are fixed once created.
#[derive(Debug, Clone, Default)]
pub struct UpdateApprovalRuleInput {
    /// New name.
    pub name: Option<String>,
    /// New percentage threshold.
    pub percentage_threshold: Option<Option<i32>>,
    /// New specific approver.
    pub specific_approver_id: Option<Option<UserId>>,
    /// New manager-first flag.
    pub is_manager_first: Option<bool>,
    /// New priority.
    pub priority: Option<i16>,
    /// Active status.
    pub is_active: Option<bool>,
}

/// Repository for approval rule operations.
#[derive(Debug, Clone)]
pub struct ApprovalRuleRepository {
    db: DatabaseConnection,
}

impl ApprovalRuleRepository {
    /// Creates a new approval rule repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a rule and its steps. Steps get sequences 1, 2, 3… in draft order.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a bad configuration,
    /// `ApproverNotInOrganization` for a foreign approver and
    /// `ApproverCannotApprove` for an approver without approval rights.
    pub async fn create_rule(
        &self,
        organization_id: OrganizationId,
        draft: RuleDraft,
    ) -> Result<ApprovalRule, ApprovalRuleError> {
        let rule = draft.build(organization_id, chrono::Utc::now())?;

        let mut approvers: Vec<UserId> = rule.steps.iter().map(|s| s.approver_id).collect();
        approvers.extend(rule.specific_approver_id);
        ensure_approvers(&self.db, organization_id, &approvers).await?;

        let txn = self.db.begin().await?;
        let now = rule.created_at.into();

        approval_rules::ActiveModel {
            id: Set(rule.id.into()),
            organization_id: Set(organization_id.into()),
            name: Set(rule.name.clone()),
            rule_type: Set(rule_type_to_db(rule.rule_type)),
            percentage_threshold: Set(rule.percentage_threshold),
            specific_approver_id: Set(rule.specific_approver_id.map(Uuid::from)),
            is_manager_first: Set(rule.is_manager_first),
            is_active: Set(rule.is_active),
            priority: Set(rule.priority),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        for step in &rule.steps {
            approval_steps::ActiveModel {
                id: Set(step.id.into()),
                rule_id: Set(rule.id.into()),
                approver_id: Set(step.approver_id.into()),
                sequence: Set(step.sequence),
            }
            .insert(&txn)
            .await?;
        }

        txn.commit().await?;

        tracing::info!(
            rule_id = %rule.id,
            organization_id = %organization_id,
            rule_type = %rule.rule_type,
            steps = rule.steps.len(),
            "Approval rule created"
        );
        Ok(rule)
    }

    /// Lists all rules of an organization in selection order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_rules(
        &self,
        organization_id: OrganizationId,
    ) -> Result<Vec<ApprovalRule>, ApprovalRuleError> {
        Ok(load_rules(&self.db, organization_id, false).await?)
    }

    /// Gets a rule by ID.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the rule does not exist in the organization.
    pub async fn get_rule(
        &self,
        organization_id: OrganizationId,
        rule_id: ApprovalRuleId,
    ) -> Result<ApprovalRule, ApprovalRuleError> {
        load_rule(&self.db, rule_id)
            .await?
            .filter(|r| r.organization_id == organization_id)
            .ok_or(ApprovalRuleError::NotFound(rule_id))
    }

    /// Updates a rule's settings and re-validates it.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Invalid`, or `ApproverNotInOrganization`.
    pub async fn update_rule(
        &self,
        organization_id: OrganizationId,
        rule_id: ApprovalRuleId,
        input: UpdateApprovalRuleInput,
    ) -> Result<ApprovalRule, ApprovalRuleError> {
        let mut rule = self.get_rule(organization_id, rule_id).await?;

        if let Some(name) = input.name {
            rule.name = name.trim().to_string();
        }
        if let Some(threshold) = input.percentage_threshold {
            rule.percentage_threshold = threshold;
        }
        if let Some(specific) = input.specific_approver_id {
            rule.specific_approver_id = specific;
        }
        if let Some(is_manager_first) = input.is_manager_first {
            rule.is_manager_first = is_manager_first;
        }
        if let Some(priority) = input.priority {
            rule.priority = priority;
        }
        if let Some(is_active) = input.is_active {
            rule.is_active = is_active;
        }

        rule.validate()?;
        if let Some(specific) = rule.specific_approver_id {
            ensure_approvers(&self.db, organization_id, &[specific]).await?;
        }

        approval_rules::ActiveModel {
            id: Set(rule.id.into()),
            name: Set(rule.name.clone()),
            percentage_threshold: Set(rule.percentage_threshold),
            specific_approver_id: Set(rule.specific_approver_id.map(Uuid::from)),
            is_manager_first: Set(rule.is_manager_first),
            priority: Set(rule.priority),
            is_active: Set(rule.is_active),
            updated_at: Set(chrono::Utc::now().into()),
            ..Default::default()
        }
        .update(&self.db)
        .await?;

        Ok(rule)
    }
}

async fn ensure_approvers(
    db: &DatabaseConnection,
    organization_id: OrganizationId,
    approvers: &[UserId],
) -> Result<(), ApprovalRuleError> {
    if approvers.is_empty() {
        return Ok(());
    }

    let members: HashMap<Uuid, users::Model> = users::Entity::find()
        .filter(users::Column::Id.is_in(approvers.iter().copied().map(Uuid::from)))
        .filter(users::Column::OrganizationId.eq(Uuid::from(organization_id)))
        .all(db)
        .await?
        .into_iter()
        .map(|u| (u.id, u))
        .collect();

    for approver in approvers {
        check_approver(*approver, members.get(&Uuid::from(*approver)))?;
    }
    Ok(())
}

/// An approver must be a member whose role can decide on expenses.
fn check_approver(
    approver: UserId,
    member: Option<&users::Model>,
) -> Result<(), ApprovalRuleError> {
    let Some(member) = member else {
        return Err(ApprovalRuleError::ApproverNotInOrganization(approver));
    };
    if !role_to_core(member.role).can(Capability::DecideApprovals) {
        return Err(ApprovalRuleError::ApproverCannotApprove(approver));
    }
    Ok(())
}

/// Loads one rule with its steps.
pub(crate) async fn load_rule<C: ConnectionTrait>(
    conn: &C,
    rule_id: ApprovalRuleId,
) -> Result<Option<ApprovalRule>, DbErr> {
    let Some(rule) = approval_rules::Entity::find_by_id(Uuid::from(rule_id))
        .one(conn)
        .await?
    else {
        return Ok(None);
    };

    let steps = approval_steps::Entity::find()
        .filter(approval_steps::Column::RuleId.eq(rule.id))
        .order_by_asc(approval_steps::Column::Sequence)
        .all(conn)
        .await?;

    Ok(Some(rule_from_models(rule, steps)))
}

/// Loads an organization's rules, steps included, by priority then creation time.
pub(crate) async fn load_rules<C: ConnectionTrait>(
    conn: &C,
    organization_id: OrganizationId,
    active_only: bool,
) -> Result<Vec<ApprovalRule>, DbErr> {
    let mut query = approval_rules::Entity::find()
        .filter(approval_rules::Column::OrganizationId.eq(Uuid::from(organization_id)));
    if active_only {
        query = query.filter(approval_rules::Column::IsActive.eq(true));
    }
    let rules = query
        .order_by_asc(approval_rules::Column::Priority)
        .order_by_asc(approval_rules::Column::CreatedAt)
        .order_by_asc(approval_rules::Column::Id)
        .all(conn)
        .await?;

    with_steps(conn, rules).await
}

/// Loads the given rules, steps included, keyed by ID. Unknown IDs are skipped.
pub(crate) async fn load_rules_by_id<C: ConnectionTrait>(
    conn: &C,
    rule_ids: &[ApprovalRuleId],
) -> Result<HashMap<ApprovalRuleId, ApprovalRule>, DbErr> {
    if rule_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let rules = approval_rules::Entity::find()
        .filter(approval_rules::Column::Id.is_in(rule_ids.iter().copied().map(Uuid::from)))
        .all(conn)
        .await?;

    Ok(with_steps(conn, rules)
        .await?
        .into_iter()
        .map(|rule| (rule.id, rule))
        .collect())
}

/// Attaches ordered steps to `rules` with a single query.
async fn with_steps<C: ConnectionTrait>(
    conn: &C,
    rules: Vec<approval_rules::Model>,
) -> Result<Vec<ApprovalRule>, DbErr> {
    if rules.is_empty() {
        return Ok(Vec::new());
    }

    let rule_ids: Vec<Uuid> = rules.iter().map(|r| r.id).collect();
    let mut steps_by_rule: HashMap<Uuid, Vec<approval_steps::Model>> = HashMap::new();
    for step in approval_steps::Entity::find()
        .filter(approval_steps::Column::RuleId.is_in(rule_ids))
        .order_by_asc(approval_steps::Column::Sequence)
        .all(conn)
        .await?
    {
        steps_by_rule.entry(step.rule_id).or_default().push(step);
    }

    Ok(rules
        .into_iter()
        .map(|rule| {
            let steps = steps_by_rule.remove(&rule.id).unwrap_or_default();
            rule_from_models(rule, steps)
        })
        .collect())
}
