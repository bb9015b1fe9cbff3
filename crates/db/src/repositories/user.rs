//! User repository: the actor directory.
//!
//! Resolves organization membership, roles, and manager links for the
//! workflow engine and the API layer.

use expensa_core::access::{Capability, UserRole};
use expensa_core::workflow::Actor;
use expensa_shared::types::{OrganizationId, UserId};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set, SqlErr,
};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::users;

use super::convert::{actor_from_model, role_to_core, role_to_db};

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    /// User not found.
    #[error("User {0} not found")]
    NotFound(UserId),

    /// Username already in use.
    #[error("Username '{0}' is already taken")]
    UsernameTaken(String),

    /// The manager does not belong to the user's organization.
    #[error("Manager {0} is not a member of this organization")]
    ManagerNotInOrganization(UserId),

    /// The manager's role may not decide on expenses.
    #[error("User {0} cannot approve expenses and so cannot be a manager")]
    ManagerCannotApprove(UserId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl UserError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::UsernameTaken(_) => 409,
            Self::ManagerNotInOrganization(_) | Self::ManagerCannotApprove(_) => 422,
            Self::Database(_) => 500,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "USER_NOT_FOUND",
            Self::UsernameTaken(_) => "USERNAME_TAKEN",
            Self::ManagerNotInOrganization(_) => "MANAGER_NOT_IN_ORGANIZATION",
            Self::ManagerCannotApprove(_) => "MANAGER_CANNOT_APPROVE",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }
}

/// Input for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login name (unique).
    pub username: String,
    /// Email address.
    pub email: String,
    /// Role in the organization.
    pub role: UserRole,
    /// Direct manager.
    pub manager_id: Option<UserId>,
}

/// User repository for the actor directory.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an actor by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_actor(&self, id: UserId) -> Result<Option<Actor>, DbErr> {
        let user = users::Entity::find_by_id(Uuid::from(id))
            .filter(users::Column::IsActive.eq(true))
            .one(&self.db)
            .await?;

        Ok(user.map(actor_from_model))
    }

    /// Creates a user inside an organization.
    ///
    /// # Errors
    ///
    /// Returns `ManagerNotInOrganization` if the manager belongs elsewhere,
    /// `ManagerCannotApprove` if the manager's role cannot decide on
    /// expenses, `UsernameTaken` on a duplicate username.
    pub async fn create(
        &self,
        organization_id: OrganizationId,
        input: NewUser,
    ) -> Result<Actor, UserError> {
        insert_user(&self.db, Some(organization_id), input).await
    }

    /// Lists the active members of an organization ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_members(&self, organization_id: OrganizationId) -> Result<Vec<Actor>, DbErr> {
        let users = users::Entity::find()
            .filter(users::Column::OrganizationId.eq(Uuid::from(organization_id)))
            .filter(users::Column::IsActive.eq(true))
            .order_by_asc(users::Column::Username)
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(actor_from_model).collect())
    }

    /// IDs of the users reporting directly to `manager_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn team_member_ids(&self, manager_id: UserId) -> Result<Vec<UserId>, DbErr> {
        let users = users::Entity::find()
            .filter(users::Column::ManagerId.eq(Uuid::from(manager_id)))
            .all(&self.db)
            .await?;

        Ok(users.into_iter().map(|u| UserId::from(u.id)).collect())
    }
}

/// Inserts a user on any connection, including an open transaction.
pub(crate) async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    organization_id: Option<OrganizationId>,
    input: NewUser,
) -> Result<Actor, UserError> {
    if let Some(manager_id) = input.manager_id {
        let manager = users::Entity::find_by_id(Uuid::from(manager_id))
            .one(conn)
            .await?
            .ok_or(UserError::NotFound(manager_id))?;
        check_manager(manager_id, &manager, organization_id)?;
    }

    let now = chrono::Utc::now().into();
    let username = input.username.trim().to_string();
    let user = users::ActiveModel {
        id: Set(Uuid::from(UserId::new())),
        organization_id: Set(organization_id.map(Uuid::from)),
        username: Set(username.clone()),
        email: Set(input.email.trim().to_string()),
        role: Set(role_to_db(input.role)),
        manager_id: Set(input.manager_id.map(Uuid::from)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };

    let created = user.insert(conn).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => UserError::UsernameTaken(username),
        _ => UserError::Database(e),
    })?;

    Ok(actor_from_model(created))
}

/// A manager must share the organization and be able to approve.
fn check_manager(
    manager_id: UserId,
    manager: &users::Model,
    organization_id: Option<OrganizationId>,
) -> Result<(), UserError> {
    if manager.organization_id != organization_id.map(Uuid::from) {
        return Err(UserError::ManagerNotInOrganization(manager_id));
    }
    if !role_to_core(manager.role).can(Capability::DecideApprovals) {
        return Err(UserError::ManagerCannotApprove(manager_id));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::sea_orm_active_enums::UserRole as DbRole;

    fn user(organization_id: OrganizationId, role: DbRole) -> users::Model {
        let now = chrono::Utc::now().into();
        users::Model {
            id: Uuid::from(UserId::new()),
            organization_id: Some(Uuid::from(organization_id)),
            username: "mia".to_string(),
            email: "mia@example.com".to_string(),
            role,
            manager_id: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_manager_must_be_able_to_approve() {
        let org = OrganizationId::new();
        let id = UserId::new();

        assert!(check_manager(id, &user(org, DbRole::Manager), Some(org)).is_ok());
        assert!(check_manager(id, &user(org, DbRole::Admin), Some(org)).is_ok());

        let err = check_manager(id, &user(org, DbRole::Employee), Some(org)).unwrap_err();
        assert!(matches!(err, UserError::ManagerCannotApprove(u) if u == id));
        assert_eq!(err.status_code(), 422);
        assert_eq!(err.error_code(), "MANAGER_CANNOT_APPROVE");
    }

    #[test]
    fn test_manager_from_other_organization() {
        let manager = user(OrganizationId::new(), DbRole::Manager);
        let err =
            check_manager(UserId::new(), &manager, Some(OrganizationId::new())).unwrap_err();
        assert!(matches!(err, UserError::ManagerNotInOrganization(_)));
    }

    #[test]
    fn test_user_error_codes() {
        let taken = UserError::UsernameTaken("ana".into());
        assert_eq!(taken.status_code(), 409);
        assert_eq!(taken.error_code(), "USERNAME_TAKEN");

        let foreign = UserError::ManagerNotInOrganization(UserId::new());
        assert_eq!(foreign.status_code(), 422);

        let missing = UserError::NotFound(UserId::new());
        assert_eq!(missing.status_code(), 404);
        assert!(missing.to_string().contains("not found"));
    }
}
