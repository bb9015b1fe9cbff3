//! Organization repository for database operations.

use expensa_core::access::UserRole;
use expensa_core::workflow::Actor;
use expensa_shared::types::OrganizationId;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set, TransactionTrait};
use uuid::Uuid;

use crate::entities::organizations;

use super::user::{NewUser, UserError, insert_user};

/// Input for bootstrapping an organization.
#[derive(Debug, Clone)]
pub struct NewOrganization {
    /// Display name.
    pub name: String,
    /// Country of registration.
    pub country: String,
    /// Company currency (ISO 4217).
    pub currency: String,
}

/// Organization repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct OrganizationRepository {
    db: DatabaseConnection,
}

impl OrganizationRepository {
    /// Creates a new organization repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds an organization by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(
        &self,
        id: OrganizationId,
    ) -> Result<Option<organizations::Model>, DbErr> {
        organizations::Entity::find_by_id(Uuid::from(id))
            .one(&self.db)
            .await
    }

    /// Creates an organization together with its first admin.
    ///
    /// # Errors
    ///
    /// Returns an error if either insert fails; nothing is kept in that case.
    pub async fn create_with_admin(
        &self,
        input: NewOrganization,
        admin_username: &str,
        admin_email: &str,
    ) -> Result<(organizations::Model, Actor), UserError> {
        let txn = self.db.begin().await?;

        let now = chrono::Utc::now().into();
        let org_id = OrganizationId::new();

        let org = organizations::ActiveModel {
            id: Set(Uuid::from(org_id)),
            name: Set(input.name.trim().to_string()),
            country: Set(input.country.trim().to_string()),
            currency: Set(input.currency.trim().to_uppercase()),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let org = org.insert(&txn).await?;

        let admin = insert_user(
            &txn,
            Some(org_id),
            NewUser {
                username: admin_username.to_string(),
                email: admin_email.to_string(),
                role: UserRole::Admin,
                manager_id: None,
            },
        )
        .await?;

        txn.commit().await?;

        tracing::info!(organization_id = %org_id, admin_id = %admin.id, "Organization created");
        Ok((org, admin))
    }
}
