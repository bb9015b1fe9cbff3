//! Organization routes.
//!
//! Creating an organization is the bootstrap step: it needs no actor and
//! yields the first admin, whose ID is then used as `X-Actor-Id`.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    AppState,
    error::{app_error_response, error_response, internal_error, user_error_response},
    middleware::CurrentActor,
};
use expensa_db::{NewOrganization, OrganizationRepository, entities::organizations};
use expensa_shared::AppError;
use expensa_shared::types::OrganizationId;

/// Routes that need no actor.
pub fn bootstrap_routes() -> Router<AppState> {
    Router::new().route("/organizations", post(create_organization))
}

/// Routes for organization members.
pub fn member_routes() -> Router<AppState> {
    Router::new().route("/organizations/{org_id}", get(get_organization))
}

/// Request body for creating an organization.
#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    /// Display name.
    pub name: String,
    /// Country of registration.
    pub country: String,
    /// Company currency (ISO 4217).
    pub currency: String,
    /// Username of the first admin.
    pub admin_username: String,
    /// Email of the first admin.
    pub admin_email: String,
}

fn organization_json(org: &organizations::Model) -> serde_json::Value {
    json!({
        "id": org.id,
        "name": org.name,
        "country": org.country,
        "currency": org.currency,
        "created_at": org.created_at
    })
}

/// Returns true for a three-letter alphabetic currency code.
pub(crate) fn is_currency_code(code: &str) -> bool {
    let code = code.trim();
    code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic())
}

/// POST /organizations - Create an organization and its first admin.
async fn create_organization(
    State(state): State<AppState>,
    Json(payload): Json<CreateOrganizationRequest>,
) -> impl IntoResponse {
    if payload.name.trim().is_empty() || payload.admin_username.trim().is_empty() {
        return app_error_response(&AppError::Validation(
            "Organization name and admin username are required".to_string(),
        ));
    }
    if !is_currency_code(&payload.currency) {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_CURRENCY",
            "Currency must be a three-letter ISO 4217 code",
        );
    }

    let repo = OrganizationRepository::new((*state.db).clone());
    let input = NewOrganization {
        name: payload.name,
        country: payload.country,
        currency: payload.currency,
    };

    match repo
        .create_with_admin(input, &payload.admin_username, &payload.admin_email)
        .await
    {
        Ok((org, admin)) => {
            info!(org_id = %org.id, admin_id = %admin.id, "Organization bootstrapped");
            (
                StatusCode::CREATED,
                Json(json!({
                    "organization": organization_json(&org),
                    "admin": admin
                })),
            )
                .into_response()
        }
        Err(e) => user_error_response(&e),
    }
}

/// GET /organizations/{org_id} - Get organization details.
async fn get_organization(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
) -> impl IntoResponse {
    if let Err(response) = actor.require_member(org_id) {
        return response;
    }

    match OrganizationRepository::new((*state.db).clone())
        .find_by_id(org_id)
        .await
    {
        Ok(Some(org)) => (StatusCode::OK, Json(organization_json(&org))).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            "ORGANIZATION_NOT_FOUND",
            "Organization not found",
        ),
        Err(e) => {
            error!(error = %e, "Failed to load organization");
            internal_error()
        }
    }
}
