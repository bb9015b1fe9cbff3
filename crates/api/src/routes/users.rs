//! User directory routes.

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::{
    AppState,
    error::{app_error_response, error_response, internal_error, user_error_response},
    middleware::CurrentActor,
};
use expensa_core::access::{Capability, UserRole};
use expensa_db::{NewUser, UserRepository};
use expensa_shared::AppError;
use expensa_shared::types::{OrganizationId, UserId};

/// Creates the user routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/organizations/{org_id}/users",
        get(list_users).post(create_user),
    )
}

/// Request body for creating a user.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Role: admin, manager, or employee.
    pub role: String,
    /// Direct manager.
    pub manager_id: Option<UserId>,
}

/// GET /organizations/{org_id}/users - List members.
async fn list_users(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
) -> impl IntoResponse {
    if let Err(response) = actor.require_member(org_id) {
        return response;
    }

    match UserRepository::new((*state.db).clone())
        .list_members(org_id)
        .await
    {
        Ok(users) => (StatusCode::OK, Json(json!({ "data": users }))).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to list users");
            internal_error()
        }
    }
}

/// POST /organizations/{org_id}/users - Create a user.
async fn create_user(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(org_id): Path<OrganizationId>,
    Json(payload): Json<CreateUserRequest>,
) -> impl IntoResponse {
    if let Err(response) = actor.require(org_id, Capability::ManageUsers) {
        return response;
    }

    let Some(role) = UserRole::parse(&payload.role) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "INVALID_ROLE",
            format!("Invalid role: {}", payload.role),
        );
    };

    if payload.username.trim().is_empty() {
        return app_error_response(&AppError::Validation(
            "Username is required".to_string(),
        ));
    }

    let input = NewUser {
        username: payload.username,
        email: payload.email,
        role,
        manager_id: payload.manager_id,
    };

    match UserRepository::new((*state.db).clone())
        .create(org_id, input)
        .await
    {
        Ok(user) => {
            info!(
                org_id = %org_id,
                user_id = %user.id,
                role = %user.role,
                created_by = %actor.id(),
                "User created"
            );
            (StatusCode::CREATED, Json(user)).into_response()
        }
        Err(e) => user_error_response(&e),
    }
}
