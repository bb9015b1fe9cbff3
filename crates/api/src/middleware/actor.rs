//! Actor resolution for protected routes.
//!
//! Callers identify themselves with the `X-Actor-Id` header. The middleware
//! loads the matching user and stores it in request extensions; handlers
//! take it with the [`CurrentActor`] extractor and check capabilities and
//! organization membership before calling into the workflow.

use axum::{
    Json,
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use expensa_core::access::Capability;
use expensa_core::workflow::Actor;
use expensa_db::UserRepository;
use expensa_shared::types::{OrganizationId, UserId};
use serde_json::json;
use tracing::error;

use crate::AppState;
use crate::error::{access_error_response, error_response, internal_error};

/// Header carrying the acting user's ID.
pub const ACTOR_HEADER: &str = "x-actor-id";

fn unauthorized(code: &str, message: &str) -> Response {
    error_response(StatusCode::UNAUTHORIZED, code, message)
}

/// Resolves the acting user from the `X-Actor-Id` header.
pub async fn actor_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(ACTOR_HEADER)
        .and_then(|h| h.to_str().ok());

    let Some(header) = header else {
        return unauthorized("MISSING_ACTOR", "X-Actor-Id header is required");
    };

    let Ok(actor_id) = header.trim().parse::<UserId>() else {
        return unauthorized("INVALID_ACTOR", "X-Actor-Id must be a user ID");
    };

    match UserRepository::new((*state.db).clone())
        .find_actor(actor_id)
        .await
    {
        Ok(Some(actor)) => {
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Ok(None) => unauthorized("UNKNOWN_ACTOR", "Unknown or inactive user"),
        Err(e) => {
            error!(error = %e, "Failed to resolve actor");
            internal_error()
        }
    }
}

/// Extractor for the resolved actor.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

impl CurrentActor {
    /// Returns the actor's user ID.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.0.id
    }

    /// Fails with 403 unless the actor belongs to `organization_id`.
    #[allow(clippy::result_large_err)]
    pub fn require_member(&self, organization_id: OrganizationId) -> Result<(), Response> {
        if self.0.belongs_to(organization_id) {
            Ok(())
        } else {
            Err(error_response(
                StatusCode::FORBIDDEN,
                "NOT_A_MEMBER",
                "You are not a member of this organization",
            ))
        }
    }

    /// Fails with 403 unless the actor is a member holding `capability`.
    #[allow(clippy::result_large_err)]
    pub fn require(
        &self,
        organization_id: OrganizationId,
        capability: Capability,
    ) -> Result<(), Response> {
        self.require_member(organization_id)?;
        self.0
            .role
            .require(capability)
            .map_err(|e| access_error_response(&e))
    }
}

impl<S> FromRequestParts<S> for CurrentActor
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .map(CurrentActor)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "UNAUTHORIZED",
                        "message": "Actor required"
                    })),
                )
            })
    }
}

impl IntoResponse for CurrentActor {
    fn into_response(self) -> Response {
        Json(self.0).into_response()
    }
}
