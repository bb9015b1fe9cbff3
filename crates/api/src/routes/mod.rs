//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::actor_middleware};

pub mod approval_rules;
pub mod approvals;
pub mod expenses;
pub mod health;
pub mod organizations;
pub mod users;

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    // Routes acting on behalf of an identified user
    let protected_routes = Router::new()
        .merge(organizations::member_routes())
        .merge(users::routes())
        .merge(approval_rules::routes())
        .merge(expenses::routes())
        .merge(approvals::routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            actor_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(organizations::bootstrap_routes())
        .merge(protected_routes)
}
