pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::guard::require_session;
use crate::session::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    // Views that need a signed-in user
    let protected = Router::new()
        .route(
            "/api/v1/linked-profile",
            post(handlers::handle_connect_profile).delete(handlers::handle_disconnect_profile),
        )
        .route(
            "/api/v1/profile",
            get(handlers::handle_get_profile).patch(handlers::handle_update_profile),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_session));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/session", get(handlers::handle_get_session))
        .route("/api/v1/auth/login", post(handlers::handle_login))
        .route("/api/v1/auth/register", post(handlers::handle_register))
        .route("/api/v1/auth/logout", post(handlers::handle_logout))
        .merge(protected)
        .with_state(state)
}
