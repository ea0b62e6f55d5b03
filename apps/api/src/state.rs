use std::sync::Arc;

use crate::session::{AuthService, SessionStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// The one local session. Read by views and the route guard.
    pub session: Arc<SessionStore>,
    /// Auth operations; the only writer of `session`.
    pub auth: Arc<AuthService>,
}
