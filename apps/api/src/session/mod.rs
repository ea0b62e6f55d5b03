pub mod auth;
pub mod handlers;
pub mod outcome;
pub mod store;
pub mod validation;

pub use auth::{AuthService, Latency};
pub use store::SessionStore;
