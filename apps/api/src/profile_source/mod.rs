//! External profile source: where linked professional data comes from.
//!
//! Default: `MockLinkedInSource` (canned payload, no network).
//! A real OAuth exchange implements the same trait and is dropped into
//! `AuthService` without touching handlers or the session store.

mod linkedin;

pub use linkedin::MockLinkedInSource;

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{ExternalProfile, Identity};

/// Carried by `AuthService` as `Arc<dyn ExternalProfileSource>`.
#[async_trait]
pub trait ExternalProfileSource: Send + Sync {
    /// Exchanges an authorization `code` for the profile of `identity`.
    async fn fetch_profile(
        &self,
        code: &str,
        identity: &Identity,
    ) -> Result<ExternalProfile, AppError>;
}
