//! Auth Operations. Every mutation of the session goes through here.
//!
//! Operations are single-flight: while one is running (including its
//! simulated latency) any other call is rejected with `AppError::Busy`.
//! The session reports `is_loading` for the whole duration.
//!
//! NOTE: the credential check is a fixed demo pair with no hashing, no
//! uniqueness on registration and no lockout. Replace with a real backend
//! before handling real accounts.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::identity::ProfileUpdate;
use crate::models::{ExternalProfile, Identity};
use crate::profile_source::ExternalProfileSource;
use crate::session::store::SessionStore;
use crate::session::validation::{validate_profile_update, validate_registration};

pub const DEMO_EMAIL: &str = "demo@example.com";
pub const DEMO_PASSWORD: &str = "password";
const DEMO_USER_ID: &str = "user123";

/// Artificial delay applied to each operation before it runs.
/// `Default` is no delay at all.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Latency {
    pub login: Duration,
    pub register: Duration,
    pub logout: Duration,
    pub connect: Duration,
    pub disconnect: Duration,
    pub update_profile: Duration,
}

impl Latency {
    /// Delays of the hosted demo.
    pub fn simulated() -> Self {
        Self {
            login: Duration::from_millis(800),
            register: Duration::from_millis(1000),
            logout: Duration::from_millis(500),
            connect: Duration::from_millis(1200),
            disconnect: Duration::from_millis(800),
            update_profile: Duration::from_millis(1000),
        }
    }
}

/// Held for the lifetime of one operation. Dropping it clears the
/// session's loading flag and releases the single-flight lock.
struct InFlight<'a> {
    session: &'a SessionStore,
    _lock: MutexGuard<'a, ()>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.session.set_loading(false);
    }
}

pub struct AuthService {
    session: Arc<SessionStore>,
    profile_source: Arc<dyn ExternalProfileSource>,
    latency: Latency,
    in_flight: Mutex<()>,
}

impl AuthService {
    pub fn new(
        session: Arc<SessionStore>,
        profile_source: Arc<dyn ExternalProfileSource>,
        latency: Latency,
    ) -> Self {
        Self {
            session,
            profile_source,
            latency,
            in_flight: Mutex::new(()),
        }
    }

    #[cfg(test)]
    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    async fn begin(&self, op: &str, delay: Duration) -> Result<InFlight<'_>, AppError> {
        let lock = self.in_flight.try_lock().map_err(|_| {
            warn!("Rejected {op}: another session operation is in progress");
            AppError::Busy
        })?;
        self.session.set_loading(true);
        let guard = InFlight {
            session: &self.session,
            _lock: lock,
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok(guard)
    }

    async fn finish<T>(&self, op: &str, result: Result<T, AppError>) -> Result<T, AppError> {
        if let Err(e) = &result {
            warn!("{op} failed: {e}");
            self.session.set_last_error(Some(e.user_message())).await;
        }
        result
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let _op = self.begin("login", self.latency.login).await?;
        self.session.set_last_error(None).await;
        let result = self.try_login(email, password).await;
        self.finish("login", result).await
    }

    async fn try_login(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        if email != DEMO_EMAIL || password != DEMO_PASSWORD {
            return Err(AppError::InvalidCredentials);
        }
        let identity = Identity::new(DEMO_USER_ID, DEMO_EMAIL, "Demo", "User");
        self.session.begin_session(identity.clone()).await?;
        info!("Signed in {}", identity.email);
        Ok(identity)
    }

    /// Creates a fresh identity. There is no registry, so the same email
    /// may be registered any number of times.
    pub async fn register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        let _op = self.begin("register", self.latency.register).await?;
        self.session.set_last_error(None).await;
        let result = self
            .try_register(first_name, last_name, email, password)
            .await;
        self.finish("register", result).await
    }

    async fn try_register(
        &self,
        first_name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AppError> {
        validate_registration(first_name, last_name, email, password)?;
        // v7 ids are ordered by creation time
        let id = format!("user{}", Uuid::now_v7().simple());
        let identity = Identity::new(id, email.trim(), first_name.trim(), last_name.trim());
        self.session.begin_session(identity.clone()).await?;
        info!("Registered {} <{}> as {}", identity.display_name(), identity.email, identity.id);
        Ok(identity)
    }

    pub async fn logout(&self) -> Result<(), AppError> {
        let _op = self.begin("logout", self.latency.logout).await?;
        let result = self.session.end_session().await.map_err(AppError::from);
        if result.is_ok() {
            info!("Signed out");
        }
        self.finish("logout", result).await
    }

    /// `code` is handed to the profile source untouched; the demo source
    /// ignores it.
    pub async fn connect_external_profile(&self, code: &str) -> Result<ExternalProfile, AppError> {
        let _op = self.begin("connect", self.latency.connect).await?;
        let result = self.try_connect(code).await;
        self.finish("connect", result).await
    }

    async fn try_connect(&self, code: &str) -> Result<ExternalProfile, AppError> {
        let identity = self
            .session
            .current_identity()
            .await
            .ok_or_else(|| AppError::validation("No signed-in user to link a profile to"))?;
        let profile = self.profile_source.fetch_profile(code, &identity).await?;
        let profile = self.session.link_profile(profile).await?;
        info!(
            "Linked profile {} to {} (current position: {})",
            profile.id,
            identity.id,
            profile
                .current_position()
                .map(|w| w.title.as_str())
                .unwrap_or("none")
        );
        Ok(profile)
    }

    pub async fn disconnect_external_profile(&self) -> Result<Identity, AppError> {
        let _op = self.begin("disconnect", self.latency.disconnect).await?;
        let result = self.session.unlink_profile().await;
        if let Ok(identity) = &result {
            info!("Unlinked profile from {}", identity.id);
        }
        self.finish("disconnect", result).await
    }

    pub async fn update_profile(&self, update: ProfileUpdate) -> Result<Identity, AppError> {
        let _op = self
            .begin("update_profile", self.latency.update_profile)
            .await?;
        let result = match validate_profile_update(&update) {
            Ok(()) => self.session.update_identity(update).await,
            Err(e) => Err(e),
        };
        if let Ok(identity) = &result {
            info!("Updated profile for {}", identity.id);
        }
        self.finish("update_profile", result).await
    }
}
