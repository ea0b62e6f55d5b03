use serde::Serialize;
use tracing::warn;

use crate::errors::AppError;
use crate::models::{ExternalProfile, Identity};

/// Caller-facing result of an auth operation:
/// `{ "success": bool, "message"?: string, ...payload }`.
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub payload: Option<T>,
}

impl<T> AuthOutcome<T> {
    pub fn ok(payload: T) -> Self {
        Self {
            success: true,
            message: None,
            payload: Some(payload),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            payload: None,
        }
    }
}

impl<T> From<Result<T, AppError>> for AuthOutcome<T> {
    fn from(result: Result<T, AppError>) -> Self {
        match result {
            Ok(payload) => Self::ok(payload),
            Err(e) => {
                if matches!(e, AppError::Storage(_) | AppError::Internal(_)) {
                    warn!("Auth operation failed: {e}");
                }
                Self::failed(e.user_message())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct UserPayload {
    pub user: Identity,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProfilePayload {
    pub profile: ExternalProfile,
}
