use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::identity::ProfileUpdate;
use crate::models::{ExternalProfile, Identity};
use crate::session::outcome::{AuthOutcome, ProfilePayload, UserPayload};
use crate::session::store::SessionSnapshot;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub code: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountPayload {
    pub user: Identity,
    pub linked_profile: Option<ExternalProfile>,
}

/// GET /api/v1/session
pub async fn handle_get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.session.snapshot().await)
}

/// POST /api/v1/auth/login
pub async fn handle_login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<AuthOutcome<UserPayload>>, AppError> {
    let user = state.auth.login(&req.email, &req.password).await?;
    Ok(Json(AuthOutcome::ok(UserPayload { user })))
}

/// POST /api/v1/auth/register
pub async fn handle_register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<AuthOutcome<UserPayload>>, AppError> {
    let user = state
        .auth
        .register(&req.first_name, &req.last_name, &req.email, &req.password)
        .await?;
    Ok(Json(AuthOutcome::ok(UserPayload { user })))
}

/// POST /api/v1/auth/logout
pub async fn handle_logout(
    State(state): State<AppState>,
) -> Result<Json<AuthOutcome<()>>, AppError> {
    state.auth.logout().await?;
    Ok(Json(AuthOutcome::ok(())))
}

/// POST /api/v1/linked-profile
pub async fn handle_connect_profile(
    State(state): State<AppState>,
    Json(req): Json<ConnectRequest>,
) -> Result<Json<AuthOutcome<ProfilePayload>>, AppError> {
    let profile = state.auth.connect_external_profile(&req.code).await?;
    Ok(Json(AuthOutcome::ok(ProfilePayload { profile })))
}

/// DELETE /api/v1/linked-profile
pub async fn handle_disconnect_profile(
    State(state): State<AppState>,
) -> Result<Json<AuthOutcome<UserPayload>>, AppError> {
    let user = state.auth.disconnect_external_profile().await?;
    Ok(Json(AuthOutcome::ok(UserPayload { user })))
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
) -> Result<Json<AuthOutcome<AccountPayload>>, AppError> {
    let snapshot = state.session.snapshot().await;
    let user = snapshot.current_identity.ok_or(AppError::Unauthorized)?;
    Ok(Json(AuthOutcome::ok(AccountPayload {
        user,
        linked_profile: snapshot.external_profile,
    })))
}

/// PATCH /api/v1/profile
pub async fn handle_update_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<AuthOutcome<UserPayload>>, AppError> {
    let user = state.auth.update_profile(update).await?;
    Ok(Json(AuthOutcome::ok(UserPayload { user })))
}
