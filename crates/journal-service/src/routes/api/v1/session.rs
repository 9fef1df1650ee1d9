use axum::{
    extract::{Json, State},
    response::Json as ResponseJson,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};

use crate::AppState;
use crate::auth::{session_cookie, session_removal};
use crate::errors::ApiError;

#[derive(Debug, Deserialize)]
pub(super) struct LoginRequest {
    #[serde(default)]
    password: String,
}

#[instrument(skip_all)]
pub(super) async fn login<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, ResponseJson<Value>), ApiError> {
    let config = state.config();
    let Some(password) = config.auth.admin_password.as_deref() else {
        return Err(ApiError::NotConfigured("ADMIN_PASSWORD"));
    };

    if payload.password != password {
        warn!("Rejected login attempt");
        return Err(ApiError::InvalidPassword);
    }

    info!("Admin logged in");
    Ok((jar.add(session_cookie(config)), ResponseJson(json!({ "ok": true }))))
}

#[instrument(skip_all)]
pub(super) async fn logout<S: AppState>(
    State(state): State<S>,
    jar: CookieJar,
) -> (CookieJar, ResponseJson<Value>) {
    (
        jar.remove(session_removal(state.config())),
        ResponseJson(json!({ "ok": true })),
    )
}
