use super::{ACTOR_HEADER, AppState, Result, WebError};
use crate::auth::AuthContext;
use crate::core::{LeaseKey, LeaseView};
use crate::lock::LockResponse;
use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use serde_json::{Value, json};

pub(super) async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub(super) async fn list_locks(State(state): State<AppState>) -> Json<Vec<LeaseView>> {
    Json(state.service.active_leases().await)
}

pub(super) async fn acquire(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(key): Json<LeaseKey>,
) -> Result<Json<LockResponse>> {
    validate_key(&key)?;
    let auth = caller(&state, &headers).await;
    Ok(Json(state.service.acquire(&auth, &key).await.into()))
}

pub(super) async fn release(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(key): Json<LeaseKey>,
) -> Result<Json<LockResponse>> {
    validate_key(&key)?;
    let auth = caller(&state, &headers).await;
    Ok(Json(state.service.release(&auth, &key).await.into()))
}

pub(super) async fn renew(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(key): Json<LeaseKey>,
) -> Result<Json<LockResponse>> {
    validate_key(&key)?;
    let auth = caller(&state, &headers).await;
    Ok(Json(state.service.renew(&auth, &key).await.into()))
}

async fn caller(state: &AppState, headers: &HeaderMap) -> AuthContext {
    let raw = headers.get(ACTOR_HEADER).and_then(|value| value.to_str().ok());
    state.service.directory().authenticate(raw).await
}

fn validate_key(key: &LeaseKey) -> Result<()> {
    if key.record_id().as_str().trim().is_empty() {
        return Err(WebError::Input("recordId must not be empty".to_string()));
    }
    if key.field_id().is_some_and(|field| field.as_str().trim().is_empty()) {
        return Err(WebError::Input("fieldId must not be empty".to_string()));
    }
    Ok(())
}
