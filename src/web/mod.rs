//! HTTP surface of the lock service
//!
//! Lock outcomes, including refusals such as `Conflict`, travel as
//! `200 OK` with a `{ success, error }` body: they are results, not faults.
//! Only malformed requests and internal failures map to error statuses.

mod handlers;
pub mod seed;

use crate::core::InvError;
use crate::lock::LockService;
use axum::Json;
use axum::Router;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use seed::{Seed, SeedRecord};

/// Header carrying the already-authenticated caller id.
pub const ACTOR_HEADER: &str = "x-actor-id";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LockService>,
}

impl AppState {
    pub fn new(service: Arc<LockService>) -> Self {
        Self { service }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/v1/locks", get(handlers::list_locks))
        .route("/api/v1/locks/acquire", post(handlers::acquire))
        .route("/api/v1/locks/release", post(handlers::release))
        .route("/api/v1/locks/renew", post(handlers::renew))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[derive(Debug)]
pub enum WebError {
    Input(String),
    Internal(String),
}

impl From<InvError> for WebError {
    fn from(err: InvError) -> Self {
        match err {
            InvError::Config(message) => Self::Input(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        let (status, message, code) = match self {
            WebError::Input(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                msg,
                "input_error".to_string(),
            ),
            WebError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                msg,
                "internal_error".to_string(),
            ),
        };

        let body = Json(ErrorResponse {
            error: message,
            code,
        });

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, WebError>;
