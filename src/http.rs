//! HTTP surface over an injected [`CounterStore`].
//!
//! ```text
//! GET   /balance/{userId}             -> {"status":"success","data":{...}}
//! PATCH /balance/{userId}  delta=-10  -> "success"
//! ```
//!
//! Store results map to status codes: `NotFound` is 404, `Internal` is 500
//! with the backend's message. A missing or unparsable `delta` is a 400, as is
//! a body that is not `application/x-www-form-urlencoded`.

use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Json, Router};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::dto::BalanceRecord;
use crate::error::Error;
use crate::stores::CounterStore;

pub type SharedStore = Arc<dyn CounterStore>;

const GREETING: &str = "Hello! Try GET, PATCH /balance/:userId queries instead!";

pub fn router(store: SharedStore) -> Router {
    Router::new()
        .route("/", get(greeting))
        .route("/balance/:user_id", get(get_balance).patch(patch_balance))
        .with_state(store)
}

#[derive(Debug, Serialize)]
struct BalanceBody {
    status: &'static str,
    data: BalanceRecord,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

#[derive(Debug, Deserialize)]
pub struct DeltaForm {
    delta: Option<String>,
}

#[derive(Debug)]
pub enum ApiError {
    Store(Error),
    InvalidDelta(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::Store(err)
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::InvalidDelta(format!("invalid delta: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Store(Error::NotFound) => {
                (StatusCode::NOT_FOUND, "User not found!".to_owned())
            }
            ApiError::Store(err @ Error::Internal(_)) => {
                error!(error = %err, "store call failed");
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::InvalidDelta(message) => (StatusCode::BAD_REQUEST, message),
        };
        let body = ErrorBody {
            status: "error",
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// Parses the signed base-10 `delta` form field.
fn parse_delta(raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw.ok_or_else(|| ApiError::InvalidDelta("invalid delta: missing".into()))?;
    raw.parse::<i64>()
        .map_err(|e| ApiError::InvalidDelta(format!("invalid delta {raw:?}: {e}")))
}

async fn greeting() -> &'static str {
    GREETING
}

async fn get_balance(
    State(store): State<SharedStore>,
    Path(user_id): Path<String>,
) -> Result<Json<BalanceBody>, ApiError> {
    let record = store.get(&user_id).await?;
    Ok(Json(BalanceBody {
        status: "success",
        data: record,
    }))
}

async fn patch_balance(
    State(store): State<SharedStore>,
    Path(user_id): Path<String>,
    form: Result<Form<DeltaForm>, FormRejection>,
) -> Result<&'static str, ApiError> {
    let Form(form) = form?;
    let delta = parse_delta(form.delta.as_deref())?;
    store.apply_delta(&user_id, delta).await?;
    Ok("success")
}
