use crate::store::{SignalStore, StoreError};
use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use pairline_core::{Signal, SignalDraft, SignalId};
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

/// HTTP surface over a [`SignalStore`], for hosting the mailbox remotely.
///
/// `POST /signals` stores a draft and returns the stored signal,
/// `GET /signals/{to}/{call_id}` lists pending signals oldest-first,
/// `DELETE /signals/{id}` is idempotent and always answers 204 on success.
pub fn router(store: Arc<dyn SignalStore>) -> Router {
    Router::new()
        .route("/signals", post(write_signal))
        .route("/signals/{to}/{call_id}", get(read_pending))
        .route("/signals/{id}", delete(delete_signal))
        .with_state(store)
}

impl IntoResponse for StoreError {
    fn into_response(self) -> Response {
        error!("store request failed: {}", self);
        (StatusCode::INTERNAL_SERVER_ERROR, self.to_string()).into_response()
    }
}

async fn write_signal(
    State(store): State<Arc<dyn SignalStore>>,
    Json(draft): Json<SignalDraft>,
) -> Result<Json<Signal>, StoreError> {
    let signal = store.write(draft).await?;
    Ok(Json(signal))
}

async fn read_pending(
    State(store): State<Arc<dyn SignalStore>>,
    Path((to, call_id)): Path<(String, String)>,
) -> Result<Json<Vec<Signal>>, StoreError> {
    let pending = store.read_pending(&to.into(), &call_id.into()).await?;
    Ok(Json(pending))
}

async fn delete_signal(
    State(store): State<Arc<dyn SignalStore>>,
    Path(id): Path<String>,
) -> Result<StatusCode, Response> {
    let id = Uuid::parse_str(&id)
        .map(SignalId)
        .map_err(|_| (StatusCode::BAD_REQUEST, "malformed signal id").into_response())?;

    store.delete(&id).await.map_err(|e| e.into_response())?;
    Ok(StatusCode::NO_CONTENT)
}
