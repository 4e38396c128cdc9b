//! In-memory CRUD services that sit behind the gateway.

pub mod products;
pub mod store;
pub mod users;
pub mod validation;

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::Path;
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde_json::Value;
use tracing::{debug, info};

use crate::error::ServiceError;

pub use store::{Record, RecordStore};

/// Parse a path id; anything non-numeric names no record
fn parse_id<T: Record>(raw: &str) -> Result<u64, ServiceError> {
    raw.parse().map_err(|_| ServiceError::NotFound(T::KIND))
}

/// A body that is not JSON validates like an empty one
fn json_body(payload: Result<Json<Value>, JsonRejection>) -> Value {
    match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            debug!(error = %rejection, "Request body rejected");
            Value::Null
        }
    }
}

/// `GET /`
pub async fn list<T: Record>(Extension(store): Extension<Arc<RecordStore<T>>>) -> Json<Vec<T>> {
    Json(store.list().await)
}

/// `GET /:id`
pub async fn fetch<T: Record>(
    Extension(store): Extension<Arc<RecordStore<T>>>,
    Path(id): Path<String>,
) -> Result<Json<T>, ServiceError> {
    let id = parse_id::<T>(&id)?;
    store
        .get(id)
        .await
        .map(Json)
        .ok_or(ServiceError::NotFound(T::KIND))
}

/// `POST /`
pub async fn create<T: Record>(
    Extension(store): Extension<Arc<RecordStore<T>>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<T>), ServiceError> {
    let draft = T::parse_draft(&json_body(payload)).map_err(ServiceError::Validation)?;
    let record = store.insert(draft).await;

    info!(kind = T::KIND, id = record.id(), "Record created");
    Ok((StatusCode::CREATED, Json(record)))
}

/// `PUT /:id`
pub async fn update<T: Record>(
    Extension(store): Extension<Arc<RecordStore<T>>>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<T>, ServiceError> {
    let id = parse_id::<T>(&id)?;
    let patch = T::parse_patch(&json_body(payload)).map_err(ServiceError::Validation)?;

    let record = store
        .update(id, patch)
        .await
        .ok_or(ServiceError::NotFound(T::KIND))?;

    info!(kind = T::KIND, id, "Record updated");
    Ok(Json(record))
}

/// `DELETE /:id`
pub async fn remove<T: Record>(
    Extension(store): Extension<Arc<RecordStore<T>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    let id = parse_id::<T>(&id)?;
    if !store.remove(id).await {
        return Err(ServiceError::NotFound(T::KIND));
    }

    info!(kind = T::KIND, id, "Record deleted");
    Ok(StatusCode::NO_CONTENT)
}
