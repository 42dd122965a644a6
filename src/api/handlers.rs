use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use log::error;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::auth_extractor::Authenticated;
use crate::api::events::{TrackerEventKind, TrackerEvents};
use crate::model::{
    Id, Manager, NewTracker, Page, PageLinks, PageRequest, Tracker, TrackerChanges,
};
use crate::store::{Store, StoreError};

pub const TRACKERS_PATH: &str = "/api/trackers";

/// Shared handler state: the store and the change-event fan-out
pub struct AppState<S: ?Sized> {
    pub store: Arc<S>,
    pub events: TrackerEvents,
}

impl<S: ?Sized> AppState<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            events: TrackerEvents::new(),
        }
    }
}

impl<S: ?Sized> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            events: self.events.clone(),
        }
    }
}

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

/// Body of tracker create and update requests. The owner is always the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackerPayload {
    pub customer_name: String,
    pub product_name: String,
    pub current_status: String,
}

impl From<TrackerPayload> for TrackerChanges {
    fn from(payload: TrackerPayload) -> Self {
        Self {
            customer_name: payload.customer_name,
            product_name: payload.product_name,
            current_status: payload.current_status,
        }
    }
}

/// Map a store failure onto an HTTP status
pub fn store_error_response(err: StoreError) -> ApiError {
    let status = match &err {
        StoreError::DuplicateManager(_) => StatusCode::CONFLICT,
        StoreError::ManagerNotFound(_) | StoreError::TrackerNotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Forbidden { .. } => StatusCode::FORBIDDEN,
        StoreError::Unauthenticated => StatusCode::UNAUTHORIZED,
        StoreError::VersionConflict { .. } => StatusCode::PRECONDITION_FAILED,
        StoreError::Database(_) => {
            error!("Store failure: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(&err.to_string())))
}

/// Parse an `If-Match` header into the expected tracker version.
/// `*` and a missing header mean "any version".
pub fn expected_version(headers: &HeaderMap) -> Result<Option<i64>, ApiError> {
    let Some(value) = headers.get(header::IF_MATCH) else {
        return Ok(None);
    };

    let raw = value.to_str().unwrap_or_default().trim();
    if raw == "*" {
        return Ok(None);
    }

    raw.trim_start_matches("W/")
        .trim_matches('"')
        .parse::<i64>()
        .map(Some)
        .map_err(|_| {
            (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new("If-Match must carry a tracker version")),
            )
        })
}

fn with_etag(status: StatusCode, tracker: Tracker) -> Response {
    let mut response = (status, Json(&tracker)).into_response();
    if let Ok(etag) = HeaderValue::from_str(&tracker.etag()) {
        response.headers_mut().insert(header::ETAG, etag);
    }
    response
}

/// A page of results with first/prev/next/last navigation
#[derive(Debug, Serialize)]
pub struct PagedResponse<T> {
    #[serde(flatten)]
    pub page: Page<T>,
    pub links: PageLinks,
}

/// GET /api/managers
pub async fn list_managers<S: Store>(
    State(state): State<AppState<S>>,
) -> Result<Json<Vec<Manager>>, ApiError> {
    state
        .store
        .list_managers()
        .await
        .map(Json)
        .map_err(store_error_response)
}

/// GET /api/trackers?page=0&size=20
pub async fn list_trackers<S: Store>(
    State(state): State<AppState<S>>,
    Query(request): Query<PageRequest>,
) -> Result<Json<PagedResponse<Tracker>>, ApiError> {
    let page = state
        .store
        .list_trackers(request)
        .await
        .map_err(store_error_response)?;

    let links = page.links(TRACKERS_PATH);
    Ok(Json(PagedResponse { page, links }))
}

/// GET /api/trackers/{id}
pub async fn get_tracker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
) -> Result<Response, ApiError> {
    match state.store.find_tracker(id).await {
        Ok(Some(tracker)) => Ok(with_etag(StatusCode::OK, tracker)),
        Ok(None) => Err(store_error_response(StoreError::TrackerNotFound(id))),
        Err(e) => Err(store_error_response(e)),
    }
}

/// POST /api/trackers
/// Create a tracker owned by the calling manager
pub async fn create_tracker<S: Store>(
    State(state): State<AppState<S>>,
    Authenticated { identity, manager }: Authenticated,
    Json(payload): Json<TrackerPayload>,
) -> Result<Response, ApiError> {
    let tracker = NewTracker::new(
        manager,
        payload.customer_name,
        payload.product_name,
        payload.current_status,
    );

    let saved = state
        .store
        .save_tracker(&identity, tracker)
        .await
        .map_err(store_error_response)?;

    state.events.publish(TrackerEventKind::NewTracker, saved.id);
    Ok(with_etag(StatusCode::CREATED, saved))
}

/// PUT /api/trackers/{id}
/// Only the owner may update; a stale If-Match yields 412
pub async fn update_tracker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    Authenticated { identity, .. }: Authenticated,
    headers: HeaderMap,
    Json(payload): Json<TrackerPayload>,
) -> Result<Response, ApiError> {
    let expected = expected_version(&headers)?;

    let updated = state
        .store
        .update_tracker(&identity, id, expected, payload.into())
        .await
        .map_err(store_error_response)?;

    state.events.publish(TrackerEventKind::UpdateTracker, updated.id);
    Ok(with_etag(StatusCode::OK, updated))
}

/// DELETE /api/trackers/{id}
pub async fn delete_tracker<S: Store>(
    State(state): State<AppState<S>>,
    Path(id): Path<Id>,
    Authenticated { identity, .. }: Authenticated,
) -> Result<StatusCode, ApiError> {
    state
        .store
        .delete_tracker(&identity, id)
        .await
        .map_err(store_error_response)?;

    state.events.publish(TrackerEventKind::DeleteTracker, id);
    Ok(StatusCode::NO_CONTENT)
}
