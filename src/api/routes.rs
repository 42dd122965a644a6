use axum::{routing::get, Router};
use tower_http::services::ServeDir;

use crate::api::{events, handlers, handlers::AppState};
use crate::store::Store;

pub fn create_router<S: Store + 'static>() -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Managers (read-only; created at startup)
        .route("/api/managers", get(handlers::list_managers::<S>))
        // Trackers
        .route(
            "/api/trackers",
            get(handlers::list_trackers::<S>).post(handlers::create_tracker::<S>),
        )
        .route(
            "/api/trackers/:id",
            get(handlers::get_tracker::<S>)
                .put(handlers::update_tracker::<S>)
                .delete(handlers::delete_tracker::<S>),
        )
        // Change notifications for tracker writes
        .route("/api/events", get(events::tracker_events::<S>))
}

/// Router with state attached and, when configured, the front-end served
/// from `static_dir` for every unmatched path
pub fn create_app<S: Store + 'static>(state: AppState<S>, static_dir: Option<&str>) -> Router {
    let router = create_router::<S>();
    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };
    router.with_state(state)
}
