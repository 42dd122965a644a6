use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{request::Parts, HeaderMap, StatusCode},
    Json,
};

use crate::api::handlers::{store_error_response, AppState, ErrorResponse};
use crate::model::{ActingIdentity, ManagerRef};
use crate::store::Store;

pub const USER_ID_HEADER: &str = "x-user-id";
pub const USER_PASSWORD_HEADER: &str = "x-user-password";

/// The manager a request is made by, verified against the manager store.
///
/// Credentials are read from request headers:
/// - X-User-Id: manager login
/// - X-User-Password: manager password
///
/// Requests without valid credentials are rejected with 401.
#[derive(Debug, Clone)]
pub struct Authenticated {
    pub identity: ActingIdentity,
    /// The verified manager, as new trackers reference it
    pub manager: ManagerRef,
}

#[async_trait]
impl<S> FromRequestParts<AppState<S>> for Authenticated
where
    S: Store + 'static,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState<S>,
    ) -> Result<Self, Self::Rejection> {
        let headers = &parts.headers;

        let (Some(login), Some(password)) = (
            extract_header_value(headers, USER_ID_HEADER),
            extract_header_value(headers, USER_PASSWORD_HEADER),
        ) else {
            return Err(unauthorized("Missing credentials"));
        };

        let manager = state
            .store
            .find_manager_by_name(&login)
            .await
            .map_err(store_error_response)?;

        match manager {
            // Credentials are dropped once verified
            Some(manager) if manager.verify_password(&password) => Ok(Authenticated {
                manager: ManagerRef::from(&manager),
                identity: ActingIdentity::new(manager.name, String::new(), manager.roles),
            }),
            _ => Err(unauthorized("Bad credentials")),
        }
    }
}

fn unauthorized(message: &str) -> (StatusCode, Json<ErrorResponse>) {
    (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message)))
}

/// Extract header value as string
fn extract_header_value(headers: &HeaderMap, header_name: &str) -> Option<String> {
    headers
        .get(header_name)
        .and_then(|value| value.to_str().ok())
        .map(|s| s.to_string())
}
