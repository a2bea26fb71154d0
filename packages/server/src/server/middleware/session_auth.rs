use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::UserId;
use crate::kernel::BaseAuthService;
use crate::server::error::ApiError;

/// Authenticated user resolved from a bearer access token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: UserId,
    pub email: Option<String>,
    pub access_token: String,
}

/// Session authentication middleware
///
/// Resolves the bearer token through the auth service and adds AuthUser to
/// request extensions. Requests without a valid session continue without
/// one; handlers that need a user extract `AuthUser`, which rejects with 401.
pub async fn session_auth_middleware(
    auth: Arc<dyn BaseAuthService>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = bearer_token(&request) {
        match auth.get_user(&token).await {
            Ok(Some(user)) => {
                debug!(user_id = %user.id, "Authenticated session");
                request.extensions_mut().insert(AuthUser {
                    user_id: user.id,
                    email: user.email,
                    access_token: token,
                });
            }
            Ok(None) => debug!("Invalid or expired session token"),
            Err(e) => warn!(error = %e, "Failed to resolve session token"),
        }
    }

    next.run(request).await
}

fn bearer_token(request: &Request) -> Option<String> {
    let header = request.headers().get("authorization")?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ").unwrap_or(header).trim();
    (!token.is_empty()).then(|| token.to_string())
}

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_bearer_prefix_is_optional() {
        let request = Request::builder()
            .header("authorization", "Bearer abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("abc"));

        let request = Request::builder()
            .header("authorization", "abc")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_or_blank_header() {
        let request = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(bearer_token(&request), None);

        let request = Request::builder()
            .header("authorization", "Bearer ")
            .body(Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), None);
    }
}
