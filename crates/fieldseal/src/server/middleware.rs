//! Axum middleware applied to the router.
//!
//! Request tracing, timeout enforcement, and response compression are layered
//! in [`super::router`]; bearer-token checks for the field routes live here.

use std::time::Duration;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use common::protocol::ErrorResponse;
use tracing::debug;

use super::state::AppState;
use crate::auth::{TokenError, TokenType};

/// Default per-request timeout applied to all routes.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Reject requests without a valid `Authorization: Bearer <access token>`.
///
/// On success the decoded [`crate::auth::Claims`] are inserted into the request
/// extensions for downstream handlers.
pub async fn require_access_token(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Response {
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return unauthorized("missing bearer token");
    };

    let claims = match state.validator.issuer().verify(token).await {
        Ok(claims) if claims.is_access() => claims,
        Ok(_) => {
            return unauthorized(
                TokenError::WrongType {
                    expected: TokenType::Access,
                }
                .to_string(),
            )
        }
        Err(e) => {
            debug!(error = %e, "bearer token rejected");
            return unauthorized(e.to_string());
        }
    };

    req.extensions_mut().insert(claims);
    next.run(req).await
}

fn unauthorized(message: impl Into<String>) -> Response {
    let err = ErrorResponse::new("unauthorized", message);
    (StatusCode::UNAUTHORIZED, Json(err)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Claims;
    use crate::server::state::testing;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    async fn whoami(Extension(claims): Extension<Claims>) -> String {
        claims.user_id.to_string()
    }

    fn app(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(axum::middleware::from_fn_with_state(
                state.clone(),
                require_access_token,
            ))
            .with_state(state)
    }

    fn request(auth: Option<String>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/whoami");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let resp = app(testing::state()).oneshot(request(None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_bearer_scheme_is_unauthorized() {
        let resp = app(testing::state())
            .oneshot(request(Some("Basic anVhbjpwYXNz".into())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted() {
        let state = testing::state();
        let pair = state.validator.issuer().issue_pair(1).unwrap();
        let resp = app(state)
            .oneshot(request(Some(format!("Bearer {}", pair.refresh))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn access_token_passes_claims_through() {
        let state = testing::state();
        let pair = state.validator.issuer().issue_pair(42).unwrap();
        let resp = app(state)
            .oneshot(request(Some(format!("Bearer {}", pair.access))))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"42");
    }
}
