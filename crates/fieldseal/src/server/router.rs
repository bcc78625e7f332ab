//! Axum router construction.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer, trace::TraceLayer};

use super::{handlers, middleware, state::AppState};

/// Build the application [`Router`] with all routes and middleware attached.
///
/// `/fields/*` requires a bearer access token; every other route is public.
pub fn build(state: AppState) -> Router {
    let protected = Router::new()
        .route("/fields/encrypt", post(handlers::encrypt_fields))
        .route("/fields/decrypt", post(handlers::decrypt_fields))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::require_access_token,
        ));

    Router::new()
        .route("/auth/login", post(handlers::login))
        .route("/token/refresh", post(handlers::refresh))
        .route("/token/verify", post(handlers::verify))
        .route("/health", get(handlers::health))
        .merge(protected)
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(middleware::REQUEST_TIMEOUT))
        .layer(CompressionLayer::new())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::state::testing::{self, PASSWORD};
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn post(uri: &str, body: &Value, bearer: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Record-Kind", "savefile");
        if let Some(token) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_returns_404() {
        let app = build(testing::state());
        let req = Request::builder()
            .uri("/unknown")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 404);
    }

    #[tokio::test]
    async fn health_route_exists() {
        let app = build(testing::state());
        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), 200);
    }

    #[tokio::test]
    async fn field_routes_require_bearer_token() {
        let app = build(testing::state());
        let body = json!({"payload": {"datos_savefile": {"nivel": 5}}});
        for uri in ["/fields/encrypt", "/fields/decrypt"] {
            let resp = app.clone().oneshot(post(uri, &body, None)).await.unwrap();
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }

    #[tokio::test]
    async fn login_then_seal_and_open_savefile() {
        let app = build(testing::state());

        let login = json!({"email": "juan@pragma.cl", "password": PASSWORD});
        let resp = app
            .clone()
            .oneshot(post("/auth/login", &login, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let tokens = json_body(resp).await;
        let access = tokens["access"].as_str().unwrap().to_owned();

        let savefile = json!({"nivel": 5, "puntos": 1200, "personaje": "Guerrero"});
        let resp = app
            .clone()
            .oneshot(post(
                "/fields/encrypt",
                &json!({"payload": {"usuario": 1, "datos_savefile": savefile}}),
                Some(&access),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let sealed = json_body(resp).await;
        assert!(sealed["payload"]["datos_savefile"].is_string());

        let resp = app
            .oneshot(post("/fields/decrypt", &sealed, Some(&access)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let opened = json_body(resp).await;
        assert_eq!(opened["payload"]["datos_savefile"], savefile);
        assert_eq!(opened["payload"]["usuario"], 1);
    }
}
