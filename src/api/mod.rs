mod auth;
mod dashboard;
pub mod error;
mod profile;
mod recordings;
mod reports;
mod users;
mod validation;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::auth::csrf_middleware;
use crate::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Auth routes (public; a login carries no session yet, so no CSRF)
    let auth_routes = Router::new().route("/login", post(auth::login));

    // Protected API routes. Guard order: the Identity extractor authenticates,
    // handlers apply role/ownership guards, and the CSRF middleware checks
    // state-changing submissions before any of them run.
    let api_routes = Router::new()
        // Session
        .route("/auth/logout", post(auth::logout))
        .route("/auth/session", get(auth::session))
        // Dashboard
        .route("/dashboard", get(dashboard::stats))
        // Recordings
        .route("/recordings", get(recordings::list_recordings))
        .route(
            "/recordings",
            post(recordings::upload_recording).layer(DefaultBodyLimit::max(
                state.config.uploads.max_upload_bytes() as usize + 64 * 1024,
            )),
        )
        .route("/recordings/:id", get(recordings::get_recording))
        .route("/recordings/:id", delete(recordings::delete_recording))
        // Reports
        .route("/reports", get(reports::list_reports))
        .route("/reports/:id", get(reports::get_report))
        // Own profile
        .route("/profile", get(profile::get_profile))
        .route("/profile", put(profile::update_profile))
        .route("/profile/password", post(profile::change_password))
        // User management
        .route("/users", get(users::list_users))
        .route("/users", post(users::create_user))
        .route("/users/:id", put(users::update_user))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            csrf_middleware,
        ));

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api", api_routes)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{self, CSRF_HEADER, SESSION_COOKIE};
    use crate::config::Config;
    use crate::db::{self, CreateUserRequest, Role};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    /// Router with one logged-in user; returns the raw session token and the
    /// session's CSRF token.
    async fn test_app() -> (Router, String, String) {
        let pool = db::init_in_memory().await.unwrap();
        let req = CreateUserRequest {
            username: "alice".to_string(),
            email: "alice@example.com".to_string(),
            password: "hunter22".to_string(),
            role: Role::User,
            first_name: "Alice".to_string(),
            last_name: "Ngo".to_string(),
            department: "Ops".to_string(),
        };
        let hash = auth::hash_password("hunter22").unwrap();
        db::create_user(&pool, "u1", &req, &hash).await.unwrap();
        let user = db::get_user_by_id(&pool, "u1").await.unwrap().unwrap();
        let (token, session) = auth::create_session(&pool, &user, 24).await.unwrap();

        let state = Arc::new(crate::AppState::new(Config::default(), pool));
        (create_router(state), token, session.csrf_token)
    }

    fn request(method: &str, uri: &str, session: &str, csrf: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::COOKIE, format!("{SESSION_COOKIE}={session}"));
        if let Some(token) = csrf {
            builder = builder.header(CSRF_HEADER, token);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn error_code(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        value["error"]["code"].as_str().unwrap_or_default().to_string()
    }

    #[tokio::test]
    async fn mutating_requests_without_a_valid_csrf_token_are_rejected() {
        let (app, session, csrf) = test_app().await;

        // No token at all
        let response = app
            .clone()
            .oneshot(request("POST", "/api/auth/logout", &session, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");

        // A single altered character
        let mut altered = csrf.clone();
        altered.pop();
        altered.push('!');
        let response = app
            .clone()
            .oneshot(request("PUT", "/api/profile", &session, Some(&altered)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");

        // An empty token
        let response = app
            .clone()
            .oneshot(request("DELETE", "/api/recordings/r1", &session, Some("")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_code(response).await, "invalid_request");
    }

    #[tokio::test]
    async fn read_requests_pass_without_a_csrf_token() {
        let (app, session, _csrf) = test_app().await;

        let response = app
            .oneshot(request("GET", "/api/auth/session", &session, None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn the_session_token_passes_its_own_csrf_check() {
        let (app, session, csrf) = test_app().await;

        let response = app
            .oneshot(request("POST", "/api/auth/logout", &session, Some(&csrf)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn mutating_requests_without_a_session_are_unauthenticated() {
        let (app, _session, _csrf) = test_app().await;

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/logout")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_code(response).await, "unauthenticated");
    }
}
