use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            AuthData, AuthResponse, LoginRequest, LogoutInstructions, LogoutResponse,
            ProfileData, ProfileResponse, ProfileUser, PublicUser, RegisterRequest, TokenInfo,
        },
        extractors::AuthUser,
        services::{self, Session},
    },
    error::AppResult,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/logout", post(logout))
}

pub fn me_routes() -> Router<AppState> {
    Router::new().route("/auth/me", get(get_me))
}

fn auth_response(state: &AppState, session: Session, message: String) -> AuthResponse {
    AuthResponse {
        success: true,
        message,
        data: AuthData {
            user: PublicUser::from(&session.user),
            token: session.token,
            token_expires: state.jwt.expires_in().to_owned(),
        },
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> AppResult<(StatusCode, Json<AuthResponse>)> {
    let Json(payload) = payload?;
    let session = services::register(&state, payload).await?;
    let message = format!("Welcome to K-Pop Card Collection, {}!", session.user.username);
    Ok((
        StatusCode::CREATED,
        Json(auth_response(&state, session, message)),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> AppResult<Json<AuthResponse>> {
    let Json(payload) = payload?;
    let session = services::login(&state, payload).await?;
    let message = format!("Welcome back, {}!", session.user.username);
    Ok(Json(auth_response(&state, session, message)))
}

#[instrument(skip(state, claims), fields(user_id = %claims.user_id))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> AppResult<Json<ProfileResponse>> {
    let user = services::profile(&state, claims.user_id).await?;
    Ok(Json(ProfileResponse {
        success: true,
        message: "User profile retrieved successfully".into(),
        data: ProfileData {
            user: ProfileUser {
                user: PublicUser::from(&user),
                last_updated: user.updated_at,
            },
            token: TokenInfo {
                is_valid: true,
                expires_in: state.jwt.expires_in().to_owned(),
            },
        },
    }))
}

/// Tokens are stateless; logging out is the client discarding its token.
pub async fn logout(State(state): State<AppState>) -> Json<LogoutResponse> {
    Json(LogoutResponse {
        success: true,
        message: "Logout successful",
        instructions: LogoutInstructions {
            client_action: "Delete the JWT token from your client-side storage",
            token_storage: "Remove from localStorage, sessionStorage, or cookies",
            next_login: "Use POST /api/auth/login to get a new token",
        },
        security_note: format!(
            "Your token will automatically expire in {}",
            state.jwt.expires_in()
        ),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::{to_bytes, Body},
        http::{header, Method, Request, StatusCode},
        response::Response,
    };
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{
        app::build_app,
        auth::{
            repo::{memory::InMemoryUserStore, CreateUserError, UserStore},
            repo_types::{ExistingUser, NewUser, User},
        },
        state::AppState,
    };

    fn app() -> (axum::Router, AppState, Arc<InMemoryUserStore>) {
        let (state, store) = AppState::fake();
        (build_app(state.clone()), state, store)
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_me(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/api/auth/me");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_bytes(res: Response) -> Vec<u8> {
        to_bytes(res.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    async fn body_json(res: Response) -> Value {
        serde_json::from_slice(&body_bytes(res).await).unwrap()
    }

    async fn register_kim(app: &axum::Router) -> Value {
        let res = app
            .clone()
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "kim", "email": "kim@x.com", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CREATED);
        body_json(res).await
    }

    #[tokio::test]
    async fn register_returns_created_user_and_token() {
        let (app, _, _) = app();
        let body = register_kim(&app).await;
        assert_eq!(body["success"], true);
        assert_eq!(body["data"]["user"]["username"], "kim");
        assert_eq!(body["data"]["user"]["email"], "kim@x.com");
        assert!(body["data"]["user"]["memberSince"].is_string());
        assert!(!body["data"]["token"].as_str().unwrap().is_empty());
        assert_eq!(body["data"]["tokenExpires"], "24h");
        assert!(body["data"]["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn register_then_me_returns_same_identity() {
        let (app, _, _) = app();
        let body = register_kim(&app).await;
        let token = body["data"]["token"].as_str().unwrap();

        let res = app
            .oneshot(get_me(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let me = body_json(res).await;
        assert_eq!(me["data"]["user"]["username"], "kim");
        assert_eq!(me["data"]["user"]["email"], "kim@x.com");
        assert_eq!(me["data"]["user"]["userId"], body["data"]["user"]["userId"]);
        assert!(me["data"]["user"]["lastUpdated"].is_string());
        assert_eq!(me["data"]["token"]["isValid"], true);
    }

    #[tokio::test]
    async fn duplicate_email_conflicts_and_keeps_one_row() {
        let (app, _, store) = app();
        register_kim(&app).await;

        let res = app
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "kim2", "email": "kim@x.com", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body = body_json(res).await;
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["conflicts"]["email"], "Email is already registered");
        assert!(body["conflicts"]["username"].is_null());
        assert_eq!(store.count_email("kim@x.com"), 1);
    }

    /// Misses the collision on lookup, as if a concurrent registration
    /// committed in between, then loses at the email unique constraint.
    struct LateDuplicateStore(Arc<InMemoryUserStore>);

    #[async_trait]
    impl UserStore for LateDuplicateStore {
        async fn find_conflicts(&self, _: &str, _: &str) -> anyhow::Result<Vec<ExistingUser>> {
            Ok(Vec::new())
        }

        async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
            self.0.find_by_email(email).await
        }

        async fn find_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
            self.0.find_by_id(user_id).await
        }

        async fn create(&self, _: NewUser<'_>) -> Result<User, CreateUserError> {
            Err(CreateUserError::Duplicate {
                username: false,
                email: true,
            })
        }
    }

    #[tokio::test]
    async fn insert_time_duplicate_is_conflict() {
        let (fake, inner) = AppState::fake();
        let users = Arc::new(LateDuplicateStore(inner.clone())) as Arc<dyn UserStore>;
        let state = AppState::from_parts(fake.db.clone(), fake.config.clone(), users).unwrap();

        let res = build_app(state)
            .oneshot(post_json(
                "/api/auth/register",
                json!({"username": "kim2", "email": "kim@x.com", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
        let body = body_json(res).await;
        assert_eq!(body["code"], "CONFLICT");
        assert_eq!(body["conflicts"]["email"], "Email is already registered");
        assert!(body["conflicts"]["username"].is_null());
        assert!(body.get("data").is_none());
        assert_eq!(inner.len(), 0);
    }

    #[tokio::test]
    async fn register_validation_errors_are_bad_request() {
        let (app, _, store) = app();
        let cases = [
            (json!({"username": "kim", "email": "kim@x.com"}), "VALIDATION_MISSING_FIELD"),
            (
                json!({"username": "kim", "email": "kim@x.com", "password": "12345"}),
                "VALIDATION_WEAK_PASSWORD",
            ),
            (
                json!({"username": "kim", "email": "kim.x.com", "password": "secret1"}),
                "VALIDATION_BAD_EMAIL",
            ),
        ];
        for (payload, code) in cases {
            let res = app
                .clone()
                .oneshot(post_json("/api/auth/register", payload))
                .await
                .unwrap();
            assert_eq!(res.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(res).await["code"], code);
        }
        assert_eq!(store.len(), 0);
    }

    #[tokio::test]
    async fn malformed_json_uses_error_envelope() {
        let (app, _, _) = app();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/api/auth/login")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let res = app.oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["code"], "VALIDATION_MALFORMED_BODY");
    }

    #[tokio::test]
    async fn login_succeeds_with_correct_password() {
        let (app, _, _) = app();
        register_kim(&app).await;
        let res = app
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "kim@x.com", "password": "secret1"}),
            ))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["data"]["user"]["username"], "kim");
        assert!(!body["data"]["token"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn login_missing_fields_is_bad_request() {
        let (app, _, _) = app();
        let res = app
            .oneshot(post_json("/api/auth/login", json!({"email": "kim@x.com"})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body = body_json(res).await;
        assert_eq!(body["code"], "VALIDATION_MISSING_FIELD");
        assert_eq!(body["errors"]["password"], "Password is required");
    }

    #[tokio::test]
    async fn login_failure_bodies_are_byte_identical() {
        let (app, _, _) = app();
        register_kim(&app).await;

        let wrong_password = app
            .clone()
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "kim@x.com", "password": "wrong"}),
            ))
            .await
            .unwrap();
        let unknown_email = app
            .oneshot(post_json(
                "/api/auth/login",
                json!({"email": "ghost@x.com", "password": "wrong"}),
            ))
            .await
            .unwrap();

        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        let a = body_bytes(wrong_password).await;
        let b = body_bytes(unknown_email).await;
        assert_eq!(a, b);
        let body: Value = serde_json::from_slice(&a).unwrap();
        assert_eq!(body["code"], "AUTH_INVALID_CREDENTIALS");
    }

    #[tokio::test]
    async fn me_without_header_is_auth_missing() {
        let (app, _, _) = app();
        let res = app.oneshot(get_me(None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["code"], "AUTH_MISSING");
    }

    #[tokio::test]
    async fn me_with_non_bearer_header_is_unauthorized() {
        let (app, _, _) = app();
        let res = app.oneshot(get_me(Some("Basic a2ltOnNlY3JldA=="))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["code"], "AUTH_MISSING");
    }

    #[tokio::test]
    async fn me_with_forged_token_is_auth_invalid() {
        let (app, _, _) = app();
        let res = app
            .oneshot(get_me(Some("Bearer eyJhbGciOiJIUzI1NiJ9.e30.bogus")))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(res).await["code"], "AUTH_INVALID");
    }

    #[tokio::test]
    async fn me_for_deleted_account_is_not_found() {
        let (app, _, store) = app();
        let body = register_kim(&app).await;
        let token = body["data"]["token"].as_str().unwrap().to_owned();
        let user_id = body["data"]["user"]["userId"].as_str().unwrap().parse().unwrap();
        store.delete(user_id);

        let res = app
            .oneshot(get_me(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(res).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn logout_is_stateless_acknowledgement() {
        let (app, _, _) = app();
        let body = register_kim(&app).await;
        let token = body["data"]["token"].as_str().unwrap().to_owned();

        let res = app
            .clone()
            .oneshot(post_json("/api/auth/logout", json!({})))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = body_json(res).await;
        assert_eq!(body["success"], true);
        assert!(body["instructions"]["clientAction"].is_string());
        assert!(body["securityNote"].as_str().unwrap().ends_with("24h"));

        // the token still works after logout
        let res = app
            .oneshot(get_me(Some(&format!("Bearer {token}"))))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
    }
}
