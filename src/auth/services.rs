use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{LoginRequest, RegisterRequest},
        repo::CreateUserError,
        repo_types::{NewUser, User},
    },
    error::{AppError, AppResult, Field, MIN_PASSWORD_LEN},
    state::AppState,
};

const REGISTER_FIELDS: &[Field] = &[Field::Username, Field::Email, Field::Password];
const LOGIN_FIELDS: &[Field] = &[Field::Email, Field::Password];

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Returns the value when present and non-empty, recording the field otherwise.
fn require(value: Option<String>, field: Field, missing: &mut Vec<Field>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => {
            missing.push(field);
            String::new()
        }
    }
}

/// A signed-in user and their freshly issued token.
pub struct Session {
    pub user: User,
    pub token: String,
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> AppResult<Session> {
    let mut missing = Vec::new();
    let username = require(payload.username, Field::Username, &mut missing);
    let email = require(payload.email, Field::Email, &mut missing);
    let password = require(payload.password, Field::Password, &mut missing);
    if !missing.is_empty() {
        warn!(?missing, "registration missing fields");
        return Err(AppError::MissingFields {
            expected: REGISTER_FIELDS,
            missing,
        });
    }

    if password.encode_utf16().count() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::WeakPassword);
    }

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::BadEmail);
    }

    let existing = state.users.find_conflicts(&username, &email).await?;
    if !existing.is_empty() {
        let username_taken = existing.iter().any(|u| u.username == username);
        let email_taken = existing.iter().any(|u| u.email == email);
        for row in &existing {
            debug!(user_id = %row.user_id, "registration collides with existing user");
        }
        warn!(username_taken, email_taken, "user already exists");
        return Err(AppError::Conflict {
            username: username_taken,
            email: email_taken,
        });
    }

    let hash = state.hasher.hash_blocking(password).await?;

    let user = state
        .users
        .create(NewUser {
            username: &username,
            email: &email,
            password_hash: &hash,
        })
        .await
        .map_err(|e| match e {
            CreateUserError::Duplicate { username, email } => {
                warn!(username, email, "unique constraint rejected registration");
                AppError::Conflict { username, email }
            }
            CreateUserError::Store(err) => AppError::Internal(err.context("create user")),
        })?;

    let token = state.jwt.issue(user.user_id, &user.username, &user.email)?;

    info!(user_id = %user.user_id, username = %user.username, "user registered");
    Ok(Session { user, token })
}

pub async fn login(state: &AppState, payload: LoginRequest) -> AppResult<Session> {
    let mut missing = Vec::new();
    let email = require(payload.email, Field::Email, &mut missing);
    let password = require(payload.password, Field::Password, &mut missing);
    if !missing.is_empty() {
        return Err(AppError::MissingFields {
            expected: LOGIN_FIELDS,
            missing,
        });
    }

    let Some(user) = state.users.find_by_email(&email).await? else {
        warn!("login unknown email");
        return Err(AppError::InvalidCredentials);
    };

    let ok = state
        .hasher
        .verify_blocking(password, user.password_hash.clone())
        .await?;
    if !ok {
        warn!(user_id = %user.user_id, "login invalid password");
        return Err(AppError::InvalidCredentials);
    }

    let token = state.jwt.issue(user.user_id, &user.username, &user.email)?;

    info!(user_id = %user.user_id, "user logged in");
    Ok(Session { user, token })
}

/// Loads the current row for a verified token; the token's own copy of the
/// username and email is not trusted for display.
pub async fn profile(state: &AppState, user_id: Uuid) -> AppResult<User> {
    state.users.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "token refers to a deleted user");
        AppError::NotFound("User not found".into())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::AppState;

    fn register_req(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: Some(username.into()),
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("kim@x.com"));
        assert!(is_valid_email("a.b+c@sub.domain.org"));
        assert!(!is_valid_email("kim@x"));
        assert!(!is_valid_email("kim x@x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("kim@@x.com"));
    }

    #[tokio::test]
    async fn missing_fields_are_reported_before_anything_else() {
        let (state, _) = AppState::fake();
        let req = RegisterRequest {
            username: Some(String::new()),
            email: None,
            password: Some("x".into()),
        };
        match register(&state, req).await {
            Err(AppError::MissingFields { missing, .. }) => {
                assert_eq!(missing, vec![Field::Username, Field::Email]);
            }
            other => panic!("unexpected: {:?}", other.err()),
        }
    }

    #[tokio::test]
    async fn weak_password_checked_before_email() {
        let (state, _) = AppState::fake();
        let err = register(&state, register_req("kim", "not-an-email", "12345"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::WeakPassword));

        let err = register(&state, register_req("kim", "not-an-email", "123456"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadEmail));
    }

    #[tokio::test]
    async fn password_length_counts_utf16_units() {
        let (state, _) = AppState::fake();
        // three astral code points, two UTF-16 units each
        let err = register(&state, register_req("kim", "not-an-email", "😀😀😀"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadEmail));

        let err = register(&state, register_req("kim", "not-an-email", "ééééé"))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::WeakPassword));
    }

    #[tokio::test]
    async fn conflict_reports_both_fields_across_rows() {
        let (state, store) = AppState::fake();
        register(&state, register_req("kim", "kim@x.com", "secret1"))
            .await
            .unwrap();
        register(&state, register_req("lee", "lee@x.com", "secret1"))
            .await
            .unwrap();

        let err = register(&state, register_req("kim", "lee@x.com", "secret1"))
            .await
            .err()
            .unwrap();
        assert!(matches!(
            err,
            AppError::Conflict {
                username: true,
                email: true
            }
        ));
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn username_compare_is_case_sensitive() {
        let (state, store) = AppState::fake();
        register(&state, register_req("kim", "kim@x.com", "secret1"))
            .await
            .unwrap();
        register(&state, register_req("Kim", "kim2@x.com", "secret1"))
            .await
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn register_issues_token_for_new_id() {
        let (state, _) = AppState::fake();
        let session = register(&state, register_req("kim", "kim@x.com", "secret1"))
            .await
            .unwrap();
        let claims = state.jwt.verify(&session.token).unwrap();
        assert_eq!(claims.user_id, session.user.user_id);
        assert_eq!(claims.username, "kim");
        assert_ne!(session.user.password_hash, "secret1");
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (state, _) = AppState::fake();
        register(&state, register_req("kim", "kim@x.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = login(
            &state,
            LoginRequest {
                email: Some("kim@x.com".into()),
                password: Some("wrong".into()),
            },
        )
        .await
        .err()
        .unwrap();
        let unknown_email = login(
            &state,
            LoginRequest {
                email: Some("nobody@x.com".into()),
                password: Some("secret1".into()),
            },
        )
        .await
        .err()
        .unwrap();
        assert!(matches!(wrong_password, AppError::InvalidCredentials));
        assert!(matches!(unknown_email, AppError::InvalidCredentials));
    }

    #[tokio::test]
    async fn profile_of_deleted_user_is_not_found() {
        let (state, store) = AppState::fake();
        let session = register(&state, register_req("kim", "kim@x.com", "secret1"))
            .await
            .unwrap();
        store.delete(session.user.user_id);
        let err = profile(&state, session.user.user_id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}
