use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use thiserror::Error;

use crate::state::AppState;

pub const MIN_PASSWORD_LEN: usize = 6;

const GENERIC_INTERNAL: &str = "Internal server error";

/// Fields checked by the "required" validation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Username,
    Email,
    Password,
}

impl Field {
    fn key(self) -> &'static str {
        match self {
            Field::Username => "username",
            Field::Email => "email",
            Field::Password => "password",
        }
    }

    fn required_message(self) -> &'static str {
        match self {
            Field::Username => "Username is required",
            Field::Email => "Email is required",
            Field::Password => "Password is required",
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("missing required fields")]
    MissingFields {
        expected: &'static [Field],
        missing: Vec<Field>,
    },

    #[error("password too short")]
    WeakPassword,

    #[error("invalid email address")]
    BadEmail,

    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    #[error("malformed request body: {0}")]
    MalformedBody(String),

    #[error("access token required")]
    AuthMissing,

    #[error("invalid or expired token")]
    AuthInvalid,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("user already exists")]
    Conflict { username: bool, email: bool },

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::MissingFields { .. }
            | AppError::WeakPassword
            | AppError::BadEmail
            | AppError::InvalidParam(_)
            | AppError::MalformedBody(_) => StatusCode::BAD_REQUEST,
            AppError::AuthMissing | AppError::AuthInvalid | AppError::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Conflict { .. } => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::MissingFields { .. } => "VALIDATION_MISSING_FIELD",
            AppError::WeakPassword => "VALIDATION_WEAK_PASSWORD",
            AppError::BadEmail => "VALIDATION_BAD_EMAIL",
            AppError::InvalidParam(_) => "VALIDATION_INVALID_PARAM",
            AppError::MalformedBody(_) => "VALIDATION_MALFORMED_BODY",
            AppError::AuthMissing => "AUTH_MISSING",
            AppError::AuthInvalid => "AUTH_INVALID",
            AppError::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
            AppError::Conflict { .. } => "CONFLICT",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Internal(_) => "INTERNAL",
        }
    }

    fn message(&self) -> String {
        match self {
            AppError::MissingFields { expected, .. } => {
                let names: Vec<&str> = expected.iter().map(|f| f.key()).collect();
                format!("All fields are required: {}", names.join(", "))
            }
            AppError::WeakPassword => {
                format!("Password must be at least {MIN_PASSWORD_LEN} characters long")
            }
            AppError::BadEmail => "Please provide a valid email address".into(),
            AppError::InvalidParam(msg) => msg.clone(),
            AppError::MalformedBody(_) => "Request body must be valid JSON".into(),
            AppError::AuthMissing => "Access token required".into(),
            AppError::AuthInvalid => "Invalid or expired token".into(),
            AppError::InvalidCredentials => "Invalid email or password".into(),
            AppError::Conflict { .. } => "User already exists".into(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::Internal(_) => GENERIC_INTERNAL.into(),
        }
    }

    fn details(&self) -> Option<(&'static str, Value)> {
        match self {
            AppError::MissingFields { expected, missing } => {
                let errors: serde_json::Map<String, Value> = expected
                    .iter()
                    .map(|f| {
                        let value = if missing.contains(f) {
                            Value::from(f.required_message())
                        } else {
                            Value::Null
                        };
                        (f.key().to_string(), value)
                    })
                    .collect();
                Some(("errors", Value::Object(errors)))
            }
            AppError::WeakPassword => Some((
                "requirements",
                json!({ "minLength": MIN_PASSWORD_LEN }),
            )),
            AppError::BadEmail => Some(("example", json!("user@example.com"))),
            AppError::MalformedBody(reason) => Some(("error", json!(reason))),
            AppError::AuthMissing => Some(("format", json!("Authorization: Bearer <token>"))),
            AppError::AuthInvalid => Some(("action", json!("Please login again to get a new token"))),
            AppError::Conflict { username, email } => Some((
                "conflicts",
                json!({
                    "username": username.then_some("Username is already taken"),
                    "email": email.then_some("Email is already registered"),
                }),
            )),
            AppError::Internal(_) => Some(("error", json!(GENERIC_INTERNAL))),
            _ => None,
        }
    }

    fn body(&self) -> Value {
        let mut body = json!({
            "success": false,
            "code": self.code(),
            "message": self.message(),
        });
        if let (Some((key, value)), Some(map)) = (self.details(), body.as_object_mut()) {
            map.insert(key.to_string(), value);
        }
        body
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::MalformedBody(rejection.body_text())
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.into())
    }
}

/// Carries the underlying message of a 500 so the response layer can decide
/// whether to expose it.
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if let AppError::Internal(err) = &self {
            tracing::error!(error = %format!("{err:#}"), "internal error");
        }
        let mut res = (status, Json(self.body())).into_response();
        if let AppError::Internal(err) = self {
            res.extensions_mut().insert(InternalDetail(format!("{err:#}")));
        }
        res
    }
}

/// Response mapper: swaps the generic 500 detail for the real one in development.
pub async fn expose_internal_detail(State(state): State<AppState>, mut res: Response) -> Response {
    let Some(InternalDetail(detail)) = res.extensions_mut().remove::<InternalDetail>() else {
        return res;
    };
    if !state.config.expose_error_details() {
        return res;
    }
    let body = json!({
        "success": false,
        "code": "INTERNAL",
        "message": GENERIC_INTERNAL,
        "error": detail,
    });
    (res.status(), Json(body)).into_response()
}
