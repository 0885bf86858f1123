use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{ExistingUser, NewUser, User};

pub const USERNAME_UNIQUE: &str = "users_username_key";
pub const EMAIL_UNIQUE: &str = "users_email_key";

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("duplicate user (username: {username}, email: {email})")]
    Duplicate { username: bool, email: bool },
    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Credential store. Implementations must keep username and email unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Rows whose username or email equals the given values.
    async fn find_conflicts(&self, username: &str, email: &str)
        -> anyhow::Result<Vec<ExistingUser>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;
    async fn find_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<User>>;
    async fn create(&self, new_user: NewUser<'_>) -> Result<User, CreateUserError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_conflicts(
        &self,
        username: &str,
        email: &str,
    ) -> anyhow::Result<Vec<ExistingUser>> {
        let rows = sqlx::query_as::<_, ExistingUser>(
            r#"
            SELECT user_id, username, email
            FROM users
            WHERE username = $1 OR email = $2
            "#,
        )
        .bind(username)
        .bind(email)
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, user_id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT user_id, username, email, password_hash, created_at, updated_at
            FROM users
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn create(&self, new_user: NewUser<'_>) -> Result<User, CreateUserError> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING user_id, username, email, password_hash, created_at, updated_at
            "#,
        )
        .bind(new_user.username)
        .bind(new_user.email)
        .bind(new_user.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_insert_error)
    }
}

/// Unique violations on a known users constraint become
/// [`CreateUserError::Duplicate`]. Everything else is a store error.
fn map_insert_error(err: sqlx::Error) -> CreateUserError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(dup) = duplicate_for_constraint(db_err.constraint()) {
                return dup;
            }
        }
    }
    CreateUserError::Store(err.into())
}

fn duplicate_for_constraint(constraint: Option<&str>) -> Option<CreateUserError> {
    match constraint? {
        USERNAME_UNIQUE => Some(CreateUserError::Duplicate {
            username: true,
            email: false,
        }),
        EMAIL_UNIQUE => Some(CreateUserError::Duplicate {
            username: false,
            email: true,
        }),
        _ => None,
    }
}
