use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::UserError;
use crate::users::{model::User, repo_types::UserRow};

/// Storage for user records. Reads never return soft-deleted rows.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with [`UserError::EmailTaken`] when a live user already owns the email.
    async fn insert(&self, user: &User) -> Result<(), UserError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError>;
    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, UserError>;
    /// Fails with [`UserError::NotFound`] when no live row has the user's id.
    async fn update(&self, user: &User) -> Result<(), UserError>;
    /// Persists the `deleted_at`/`updated_at` stamps of a record that went
    /// through [`User::soft_delete`]. Returns `false` when there was no live row.
    async fn soft_delete(&self, user: &User) -> Result<bool, UserError>;
}

#[derive(Clone)]
pub struct PgUserRepository {
    db: PgPool,
}

impl PgUserRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_error(err: sqlx::Error, email: &str) -> UserError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            UserError::EmailTaken(email.to_string())
        }
        _ => UserError::Database(err),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn insert(&self, user: &User) -> Result<(), UserError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, role, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| map_write_error(e, &user.email))?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, status, created_at, updated_at, deleted_at
            FROM users
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, status, created_at, updated_at, deleted_at
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, UserError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, name, email, password_hash, role, status, created_at, updated_at, deleted_at
            FROM users
            WHERE deleted_at IS NULL
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.db)
        .await?;
        rows.into_iter().map(User::try_from).collect()
    }

    async fn update(&self, user: &User) -> Result<(), UserError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET name = $2, email = $3, password_hash = $4, role = $5, status = $6, updated_at = $7
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .bind(user.updated_at)
        .execute(&self.db)
        .await
        .map_err(|e| map_write_error(e, &user.email))?;

        if result.rows_affected() == 0 {
            return Err(UserError::NotFound(user.id));
        }
        Ok(())
    }

    async fn soft_delete(&self, user: &User) -> Result<bool, UserError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET deleted_at = $2, updated_at = $3
             WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user.id)
        .bind(user.deleted_at)
        .bind(user.updated_at)
        .execute(&self.db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
pub(crate) mod memory {
    use super::*;
    use tokio::sync::RwLock;

    /// Keeps users in a `Vec`, soft-deleted ones included.
    #[derive(Default)]
    pub struct MemoryUserRepository {
        users: RwLock<Vec<User>>,
    }

    impl MemoryUserRepository {
        pub async fn all_rows(&self) -> Vec<User> {
            self.users.read().await.clone()
        }
    }

    fn email_taken(users: &[User], email: &str, except: Uuid) -> bool {
        users
            .iter()
            .any(|u| !u.is_deleted() && u.email == email && u.id != except)
    }

    #[async_trait]
    impl UserRepository for MemoryUserRepository {
        async fn insert(&self, user: &User) -> Result<(), UserError> {
            let mut users = self.users.write().await;
            if email_taken(&users, &user.email, user.id) {
                return Err(UserError::EmailTaken(user.email.clone()));
            }
            users.push(user.clone());
            Ok(())
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, UserError> {
            let users = self.users.read().await;
            Ok(users.iter().find(|u| u.id == id && !u.is_deleted()).cloned())
        }

        async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserError> {
            let users = self.users.read().await;
            Ok(users
                .iter()
                .find(|u| u.email == email && !u.is_deleted())
                .cloned())
        }

        async fn list(&self, limit: i64, offset: i64) -> Result<Vec<User>, UserError> {
            let users = self.users.read().await;
            let mut live: Vec<User> = users.iter().filter(|u| !u.is_deleted()).cloned().collect();
            live.sort_by(|a, b| b.created_at.cmp(&a.created_at));
            Ok(live
                .into_iter()
                .skip(offset.max(0) as usize)
                .take(limit.max(0) as usize)
                .collect())
        }

        async fn update(&self, user: &User) -> Result<(), UserError> {
            let mut users = self.users.write().await;
            if email_taken(&users, &user.email, user.id) {
                return Err(UserError::EmailTaken(user.email.clone()));
            }
            let slot = users
                .iter_mut()
                .find(|u| u.id == user.id && !u.is_deleted())
                .ok_or(UserError::NotFound(user.id))?;
            *slot = user.clone();
            Ok(())
        }

        async fn soft_delete(&self, user: &User) -> Result<bool, UserError> {
            let mut users = self.users.write().await;
            match users.iter_mut().find(|u| u.id == user.id && !u.is_deleted()) {
                Some(slot) => {
                    slot.deleted_at = user.deleted_at;
                    slot.updated_at = user.updated_at;
                    Ok(true)
                }
                None => Ok(false),
            }
        }
    }
}
