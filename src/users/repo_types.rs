use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::UserError;
use crate::users::model::{Role, UnknownVariant, User, UserStatus};

/// Row in the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,   // CHECK'ed to admin|user
    pub status: String, // CHECK'ed to active|inactive|banned
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub deleted_at: Option<OffsetDateTime>,
}

impl TryFrom<UserRow> for User {
    type Error = UserError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        let id = r.id;
        let corrupt = move |e: UnknownVariant| UserError::CorruptRecord {
            id,
            reason: e.to_string(),
        };
        let role: Role = r.role.parse().map_err(corrupt)?;
        let status: UserStatus = r.status.parse().map_err(corrupt)?;
        Ok(User {
            id: r.id,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            role,
            status,
            created_at: r.created_at,
            updated_at: r.updated_at,
            deleted_at: r.deleted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(role: &str, status: &str) -> UserRow {
        let now = OffsetDateTime::now_utc();
        UserRow {
            id: Uuid::new_v4(),
            name: "Linus".into(),
            email: "linus@example.com".into(),
            password_hash: "$argon2id$v=19$stub".into(),
            role: role.into(),
            status: status.into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn row_maps_to_user() {
        let user = User::try_from(row("admin", "banned")).unwrap();
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.status, UserStatus::Banned);
        assert_eq!(user.email, "linus@example.com");
    }

    #[test]
    fn unknown_role_is_a_corrupt_record() {
        let err = User::try_from(row("superuser", "active")).unwrap_err();
        assert!(matches!(err, UserError::CorruptRecord { .. }));
        assert!(err.to_string().contains("superuser"));
    }
}
