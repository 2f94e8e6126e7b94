use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Pagination {
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}
fn default_limit() -> i64 {
    DEFAULT_PAGE_SIZE
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    /// Limit in 1..=100, offset non-negative.
    pub fn clamped(self) -> Self {
        Self {
            limit: self.limit.clamp(1, MAX_PAGE_SIZE),
            offset: self.offset.max(0),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct DeletedUser {
    pub id: Uuid,
}

#[derive(Deserialize)]
pub struct VerifyPassword {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct PasswordCheck {
    pub matches: bool,
}
