use std::{fmt, mem, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::{
    password::{self, PasswordError},
    validation::{self, ValidationErrors, CREATE_RULES, UPDATE_RULES},
};

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {kind} `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownVariant {
                kind: "role",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Inactive,
    Banned,
}

impl UserStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Banned => "banned",
        }
    }
}

impl FromStr for UserStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(UserStatus::Active),
            "inactive" => Ok(UserStatus::Inactive),
            "banned" => Ok(UserStatus::Banned),
            other => Err(UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User-supplied candidate for a create or an update. The password is plaintext here.
#[derive(Clone, Default, Deserialize)]
pub struct UserInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub status: String,
}

impl fmt::Debug for UserInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserInput")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("role", &self.role)
            .field("status", &self.status)
            .finish()
    }
}

impl UserInput {
    pub fn normalize(&mut self) {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_lowercase();
    }

    pub fn validate_for_create(&self) -> Result<(), ValidationErrors> {
        validation::validate(self, CREATE_RULES)
    }

    /// Same as create, except an empty password means "leave it unchanged".
    pub fn validate_for_update(&self) -> Result<(), ValidationErrors> {
        validation::validate(self, UPDATE_RULES)
    }

    pub fn apply_defaults(&mut self) {
        if self.role.is_empty() {
            self.role = Role::default().as_str().to_string();
        }
        if self.status.is_empty() {
            self.status = UserStatus::default().as_str().to_string();
        }
    }

    /// Moves the plaintext out of the record, leaving it empty.
    pub fn take_password(&mut self) -> String {
        mem::take(&mut self.password)
    }

    fn parse_enums(&self) -> Result<(Role, UserStatus), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let role = self
            .role
            .parse::<Role>()
            .map_err(|_| errors.add("role", "invalid role"))
            .ok();
        let status = self
            .status
            .parse::<UserStatus>()
            .map_err(|_| errors.add("status", "invalid status"))
            .ok();
        match (role, status) {
            (Some(role), Some(status)) => Ok((role, status)),
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub status: UserStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    #[serde(skip)]
    pub deleted_at: Option<OffsetDateTime>,
}

impl User {
    /// Builds a fresh record from a defaulted, validated input and an already hashed password.
    pub fn new(input: UserInput, password_hash: String) -> Result<Self, ValidationErrors> {
        let (role, status) = input.parse_enums()?;
        let now = OffsetDateTime::now_utc();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name,
            email: input.email,
            password_hash,
            role,
            status,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Refreshes `updated_at`; it never moves backwards and `created_at` is left alone.
    pub fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc().max(self.updated_at);
    }

    /// Copies a validated update onto the record. `new_hash` is `None` when the password stays.
    pub fn apply_update(
        &mut self,
        input: UserInput,
        new_hash: Option<String>,
    ) -> Result<(), ValidationErrors> {
        let (role, status) = input.parse_enums()?;
        self.name = input.name;
        self.email = input.email;
        self.role = role;
        self.status = status;
        if let Some(hash) = new_hash {
            self.password_hash = hash;
        }
        self.touch();
        Ok(())
    }

    /// Stamps `deleted_at` and `updated_at` with the same instant.
    pub fn soft_delete(&mut self) {
        let now = OffsetDateTime::now_utc().max(self.updated_at);
        self.deleted_at = Some(now);
        self.updated_at = now;
    }

    #[cfg(test)]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn verify_password(&self, attempt: &str) -> Result<bool, PasswordError> {
        password::verify_password(&self.password_hash, attempt)
    }
}
