use std::collections::BTreeMap;
use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

use crate::users::model::UserInput;

pub const MIN_NAME_LENGTH: usize = 2;
pub const MAX_NAME_LENGTH: usize = 50;
/// Matches the width of the `email` column.
pub const MAX_EMAIL_LENGTH: usize = 320;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 72;

pub const ROLES: &[&str] = &["admin", "user"];
pub const STATUSES: &[&str] = &["active", "inactive", "banned"];

/// Field name -> every message reported for it, keyed in field-name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[cfg(test)]
    pub fn field(&self, name: &str) -> Option<&[String]> {
        self.0.get(name).map(Vec::as_slice)
    }

    #[cfg(test)]
    pub fn fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.0.keys().copied()
    }

    /// `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// A single check applied to one field value.
#[derive(Debug, Clone, Copy)]
pub enum Rule {
    /// Fails on an empty value.
    Required(&'static str),
    /// Fails on an empty or whitespace-only value.
    NotBlank(&'static str),
    Length {
        min: usize,
        max: usize,
        message: &'static str,
    },
    Email(&'static str),
    OneOf {
        allowed: &'static [&'static str],
        message: &'static str,
    },
}

impl Rule {
    fn check(&self, value: &str) -> Result<(), &'static str> {
        match *self {
            Rule::Required(message) => {
                if value.is_empty() {
                    return Err(message);
                }
            }
            Rule::NotBlank(message) => {
                if value.trim().is_empty() {
                    return Err(message);
                }
            }
            // the remaining rules only look at values that are present
            _ if value.is_empty() => {}
            Rule::Length { min, max, message } => {
                let len = value.chars().count();
                if len < min || len > max {
                    return Err(message);
                }
            }
            Rule::Email(message) => {
                if !is_valid_email(value) {
                    return Err(message);
                }
            }
            Rule::OneOf { allowed, message } => {
                if !allowed.contains(&value) {
                    return Err(message);
                }
            }
        }
        Ok(())
    }
}

/// Rules for one field of a [`UserInput`], evaluated in order.
pub struct FieldRules {
    pub field: &'static str,
    pub value: fn(&UserInput) -> &str,
    /// When set and the value is empty, the field is skipped entirely.
    pub optional: bool,
    pub rules: &'static [Rule],
}

const NAME_RULES: &[Rule] = &[
    Rule::NotBlank("name is required"),
    Rule::Length {
        min: MIN_NAME_LENGTH,
        max: MAX_NAME_LENGTH,
        message: "name must be between 2 and 50 characters",
    },
];

const EMAIL_RULES: &[Rule] = &[
    Rule::Required("email is required"),
    Rule::Length {
        min: 1,
        max: MAX_EMAIL_LENGTH,
        message: "email must be at most 320 characters",
    },
    Rule::Email("invalid email format"),
];

const PASSWORD_LENGTH: Rule = Rule::Length {
    min: MIN_PASSWORD_LENGTH,
    max: MAX_PASSWORD_LENGTH,
    message: "password must be between 8 and 72 characters",
};

const ROLE_RULES: &[Rule] = &[
    Rule::Required("role is required"),
    Rule::OneOf {
        allowed: ROLES,
        message: "invalid role",
    },
];

const STATUS_RULES: &[Rule] = &[
    Rule::Required("status is required"),
    Rule::OneOf {
        allowed: STATUSES,
        message: "invalid status",
    },
];

fn name_of(u: &UserInput) -> &str {
    &u.name
}

fn email_of(u: &UserInput) -> &str {
    &u.email
}

fn password_of(u: &UserInput) -> &str {
    &u.password
}

fn role_of(u: &UserInput) -> &str {
    &u.role
}

fn status_of(u: &UserInput) -> &str {
    &u.status
}

pub const CREATE_RULES: &[FieldRules] = &[
    FieldRules {
        field: "name",
        value: name_of,
        optional: false,
        rules: NAME_RULES,
    },
    FieldRules {
        field: "email",
        value: email_of,
        optional: false,
        rules: EMAIL_RULES,
    },
    FieldRules {
        field: "password",
        value: password_of,
        optional: false,
        rules: &[Rule::Required("password is required"), PASSWORD_LENGTH],
    },
    FieldRules {
        field: "role",
        value: role_of,
        optional: false,
        rules: ROLE_RULES,
    },
    FieldRules {
        field: "status",
        value: status_of,
        optional: false,
        rules: STATUS_RULES,
    },
];

pub const UPDATE_RULES: &[FieldRules] = &[
    FieldRules {
        field: "name",
        value: name_of,
        optional: false,
        rules: NAME_RULES,
    },
    FieldRules {
        field: "email",
        value: email_of,
        optional: false,
        rules: EMAIL_RULES,
    },
    FieldRules {
        field: "password",
        value: password_of,
        optional: true,
        rules: &[PASSWORD_LENGTH],
    },
    FieldRules {
        field: "role",
        value: role_of,
        optional: false,
        rules: ROLE_RULES,
    },
    FieldRules {
        field: "status",
        value: status_of,
        optional: false,
        rules: STATUS_RULES,
    },
];

/// Runs every field's rules and collects the first failure of each field.
pub fn validate(input: &UserInput, table: &[FieldRules]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    for field in table {
        let value = (field.value)(input);
        if field.optional && value.is_empty() {
            continue;
        }
        if let Some(message) = field.rules.iter().find_map(|r| r.check(value).err()) {
            errors.add(field.field, message);
        }
    }
    errors.into_result()
}
