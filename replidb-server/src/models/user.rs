//! User entity and validated creation input

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::ValidationError;

/// Matches the VARCHAR(255) columns of the users table
const MAX_FIELD_LEN: usize = 255;

/// User record as stored
#[derive(Debug, Clone, PartialEq, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Create user request body
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
}

/// Validated user input, ready to insert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    name: String,
    email: String,
}

impl NewUser {
    pub fn new(name: &str, email: &str) -> Result<Self, ValidationError> {
        let name = name.trim();
        let email = email.trim();

        if name.is_empty() {
            return Err(ValidationError::Empty { field: "name" });
        }
        if name.chars().count() > MAX_FIELD_LEN {
            return Err(ValidationError::TooLong {
                field: "name",
                max: MAX_FIELD_LEN,
            });
        }
        if email.is_empty() {
            return Err(ValidationError::Empty { field: "email" });
        }
        if email.chars().count() > MAX_FIELD_LEN {
            return Err(ValidationError::TooLong {
                field: "email",
                max: MAX_FIELD_LEN,
            });
        }
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {}
            _ => {
                return Err(ValidationError::InvalidFormat {
                    field: "email",
                    reason: "expected local@domain",
                })
            }
        }

        Ok(Self {
            name: name.to_owned(),
            email: email.to_owned(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub(crate) fn into_parts(self) -> (String, String) {
        (self.name, self.email)
    }
}

impl TryFrom<CreateUserRequest> for NewUser {
    type Error = ValidationError;

    fn try_from(req: CreateUserRequest) -> Result<Self, Self::Error> {
        Self::new(&req.name, &req.email)
    }
}
