use mongodb::bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::{required_text, ValidationError};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl User {
    pub fn new(registration: &Registration, password_hash: String) -> Self {
        let now = DateTime::now();
        Self {
            id: ObjectId::new(),
            name: registration.name.clone(),
            email: registration.email.clone(),
            password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Registration details that passed validation. The password is still in
/// clear text and must be hashed before a `User` is stored.
#[derive(Clone, Debug, PartialEq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterInput {
    pub fn validate(self) -> Result<Registration, ValidationError> {
        let name = required_text("name", self.name)?;
        let email = normalize_email(self.email)?;
        let password = self.password.ok_or(ValidationError::Required("password"))?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::Invalid {
                field: "password",
                rule: "at least 6 characters long",
            });
        }
        Ok(Registration {
            name,
            email,
            password,
        })
    }
}

pub fn normalize_email(email: Option<String>) -> Result<String, ValidationError> {
    let email = required_text("email", email)?.to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ValidationError::Invalid {
            field: "email",
            rule: "a valid e-mail address",
        }),
    }
}
