use std::sync::OnceLock;

use actix_web::{dev::Payload, http::header::HeaderValue, web, FromRequest, HttpRequest};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use futures::future::{ready, Ready};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::app::AppState;
use crate::error::AppError;
use crate::schemas::UserId;

const SALT_LEN: usize = 16;

/// Checked against when a login names an unknown e-mail, so both paths
/// spend the same Argon2 work.
static DUMMY_HASH: OnceLock<Option<String>> = OnceLock::new();

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization token is missing")]
    MissingToken,
    #[error("Authorization token is invalid or expired")]
    InvalidToken,
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("failed to hash password")]
    Hashing,
    #[error("failed to sign token")]
    Signing,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    exp: usize,
}

/// Signs and checks the bearer tokens handed out at login.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Option<chrono::Duration>,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::try_hours(ttl_hours),
        }
    }

    pub fn issue(&self, user_id: UserId) -> Result<String, AuthError> {
        let expires_at = self
            .ttl
            .and_then(|ttl| chrono::Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                log::error!("token lifetime is out of range");
                AuthError::Signing
            })?;
        let claims = Claims {
            sub: user_id.to_hex(),
            exp: expires_at.timestamp().max(0) as usize,
        };
        encode(&Header::default(), &claims, &self.encoding).map_err(|err| {
            log::error!("failed to sign token: {}", err);
            AuthError::Signing
        })
    }

    pub fn verify(&self, token: &str) -> Result<UserId, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())
            .map_err(|_| AuthError::InvalidToken)?;
        ObjectId::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidToken)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = SaltString::encode_b64(&salt).map_err(|_| AuthError::Hashing)?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::Hashing)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// Checks a login attempt. With no stored hash the password is still run
/// through Argon2 against a throwaway hash, and the attempt fails.
pub fn verify_login(stored_hash: Option<&str>, password: &str) -> bool {
    match stored_hash {
        Some(hash) => verify_password(hash, password),
        None => {
            let dummy = DUMMY_HASH.get_or_init(|| hash_password("not-a-real-password").ok());
            if let Some(hash) = dummy {
                verify_password(hash, password);
            }
            false
        }
    }
}

fn bearer_token(request: &HttpRequest) -> Option<&str> {
    let authorization = request
        .headers()
        .get(actix_web::http::header::AUTHORIZATION)
        .map(HeaderValue::to_str)?
        .ok()?;
    authorization
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// The user a request is authenticated as.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AuthUser(pub UserId);

fn authenticate(request: &HttpRequest) -> Result<AuthUser, AppError> {
    let state = request
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::Internal("application state is not registered".to_string()))?;
    let token = bearer_token(request).ok_or(AuthError::MissingToken)?;
    Ok(AuthUser(state.tokens.verify(token)?))
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(request: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(request))
    }
}
