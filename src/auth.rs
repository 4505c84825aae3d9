// ABOUTME: JWT session tokens and password hashing for user authentication
// ABOUTME: HS256 tokens carried in a Bearer header or the auth_token cookie
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Authentication and Session Management
//!
//! Sessions are stateless HS256 JWTs. Passwords are hashed with bcrypt on the
//! blocking pool so hashing never stalls the async runtime.

use crate::config::AuthConfig;
use crate::constants::{cookies, service_names};
use crate::database::UserRecord;
use chrono::{DateTime, Duration, Utc};
use counsel_core::errors::{AppError, AppResult};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// `JWT` validation failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token has expired
    #[error("JWT token has expired")]
    TokenExpired,
    /// Token signature or claims are invalid
    #[error("JWT token is invalid: {reason}")]
    TokenInvalid {
        /// Reason for invalidity
        reason: String,
    },
    /// Token is not a well-formed `JWT`
    #[error("JWT token is malformed: {details}")]
    TokenMalformed {
        /// Details about malformation
        details: String,
    },
}

impl From<JwtValidationError> for AppError {
    fn from(error: JwtValidationError) -> Self {
        match error {
            JwtValidationError::TokenExpired => Self::auth_invalid("Session expired"),
            _ => Self::auth_invalid("Invalid session token"),
        }
    }
}

/// `JWT` claims for user authentication
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User `ID`
    pub sub: String,
    /// User email
    pub email: String,
    /// Issued at timestamp
    pub iat: i64,
    /// Expiration timestamp
    pub exp: i64,
    /// Audience
    pub aud: String,
}

/// Issued session token
#[derive(Debug, Clone)]
pub struct SessionToken {
    /// Encoded JWT
    pub token: String,
    /// When the token stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Token issuing, token validation, and password hashing
#[derive(Clone)]
pub struct AuthManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expiry_hours: i64,
    bcrypt_cost: u32,
}

impl AuthManager {
    /// Create an auth manager from configuration
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            expiry_hours: config.jwt_expiry_hours,
            bcrypt_cost: config.bcrypt_cost,
        }
    }

    /// Session lifetime in seconds (cookie `Max-Age`)
    #[must_use]
    pub const fn session_max_age_secs(&self) -> i64 {
        self.expiry_hours * 3600
    }

    /// Issue a session token for `user`
    pub fn generate_token(&self, user: &UserRecord) -> AppResult<SessionToken> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(self.expiry_hours);
        let claims = Claims {
            sub: user.id.clone(),
            email: user.email.clone(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            aud: service_names::JWT_AUDIENCE.to_owned(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign session token: {e}")))?;

        Ok(SessionToken { token, expires_at })
    }

    /// Validate a session token and return its claims
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtValidationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[service_names::JWT_AUDIENCE]);
        validation.leeway = 0;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|e| Self::convert_jwt_error(&e))
    }

    fn convert_jwt_error(e: &jsonwebtoken::errors::Error) -> JwtValidationError {
        tracing::debug!("JWT token validation failed: {e}");
        match e.kind() {
            ErrorKind::ExpiredSignature => JwtValidationError::TokenExpired,
            ErrorKind::InvalidSignature => JwtValidationError::TokenInvalid {
                reason: "Token signature verification failed".into(),
            },
            ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                JwtValidationError::TokenMalformed {
                    details: e.to_string(),
                }
            }
            _ => JwtValidationError::TokenInvalid {
                reason: e.to_string(),
            },
        }
    }

    /// Hash a password with the configured bcrypt cost
    pub async fn hash_password(&self, password: &str) -> AppResult<String> {
        let password = password.to_owned();
        let cost = self.bcrypt_cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| AppError::internal(format!("Password hashing task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))
    }

    /// Check a password against a stored bcrypt hash
    pub async fn verify_password(&self, password: &str, hash: &str) -> AppResult<bool> {
        let password = password.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("Password verification task failed: {e}")))?
            .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))
    }

    /// `Set-Cookie` value carrying a fresh session token
    #[must_use]
    pub fn session_cookie(&self, token: &str) -> String {
        format!(
            "{}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            cookies::AUTH_COOKIE_NAME,
            self.session_max_age_secs()
        )
    }

    /// `Set-Cookie` value that removes the session cookie
    #[must_use]
    pub fn clear_session_cookie() -> String {
        format!(
            "{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0",
            cookies::AUTH_COOKIE_NAME
        )
    }
}
