// ABOUTME: Account registration and session route handlers
// ABOUTME: Register, login with a JWT session cookie, and logout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! Authentication routes
//!
//! Login issues an HS256 session token, returned both in the body and as the
//! `auth_token` cookie. Unknown emails and wrong passwords get the same answer.

use super::{MessageResponse, UserSummary, Validator};
use crate::auth::AuthManager;
use crate::constants::limits::{MAX_DISPLAY_NAME_LENGTH_CHARS, MIN_PASSWORD_LENGTH_CHARS};
use crate::logging::AppLogger;
use crate::resources::ServerResources;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use counsel_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Registration body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    /// Login email
    pub email: Option<String>,
    /// Plain-text password
    pub password: Option<String>,
    /// Optional display name
    pub name: Option<String>,
}

/// Login body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// Login email
    pub email: Option<String>,
    /// Plain-text password
    pub password: Option<String>,
}

/// Successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Session JWT
    pub token: String,
    /// RFC 3339 expiry
    pub expires_at: String,
    /// The account that logged in
    pub user: UserSummary,
}

/// Basic shape check: something before and after a single `@`, with a dot in the domain
fn is_valid_email(email: &str) -> bool {
    if email.len() <= 5 || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/register", post(Self::handle_register))
            .route("/auth/login", post(Self::handle_login))
            .route("/auth/logout", post(Self::handle_logout))
            .with_state(resources)
    }

    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<RegisterRequest>, JsonRejection>,
    ) -> AppResult<Response> {
        let Json(request) = body?;

        let mut v = Validator::new();
        let email = v.require("email", request.email.as_deref().map(normalize_email));
        if let Some(email) = &email {
            if !is_valid_email(email) {
                v.reject("email", "must be a valid email address");
            }
        }
        let password = v.require("password", request.password);
        if let Some(password) = &password {
            v.length("password", password, MIN_PASSWORD_LENGTH_CHARS, usize::MAX);
        }
        let name = request
            .name
            .map(|n| n.trim().to_owned())
            .filter(|n| !n.is_empty());
        if let Some(name) = &name {
            v.length("name", name, 1, MAX_DISPLAY_NAME_LENGTH_CHARS);
        }
        v.finish()?;

        let (Some(email), Some(password)) = (email, password) else {
            return Err(AppError::internal("validated fields missing"));
        };

        let hash = resources.auth_manager.hash_password(&password).await?;
        let user = resources
            .database
            .create_user(&email, &hash, name.as_deref())
            .await?;
        AppLogger::log_auth_event(&user.id, "register", true, None);

        Ok((StatusCode::CREATED, Json(UserSummary::from(&user))).into_response())
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
        body: Result<Json<LoginRequest>, JsonRejection>,
    ) -> AppResult<Response> {
        let Json(request) = body?;

        let mut v = Validator::new();
        let email = v.require("email", request.email.as_deref().map(normalize_email));
        let password = v.require("password", request.password);
        v.finish()?;
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AppError::internal("validated fields missing"));
        };

        let invalid = || AppError::auth_invalid("Invalid email or password");

        let Some(user) = resources.database.get_user_by_email(&email).await? else {
            AppLogger::log_auth_event("unknown", "login", false, Some("unknown email"));
            return Err(invalid());
        };
        if !resources
            .auth_manager
            .verify_password(&password, &user.password_hash)
            .await?
        {
            AppLogger::log_auth_event(&user.id, "login", false, Some("wrong password"));
            return Err(invalid());
        }

        let session = resources.auth_manager.generate_token(&user)?;
        AppLogger::log_auth_event(&user.id, "login", true, None);

        let cookie = resources.auth_manager.session_cookie(&session.token);
        let body = LoginResponse {
            token: session.token,
            expires_at: session.expires_at.to_rfc3339(),
            user: UserSummary::from(&user),
        };
        Ok(([(header::SET_COOKIE, cookie)], Json(body)).into_response())
    }

    async fn handle_logout() -> Response {
        (
            [(header::SET_COOKIE, AuthManager::clear_session_cookie())],
            Json(MessageResponse::new("Logged out successfully")),
        )
            .into_response()
    }
}
