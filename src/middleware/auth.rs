// ABOUTME: Per-request authentication producing an explicit AuthenticatedUser principal
// ABOUTME: Reads the session JWT from the Authorization header or the auth_token cookie
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use crate::constants::cookies::AUTH_COOKIE_NAME;
use crate::resources::ServerResources;
use counsel_core::errors::{AppError, AppResult};
use http::header::{AUTHORIZATION, COOKIE};
use http::HeaderMap;

/// The caller of a request, established from its session token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    /// User `ID` (`sub` claim)
    pub user_id: String,
    /// Email at the time the token was issued
    pub email: String,
}

/// Read a cookie value from the `Cookie` request headers
#[must_use]
pub fn get_cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_owned())
        .filter(|value| !value.is_empty())
}

/// Session token from `Authorization: Bearer` (preferred) or the session cookie
#[must_use]
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToOwned::to_owned);

    bearer.or_else(|| get_cookie_value(headers, AUTH_COOKIE_NAME))
}

/// Authenticate a request
///
/// Fails with `AuthRequired` when no token is present and `AuthInvalid` when the
/// token does not validate.
pub fn authenticate(headers: &HeaderMap, resources: &ServerResources) -> AppResult<AuthenticatedUser> {
    let token = extract_token(headers).ok_or_else(AppError::auth_required)?;
    let claims = resources.auth_manager.validate_token(&token)?;

    Ok(AuthenticatedUser {
        user_id: claims.sub,
        email: claims.email,
    })
}
