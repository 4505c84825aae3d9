// ABOUTME: Route module organization for the counsel review HTTP API
// ABOUTME: Assembles domain routers, request tracing, and CORS into one axum Router
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! Route module for the counsel review server
//!
//! Each domain module holds route definitions and thin handlers that
//! authenticate, validate input, and delegate to the service layer.

/// Registration, login, and logout
pub mod auth;
/// Conversations, follow-up chat, and reconciled statements
pub mod conversations;
/// Health check
pub mod health;
/// Personal API key and profile
pub mod user;

pub use auth::AuthRoutes;
pub use conversations::ConversationRoutes;
pub use health::HealthRoutes;
pub use user::UserRoutes;

use crate::database::UserRecord;
use crate::middleware::setup_cors;
use crate::resources::ServerResources;
use axum::Router;
use counsel_core::errors::{AppError, AppResult, FieldError};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Build the complete application router
pub fn router(resources: Arc<ServerResources>) -> Router {
    let cors = setup_cors(&resources.config.cors);

    Router::new()
        .merge(HealthRoutes::routes())
        .merge(AuthRoutes::routes(Arc::clone(&resources)))
        .merge(ConversationRoutes::routes(Arc::clone(&resources)))
        .merge(UserRoutes::routes(resources))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Public view of an account
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    /// User id
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    pub name: Option<String>,
}

impl From<&UserRecord> for UserSummary {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id.clone(),
            email: user.email.clone(),
            name: user.display_name.clone(),
        }
    }
}

/// Body for endpoints that only report what happened
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    /// Human-readable outcome
    pub message: String,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Collects field-level validation failures for one request body
#[derive(Debug, Default)]
pub(crate) struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`
    pub(crate) fn reject(&mut self, field: &str, message: impl Into<String>) {
        self.errors.push(FieldError::new(field, message));
    }

    /// Require a present value, recording a failure otherwise
    pub(crate) fn require<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.reject(field, "is required");
        }
        value
    }

    /// Check a character-length range
    pub(crate) fn length(&mut self, field: &str, value: &str, min: usize, max: usize) {
        let len = value.chars().count();
        if len < min {
            if min == 1 {
                self.reject(field, "must not be empty");
            } else {
                self.reject(field, format!("must be at least {min} characters"));
            }
        } else if len > max {
            self.reject(field, format!("must be at most {max} characters"));
        }
    }

    /// `Ok` when nothing was rejected
    pub(crate) fn finish(self) -> AppResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(AppError::validation(self.errors))
        }
    }
}
