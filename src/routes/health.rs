// ABOUTME: Health check route for service monitoring
// ABOUTME: Unauthenticated liveness endpoint reporting service name and version
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use crate::constants::service_names;
use axum::{routing::get, Json, Router};

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create the health check route
    pub fn routes() -> Router {
        async fn health_handler() -> Json<serde_json::Value> {
            Json(serde_json::json!({
                "status": "healthy",
                "service": service_names::COUNSEL_REVIEW_SERVER,
                "version": service_names::SERVER_VERSION,
            }))
        }

        Router::new().route("/health", get(health_handler))
    }
}
