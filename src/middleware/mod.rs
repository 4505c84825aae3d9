// ABOUTME: HTTP middleware for authentication and cross-origin access
// ABOUTME: Explicit per-handler authentication plus the CORS layer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

/// Session authentication
pub mod auth;
/// CORS configuration
pub mod cors;

pub use auth::{authenticate, AuthenticatedUser};
pub use cors::setup_cors;
