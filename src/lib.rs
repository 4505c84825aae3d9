// ABOUTME: Main library entry point for the counsel review server
// ABOUTME: HTTP API for counseling transcript analysis with follow-up chat and email notification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

#![deny(unsafe_code)]

//! # Counsel Review Server
//!
//! Counselors submit conversation transcripts, an external Analysis Service
//! evaluates every statement along four axes (`cct`, `sst`, `empathy`,
//! `partnership`), and the counselor can ask follow-up questions about any
//! evaluated statement.
//!
//! ## Architecture
//!
//! - **Routes**: thin axum handlers that authenticate and validate
//! - **Services**: submission, background analysis jobs, statement reconciliation
//! - **Database**: SQLite persistence through `sqlx`
//! - **External**: Analysis Service HTTP client behind a trait
//! - **Notifications**: completion email through SMTP behind a trait
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use counsel_review::config::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Counsel review server configured with port: {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// Session tokens and password hashing
pub mod auth;

/// Environment-driven configuration
pub mod config;

/// Application constants
pub mod constants;

/// SQLite persistence
pub mod database;

/// Analysis Service client
pub mod external;

/// Structured logging
pub mod logging;

/// Request authentication and CORS
pub mod middleware;

/// Completion email delivery
pub mod notifications;

/// Shared server resources
pub mod resources;

/// HTTP routes
pub mod routes;

/// Business workflows
pub mod services;

pub use counsel_core::errors;
pub use counsel_core::models;
