// ABOUTME: Core types for the counseling transcript review platform
// ABOUTME: Foundation crate with error handling and the analysis domain model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

#![deny(unsafe_code)]

//! # Counsel Core
//!
//! Foundation crate providing shared types for the counsel review service.
//! This crate is designed to change infrequently, enabling incremental
//! compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **models**: Evaluation axes, analysis payloads, and conversation status

/// Unified error handling system with standard error codes and HTTP responses
pub mod errors;

/// Domain models shared between persistence, the Analysis Service client and routes
pub mod models;
