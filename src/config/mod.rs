// ABOUTME: Configuration management module for centralized server settings
// ABOUTME: Re-exports the environment-driven ServerConfig and its sections
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! Configuration module for the counsel review server

/// Environment and server configuration
pub mod environment;

pub use environment::{
    AnalysisLimits, AnalysisServiceConfig, AuthConfig, CorsConfig, DatabaseConfig, EmailConfig,
    Environment, ServerConfig,
};
