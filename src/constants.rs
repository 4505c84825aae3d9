// ABOUTME: System-wide constants and configuration defaults for the counsel review API
// ABOUTME: Default limits, ports, service names, and environment variable names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Constants Module
//!
//! Hardcoded defaults. Everything here that an operator may want to change is
//! also overridable through [`crate::config::environment::ServerConfig`].

/// Service identity used in logs and health responses
pub mod service_names {
    /// Service name
    pub const COUNSEL_REVIEW_SERVER: &str = "counsel-review-server";
    /// Display name of the external analysis collaborator (used in error messages)
    pub const ANALYSIS_SERVICE: &str = "Analysis Service";
    /// JWT audience
    pub const JWT_AUDIENCE: &str = "counsel-review";
    /// Server version from Cargo.toml
    pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
}

/// Default ports
pub mod ports {
    /// Default `HTTP` server port
    pub const DEFAULT_HTTP_PORT: u16 = 8081;
}

/// Request and content limits
pub mod limits {
    /// Trimmed transcripts at or above this many characters are analysed in the background
    ///
    /// Transcripts of up to 2000 characters are still analysed inline.
    pub const LONG_TEXT_THRESHOLD_CHARS: usize = 2001;
    /// Maximum accepted transcript length in characters
    pub const MAX_TEXT_LENGTH_CHARS: usize = 10_000;
    /// Maximum chat turns returned or forwarded per (aspect, statement) pair
    pub const MAX_CHAT_HISTORY: usize = 50;
    /// Maximum follow-up question length in characters
    pub const MAX_QUESTION_LENGTH_CHARS: usize = 1000;
    /// Maximum personal API key length
    pub const MAX_API_KEY_LENGTH_CHARS: usize = 200;
    /// Maximum display name length
    pub const MAX_DISPLAY_NAME_LENGTH_CHARS: usize = 100;
    /// Minimum password length
    pub const MIN_PASSWORD_LENGTH_CHARS: usize = 6;
    /// Characters of a transcript statement used to locate it in the transcript
    pub const STATEMENT_MATCH_PREFIX_CHARS: usize = 50;
    /// Trailing characters of a personal key exposed in previews
    pub const API_KEY_PREVIEW_CHARS: usize = 4;
    /// Default JWT lifetime
    pub const DEFAULT_JWT_EXPIRY_HOURS: i64 = 24;
}

/// Timeouts
pub mod timeouts {
    /// Default deadline for Analysis Service calls
    pub const DEFAULT_ANALYSIS_TIMEOUT_MS: u64 = 120_000;
    /// TCP connect timeout for Analysis Service calls
    pub const ANALYSIS_CONNECT_TIMEOUT_SECS: u64 = 10;
}

/// Defaults for external collaborators
pub mod defaults {
    /// Default Analysis Service base URL
    pub const DEFAULT_ANALYSIS_API_URL: &str = "http://localhost:8000";
    /// Default public URL of the web front end (used in email links)
    pub const DEFAULT_APP_BASE_URL: &str = "http://localhost:3000";
    /// Default SQLite database location
    pub const DEFAULT_DATABASE_URL: &str = "sqlite:./data/counsel_review.db";
    /// Default SMTP submission port
    pub const DEFAULT_SMTP_PORT: u16 = 587;
    /// Default bcrypt cost
    pub const DEFAULT_BCRYPT_COST: u32 = 12;
    /// Fallback chat answer when the Analysis Service returns an empty response
    pub const EMPTY_CHAT_RESPONSE_FALLBACK: &str = "An error occurred. Please try again.";
    /// Prefix shown before the last characters of a personal key
    pub const API_KEY_PREVIEW_PREFIX: &str = "sk-...";
}

/// Session cookie
pub mod cookies {
    /// Name of the cookie carrying the session JWT
    pub const AUTH_COOKIE_NAME: &str = "auth_token";
}

/// Environment variable names
pub mod env_vars {
    /// Listen port
    pub const HTTP_PORT: &str = "HTTP_PORT";
    /// Listen address
    pub const HOST: &str = "HOST";
    /// Database URL
    pub const DATABASE_URL: &str = "DATABASE_URL";
    /// Deployment environment
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    /// JWT signing secret
    pub const JWT_SECRET: &str = "JWT_SECRET";
    /// JWT lifetime
    pub const JWT_EXPIRY_HOURS: &str = "JWT_EXPIRY_HOURS";
    /// bcrypt cost
    pub const BCRYPT_COST: &str = "BCRYPT_COST";
    /// Analysis Service base URL
    pub const ANALYSIS_API_URL: &str = "ANALYSIS_API_URL";
    /// Analysis Service deadline in milliseconds
    pub const ANALYSIS_API_TIMEOUT_MS: &str = "ANALYSIS_API_TIMEOUT_MS";
    /// Operator-wide default AI credential
    pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
    /// Public front-end URL
    pub const APP_BASE_URL: &str = "APP_BASE_URL";
    /// Async analysis threshold
    pub const LONG_TEXT_THRESHOLD: &str = "LONG_TEXT_THRESHOLD";
    /// Transcript length limit
    pub const MAX_TEXT_LENGTH: &str = "MAX_TEXT_LENGTH";
    /// Chat history bound
    pub const MAX_CHAT_HISTORY: &str = "MAX_CHAT_HISTORY";
    /// SMTP relay host
    pub const SMTP_HOST: &str = "SMTP_HOST";
    /// SMTP relay port
    pub const SMTP_PORT: &str = "SMTP_PORT";
    /// SMTP username
    pub const SMTP_USER: &str = "SMTP_USER";
    /// SMTP password
    pub const SMTP_PASS: &str = "SMTP_PASS";
    /// Sender address
    pub const SMTP_FROM: &str = "SMTP_FROM";
    /// Allowed CORS origins, comma separated
    pub const CORS_ORIGINS: &str = "CORS_ORIGINS";
}
