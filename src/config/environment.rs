// ABOUTME: Environment configuration management for deployment-specific settings
// ABOUTME: Reads .env and process environment into a strongly typed ServerConfig
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! Environment-based configuration management

use crate::constants::{defaults, env_vars, limits, ports, timeouts};
use anyhow::{bail, Context, Result};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::time::Duration;
use tracing::{info, warn};

/// Deployment environment
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (random JWT secret allowed)
    #[default]
    Development,
    /// Production deployment
    Production,
    /// Automated tests
    Testing,
}

impl Environment {
    /// Parse from string with fallback
    #[must_use]
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "testing" | "test" => Self::Testing,
            _ => Self::Development,
        }
    }

    /// Check if this is a production environment
    #[must_use]
    pub const fn is_production(self) -> bool {
        matches!(self, Self::Production)
    }

    /// Check if this is a development environment
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Development => write!(f, "development"),
            Self::Production => write!(f, "production"),
            Self::Testing => write!(f, "testing"),
        }
    }
}

/// Database connection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// sqlx connection URL (`sqlite:...`)
    pub url: String,
}

/// Session and password hashing settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HS256 signing secret
    pub jwt_secret: String,
    /// Session lifetime in hours
    pub jwt_expiry_hours: i64,
    /// bcrypt work factor
    pub bcrypt_cost: u32,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"[REDACTED]")
            .field("jwt_expiry_hours", &self.jwt_expiry_hours)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

/// Analysis Service connection settings
#[derive(Clone, Serialize, Deserialize)]
pub struct AnalysisServiceConfig {
    /// Base URL; `/analyze` and `/detailed-chat` are appended
    pub base_url: String,
    /// Deadline for every outbound call
    pub timeout_ms: u64,
    /// Operator-wide credential used when the owner has no personal key
    pub default_api_key: Option<String>,
}

impl AnalysisServiceConfig {
    /// Outbound call deadline
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl fmt::Debug for AnalysisServiceConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalysisServiceConfig")
            .field("base_url", &self.base_url)
            .field("timeout_ms", &self.timeout_ms)
            .field(
                "default_api_key",
                &self.default_api_key.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

/// Transcript and chat limits
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AnalysisLimits {
    /// Trimmed character count at which analysis moves to the background
    pub long_text_threshold: usize,
    /// Maximum transcript length in characters
    pub max_text_length: usize,
    /// Chat turns returned and forwarded per (aspect, statement)
    pub max_chat_history: usize,
}

impl Default for AnalysisLimits {
    fn default() -> Self {
        Self {
            long_text_threshold: limits::LONG_TEXT_THRESHOLD_CHARS,
            max_text_length: limits::MAX_TEXT_LENGTH_CHARS,
            max_chat_history: limits::MAX_CHAT_HISTORY,
        }
    }
}

/// Completion email settings
#[derive(Clone, Serialize, Deserialize)]
pub struct EmailConfig {
    /// SMTP relay; email is skipped when unset
    pub smtp_host: Option<String>,
    /// SMTP port
    pub smtp_port: u16,
    /// SMTP username
    pub smtp_user: Option<String>,
    /// SMTP password
    pub smtp_pass: Option<String>,
    /// Sender address (falls back to `smtp_user`)
    pub from_address: Option<String>,
    /// Public front-end URL used to build analysis links
    pub app_base_url: String,
}

impl EmailConfig {
    /// Whether an SMTP relay is configured
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.smtp_host.is_some()
    }

    /// Link to a conversation's analysis page
    #[must_use]
    pub fn analysis_link(&self, conversation_id: &str) -> String {
        format!(
            "{}/analysis/{conversation_id}",
            self.app_base_url.trim_end_matches('/')
        )
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: None,
            smtp_port: defaults::DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_pass: None,
            from_address: None,
            app_base_url: defaults::DEFAULT_APP_BASE_URL.to_owned(),
        }
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("smtp_user", &self.smtp_user)
            .field("smtp_pass", &self.smtp_pass.as_ref().map(|_| "[REDACTED]"))
            .field("from_address", &self.from_address)
            .field("app_base_url", &self.app_base_url)
            .finish()
    }
}

/// CORS settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Allowed origins; `["*"]` allows any
    pub allowed_origins: Vec<String>,
}

impl CorsConfig {
    /// Whether any origin is allowed
    #[must_use]
    pub fn allows_any(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == "*")
    }
}

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen port
    pub http_port: u16,
    /// HTTP listen address
    pub host: String,
    /// Deployment environment
    pub environment: Environment,
    /// Database settings
    pub database: DatabaseConfig,
    /// Session settings
    pub auth: AuthConfig,
    /// Analysis Service settings
    pub analysis: AnalysisServiceConfig,
    /// Transcript and chat limits
    pub limits: AnalysisLimits,
    /// Completion email settings
    pub email: EmailConfig,
    /// CORS settings
    pub cors: CorsConfig,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        info!("Loading configuration from environment variables");

        if let Err(e) = dotenvy::dotenv() {
            warn!("No .env file found or failed to load: {}", e);
        }

        let environment =
            Environment::from_str_or_default(&env_var_or(env_vars::ENVIRONMENT, "development"));

        let config = Self {
            http_port: env_var_or(env_vars::HTTP_PORT, &ports::DEFAULT_HTTP_PORT.to_string())
                .parse()
                .context("Invalid HTTP_PORT value")?,
            host: env_var_or(env_vars::HOST, "0.0.0.0"),
            environment,
            database: DatabaseConfig {
                url: env_var_or(env_vars::DATABASE_URL, defaults::DEFAULT_DATABASE_URL),
            },
            auth: AuthConfig {
                jwt_secret: resolve_jwt_secret(environment)?,
                jwt_expiry_hours: env_var_or(
                    env_vars::JWT_EXPIRY_HOURS,
                    &limits::DEFAULT_JWT_EXPIRY_HOURS.to_string(),
                )
                .parse()
                .context("Invalid JWT_EXPIRY_HOURS value")?,
                bcrypt_cost: env_var_or(
                    env_vars::BCRYPT_COST,
                    &defaults::DEFAULT_BCRYPT_COST.to_string(),
                )
                .parse()
                .context("Invalid BCRYPT_COST value")?,
            },
            analysis: AnalysisServiceConfig {
                base_url: env_var_or(env_vars::ANALYSIS_API_URL, defaults::DEFAULT_ANALYSIS_API_URL),
                timeout_ms: env_var_or(
                    env_vars::ANALYSIS_API_TIMEOUT_MS,
                    &timeouts::DEFAULT_ANALYSIS_TIMEOUT_MS.to_string(),
                )
                .parse()
                .context("Invalid ANALYSIS_API_TIMEOUT_MS value")?,
                default_api_key: optional_env_var(env_vars::OPENAI_API_KEY),
            },
            limits: AnalysisLimits {
                long_text_threshold: env_var_or(
                    env_vars::LONG_TEXT_THRESHOLD,
                    &limits::LONG_TEXT_THRESHOLD_CHARS.to_string(),
                )
                .parse()
                .context("Invalid LONG_TEXT_THRESHOLD value")?,
                max_text_length: env_var_or(
                    env_vars::MAX_TEXT_LENGTH,
                    &limits::MAX_TEXT_LENGTH_CHARS.to_string(),
                )
                .parse()
                .context("Invalid MAX_TEXT_LENGTH value")?,
                max_chat_history: env_var_or(
                    env_vars::MAX_CHAT_HISTORY,
                    &limits::MAX_CHAT_HISTORY.to_string(),
                )
                .parse()
                .context("Invalid MAX_CHAT_HISTORY value")?,
            },
            email: EmailConfig {
                smtp_host: optional_env_var(env_vars::SMTP_HOST),
                smtp_port: env_var_or(
                    env_vars::SMTP_PORT,
                    &defaults::DEFAULT_SMTP_PORT.to_string(),
                )
                .parse()
                .context("Invalid SMTP_PORT value")?,
                smtp_user: optional_env_var(env_vars::SMTP_USER),
                smtp_pass: optional_env_var(env_vars::SMTP_PASS),
                from_address: optional_env_var(env_vars::SMTP_FROM),
                app_base_url: env_var_or(env_vars::APP_BASE_URL, defaults::DEFAULT_APP_BASE_URL),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&env_var_or(env_vars::CORS_ORIGINS, "*")),
            },
        };

        config.validate()?;
        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.limits.max_text_length == 0 {
            bail!("MAX_TEXT_LENGTH must be greater than zero");
        }
        if self.limits.long_text_threshold == 0 {
            bail!("LONG_TEXT_THRESHOLD must be greater than zero");
        }
        if self.limits.long_text_threshold > self.limits.max_text_length {
            bail!(
                "LONG_TEXT_THRESHOLD ({}) must not exceed MAX_TEXT_LENGTH ({})",
                self.limits.long_text_threshold,
                self.limits.max_text_length
            );
        }
        if self.limits.max_chat_history == 0 {
            bail!("MAX_CHAT_HISTORY must be greater than zero");
        }
        if self.analysis.timeout_ms == 0 {
            bail!("ANALYSIS_API_TIMEOUT_MS must be greater than zero");
        }
        if self.auth.jwt_expiry_hours <= 0 {
            bail!("JWT_EXPIRY_HOURS must be positive");
        }
        if !(4..=31).contains(&self.auth.bcrypt_cost) {
            bail!("BCRYPT_COST must be between 4 and 31");
        }
        Ok(())
    }

    /// Get a summary of the configuration for logging (without secrets)
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "Counsel Review Server Configuration:\n\
             - Environment: {}\n\
             - HTTP Listen: {}:{}\n\
             - Database: {}\n\
             - Analysis Service: {} (timeout {}ms, default key: {})\n\
             - Long Text Threshold: {} chars\n\
             - Max Text Length: {} chars\n\
             - Max Chat History: {}\n\
             - Email Notifications: {}\n\
             - CORS Origins: {}",
            self.environment,
            self.host,
            self.http_port,
            self.database.url,
            self.analysis.base_url,
            self.analysis.timeout_ms,
            if self.analysis.default_api_key.is_some() { "configured" } else { "none" },
            self.limits.long_text_threshold,
            self.limits.max_text_length,
            self.limits.max_chat_history,
            self.email
                .smtp_host
                .as_deref()
                .map_or_else(|| "disabled".to_owned(), |h| format!("{h}:{}", self.email.smtp_port)),
            self.cors.allowed_origins.join(", "),
        )
    }
}

/// Get environment variable or default value
fn env_var_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Get a non-empty environment variable
fn optional_env_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}

fn resolve_jwt_secret(environment: Environment) -> Result<String> {
    if let Some(secret) = optional_env_var(env_vars::JWT_SECRET) {
        return Ok(secret);
    }
    if environment.is_production() {
        bail!("JWT_SECRET must be set in production");
    }
    warn!("JWT_SECRET not set; generating a per-process secret (sessions will not survive restarts)");
    Ok(generate_secret())
}

/// Random alphanumeric secret for development sessions
#[must_use]
pub fn generate_secret() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(64)
        .map(char::from)
        .collect()
}

/// Parse comma-separated CORS origins
fn parse_origins(origins_str: &str) -> Vec<String> {
    if origins_str.trim() == "*" {
        vec!["*".to_owned()]
    } else {
        origins_str
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
