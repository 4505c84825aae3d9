// ABOUTME: Shared server resources handed to every route and background job
// ABOUTME: Database, auth manager, Analysis Service client, mailer, and configuration behind Arcs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

//! # Server Resources
//!
//! Everything a handler needs is created once at start-up and shared by
//! reference counting. The Analysis Service and mailer are trait objects so
//! tests can substitute their own implementations.

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database::Database;
use crate::external::{AnalysisService, HttpAnalysisService};
use crate::notifications::{mailer_from_config, Mailer};
use counsel_core::errors::AppResult;
use std::sync::Arc;

/// Centralized resource container
#[derive(Clone)]
pub struct ServerResources {
    /// Persistent storage
    pub database: Arc<Database>,
    /// Session tokens and password hashing
    pub auth_manager: Arc<AuthManager>,
    /// Analysis Service client
    pub analysis_service: Arc<dyn AnalysisService>,
    /// Completion email delivery
    pub mailer: Arc<dyn Mailer>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
}

impl ServerResources {
    /// Assemble resources from explicit parts
    #[must_use]
    pub fn new(
        database: Database,
        config: Arc<ServerConfig>,
        analysis_service: Arc<dyn AnalysisService>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let auth_manager = AuthManager::new(&config.auth);
        Self {
            database: Arc::new(database),
            auth_manager: Arc::new(auth_manager),
            analysis_service,
            mailer,
            config,
        }
    }

    /// Production resources: HTTP Analysis Service client and SMTP (or log) mailer
    pub fn from_config(database: Database, config: Arc<ServerConfig>) -> AppResult<Self> {
        let analysis_service: Arc<dyn AnalysisService> =
            Arc::new(HttpAnalysisService::new(&config.analysis)?);
        let mailer = mailer_from_config(&config.email)?;
        Ok(Self::new(database, config, analysis_service, mailer))
    }
}
