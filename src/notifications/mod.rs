// ABOUTME: User notifications sent outside the request/response cycle
// ABOUTME: Currently the analysis-complete email
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

/// Email delivery
pub mod email;

use crate::config::EmailConfig;
use counsel_core::errors::AppResult;
pub use email::{
    render_analysis_complete_email, Delivery, EmailMessage, LogMailer, Mailer, SmtpMailer,
};
use std::sync::Arc;

/// SMTP mailer when a relay is configured, otherwise the log-only mailer
pub fn mailer_from_config(config: &EmailConfig) -> AppResult<Arc<dyn Mailer>> {
    if config.is_enabled() {
        Ok(Arc::new(SmtpMailer::new(config)?))
    } else {
        Ok(Arc::new(LogMailer))
    }
}
