// ABOUTME: Analysis-complete email notifications over SMTP
// ABOUTME: Mailer seam with an SMTP transport and a log-only fallback when SMTP is not configured
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use crate::config::EmailConfig;
use async_trait::async_trait;
use counsel_core::errors::{AppError, AppResult};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::info;

/// Subject line of the completion email
pub const ANALYSIS_COMPLETE_SUBJECT: &str = "Conversation analysis complete";

/// SMTP port that uses implicit TLS instead of STARTTLS
const SMTPS_PORT: u16 = 465;

/// A rendered email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html: String,
}

/// What happened to a message handed to a [`Mailer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Accepted by the relay
    Sent,
    /// Not sent because no relay is configured
    Skipped,
}

/// Outbound email seam
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver `message`
    async fn send(&self, message: EmailMessage) -> AppResult<Delivery>;
}

/// Build the notification sent when background analysis completes
#[must_use]
pub fn render_analysis_complete_email(to: &str, analysis_url: &str) -> EmailMessage {
    let href = html_escape::encode_double_quoted_attribute(analysis_url);
    let html = format!(
        r#"
      <h2>Your conversation analysis is ready</h2>
      <p>Thank you for waiting. The analysis of your conversation has finished.</p>
      <p>Use the link below to review the results.</p>
      <p>
        <a href="{href}"
           style="display: inline-block; padding: 10px 20px; background-color: #000; color: #fff; text-decoration: none; border-radius: 5px;">
          View analysis
        </a>
      </p>
      <p>This message was sent automatically.</p>
      <hr>
      <p style="font-size: 12px; color: #666;">
        Conversation Analysis and Review
      </p>
    "#
    );

    EmailMessage {
        to: to.to_owned(),
        subject: ANALYSIS_COMPLETE_SUBJECT.to_owned(),
        html,
    }
}

/// SMTP delivery through `lettre`
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build an SMTP mailer; `config.smtp_host` must be set
    pub fn new(config: &EmailConfig) -> AppResult<Self> {
        let host = config
            .smtp_host
            .as_deref()
            .ok_or_else(|| AppError::config_missing("SMTP_HOST is not set"))?;

        let from_address = config
            .from_address
            .as_deref()
            .or(config.smtp_user.as_deref())
            .ok_or_else(|| AppError::config_missing("SMTP_FROM or SMTP_USER must be set"))?;
        let from: Mailbox = from_address
            .parse()
            .map_err(|e| AppError::config(format!("Invalid sender address {from_address}: {e}")))?;

        let builder = if config.smtp_port == SMTPS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::relay(host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
        }
        .map_err(|e| AppError::config(format!("Invalid SMTP relay {host}: {e}")))?
        .port(config.smtp_port);

        let builder = match (&config.smtp_user, &config.smtp_pass) {
            (Some(user), Some(pass)) => builder.credentials(Credentials::new(user.clone(), pass.clone())),
            _ => builder,
        };

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<Delivery> {
        let to: Mailbox = message
            .to
            .parse()
            .map_err(|e| AppError::invalid_input(format!("Invalid recipient address: {e}")))?;

        let email = Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(message.subject)
            .header(ContentType::TEXT_HTML)
            .body(message.html)
            .map_err(|e| AppError::internal(format!("Failed to build email: {e}")))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| AppError::external_service("SMTP", e.to_string()))?;

        info!(email.to = %message.to, "Email sent");
        Ok(Delivery::Sent)
    }
}

/// Mailer used when no SMTP relay is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: EmailMessage) -> AppResult<Delivery> {
        info!(
            email.to = %message.to,
            email.subject = %message.subject,
            "SMTP not configured; skipping email"
        );
        Ok(Delivery::Skipped)
    }
}
