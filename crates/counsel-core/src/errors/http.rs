// ABOUTME: axum integration for AppError
// ABOUTME: Renders errors as JSON bodies and converts extractor rejections into validation errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::{AppError, ErrorCode, ErrorResponse, FieldError};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(error.code = ?self.code, error.message = %self.message, "request failed");
        } else {
            tracing::debug!(error.code = ?self.code, error.message = %self.message, "request rejected");
        }

        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let code = match &rejection {
            JsonRejection::MissingJsonContentType(_) => ErrorCode::InvalidFormat,
            _ => ErrorCode::InvalidInput,
        };
        let field = FieldError::new("body", rejection.body_text());
        let mut error = Self::validation(vec![field]);
        error.code = code;
        error
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        Self::validation(vec![FieldError::new("query", rejection.body_text())])
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        Self::validation(vec![FieldError::new("path", rejection.body_text())])
    }
}
