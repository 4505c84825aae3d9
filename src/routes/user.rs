// ABOUTME: Per-user settings route handlers
// ABOUTME: Personal Analysis Service API key management and display-name profile
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use super::{MessageResponse, UserSummary, Validator};
use crate::constants::limits::{MAX_API_KEY_LENGTH_CHARS, MAX_DISPLAY_NAME_LENGTH_CHARS};
use crate::database::UserRecord;
use crate::middleware::authenticate;
use crate::resources::ServerResources;
use crate::services::api_key_preview;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use counsel_core::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Body of `PUT /user/api-key`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetApiKeyRequest {
    /// The key to store
    pub api_key: Option<String>,
}

/// Body of `GET /user/api-key`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyStatus {
    /// Whether a personal key is stored
    pub has_api_key: bool,
    /// Masked key, `null` when none is stored
    pub api_key_preview: Option<String>,
}

/// Body of `PUT /user/profile`
#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    /// New display name
    pub name: Option<String>,
}

/// Body of `GET /user/profile`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    /// User id
    pub id: String,
    /// Login email
    pub email: String,
    /// Display name
    pub name: Option<String>,
    /// Account creation time
    pub created_at: String,
    /// Last profile or key change
    pub updated_at: String,
}

/// Update acknowledgement carrying the refreshed account
#[derive(Debug, Serialize)]
pub struct UserUpdatedResponse {
    /// Human-readable outcome
    pub message: String,
    /// The account after the update
    pub user: UserSummary,
}

/// User settings routes
pub struct UserRoutes;

impl UserRoutes {
    /// Create all user settings routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(
                "/user/api-key",
                get(Self::handle_get_api_key)
                    .put(Self::handle_set_api_key)
                    .delete(Self::handle_delete_api_key),
            )
            .route(
                "/user/profile",
                get(Self::handle_get_profile).put(Self::handle_update_profile),
            )
            .with_state(resources)
    }

    async fn current_user(resources: &ServerResources, user_id: &str) -> AppResult<UserRecord> {
        resources
            .database
            .get_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))
    }

    async fn handle_get_api_key(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> AppResult<Json<ApiKeyStatus>> {
        let auth = authenticate(&headers, &resources)?;
        let user = Self::current_user(&resources, &auth.user_id).await?;

        let key = user.api_key.as_deref().filter(|k| !k.trim().is_empty());
        Ok(Json(ApiKeyStatus {
            has_api_key: key.is_some(),
            api_key_preview: key.map(api_key_preview),
        }))
    }

    async fn handle_set_api_key(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<SetApiKeyRequest>, JsonRejection>,
    ) -> AppResult<Response> {
        let auth = authenticate(&headers, &resources)?;
        let Json(request) = body?;

        let mut v = Validator::new();
        let api_key = v.require("apiKey", request.api_key.map(|k| k.trim().to_owned()));
        if let Some(key) = &api_key {
            v.length("apiKey", key, 1, MAX_API_KEY_LENGTH_CHARS);
        }
        v.finish()?;
        let Some(api_key) = api_key else {
            return Err(AppError::internal("validated fields missing"));
        };

        if !resources
            .database
            .set_user_api_key(&auth.user_id, Some(&api_key))
            .await?
        {
            return Err(AppError::not_found("User"));
        }
        info!(user.id = %auth.user_id, "Personal API key updated");

        let user = Self::current_user(&resources, &auth.user_id).await?;
        Ok(Json(UserUpdatedResponse {
            message: "API key updated successfully".to_owned(),
            user: UserSummary::from(&user),
        })
        .into_response())
    }

    async fn handle_delete_api_key(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> AppResult<Json<MessageResponse>> {
        let auth = authenticate(&headers, &resources)?;

        if !resources
            .database
            .set_user_api_key(&auth.user_id, None)
            .await?
        {
            return Err(AppError::not_found("User"));
        }
        info!(user.id = %auth.user_id, "Personal API key removed");

        Ok(Json(MessageResponse::new("API key deleted successfully")))
    }

    async fn handle_get_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> AppResult<Json<ProfileResponse>> {
        let auth = authenticate(&headers, &resources)?;
        let user = Self::current_user(&resources, &auth.user_id).await?;

        Ok(Json(ProfileResponse {
            id: user.id,
            email: user.email,
            name: user.display_name,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }))
    }

    async fn handle_update_profile(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Result<Json<UpdateProfileRequest>, JsonRejection>,
    ) -> AppResult<Json<UserUpdatedResponse>> {
        let auth = authenticate(&headers, &resources)?;
        let Json(request) = body?;

        let mut v = Validator::new();
        let name = v.require("name", request.name.map(|n| n.trim().to_owned()));
        if let Some(name) = &name {
            v.length("name", name, 1, MAX_DISPLAY_NAME_LENGTH_CHARS);
        }
        v.finish()?;
        let Some(name) = name else {
            return Err(AppError::internal("validated fields missing"));
        };

        if !resources
            .database
            .update_display_name(&auth.user_id, &name)
            .await?
        {
            return Err(AppError::not_found("User"));
        }

        let user = Self::current_user(&resources, &auth.user_id).await?;
        Ok(Json(UserUpdatedResponse {
            message: "Profile updated successfully".to_owned(),
            user: UserSummary::from(&user),
        }))
    }
}
