// ABOUTME: Resolves which AI credential an Analysis Service call uses
// ABOUTME: The owner's personal key wins, then the operator-wide default, else a configuration error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Counsel Review Contributors

use crate::constants::{defaults::API_KEY_PREVIEW_PREFIX, limits::API_KEY_PREVIEW_CHARS};
use crate::external::ApiCredential;
use counsel_core::errors::{AppError, AppResult};

/// Pick the credential for a call on behalf of a conversation owner
///
/// Blank keys count as unset.
pub fn resolve_credential(
    personal_key: Option<&str>,
    default_key: Option<&str>,
) -> AppResult<ApiCredential> {
    personal_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| default_key.filter(|k| !k.trim().is_empty()))
        .map(ApiCredential::new)
        .ok_or_else(|| {
            AppError::config_missing(
                "No AI API key is configured. Set a personal API key or contact an administrator.",
            )
        })
}

/// Masked form of a personal key: `sk-...` followed by its last four characters
#[must_use]
pub fn api_key_preview(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    let tail: String = chars[chars.len().saturating_sub(API_KEY_PREVIEW_CHARS)..]
        .iter()
        .collect();
    format!("{API_KEY_PREVIEW_PREFIX}{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use counsel_core::errors::ErrorCode;

    #[test]
    fn test_personal_key_preferred() {
        let credential = resolve_credential(Some("sk-personal"), Some("sk-default")).unwrap();
        assert_eq!(credential.expose(), "sk-personal");
    }

    #[test]
    fn test_default_used_when_personal_missing_or_blank() {
        assert_eq!(
            resolve_credential(None, Some("sk-default")).unwrap().expose(),
            "sk-default"
        );
        assert_eq!(
            resolve_credential(Some("  "), Some("sk-default")).unwrap().expose(),
            "sk-default"
        );
    }

    #[test]
    fn test_no_credential_is_config_error() {
        let err = resolve_credential(None, None).unwrap_err();
        assert_eq!(err.code, ErrorCode::ConfigMissing);
        assert_eq!(err.http_status(), 500);
    }

    #[test]
    fn test_preview_shows_last_four() {
        assert_eq!(api_key_preview("sk-proj-abcdef1234"), "sk-...1234");
        assert_eq!(api_key_preview("xyz"), "sk-...xyz");
    }
}
