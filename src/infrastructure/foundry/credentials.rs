//! Authentication for Foundry requests
//!
//! Supports a static `api-key` header, a static bearer token, and tokens
//! obtained from the Azure CLI. CLI tokens are cached until shortly before
//! they expire.

use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use reqwest::RequestBuilder;
use serde::Deserialize;
use std::fmt;
use tokio::process::Command;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::domain::errors::RuntimeError;
use crate::domain::models::{AuthConfig, AuthMode};

/// Token audience for Foundry projects
pub const FOUNDRY_RESOURCE: &str = "https://ai.azure.com";

/// Refresh cached tokens this long before they expire
const REFRESH_MARGIN_MINUTES: i64 = 5;

/// Fallback lifetime when the CLI output has no usable expiry
const DEFAULT_TOKEN_LIFETIME_MINUTES: i64 = 50;

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + ChronoDuration::minutes(REFRESH_MARGIN_MINUTES) < self.expires_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliToken {
    access_token: String,
    /// Unix seconds; present in recent CLI versions
    #[serde(default, rename = "expires_on")]
    expires_on: Option<i64>,
}

/// Credential source for outgoing requests
pub enum Credential {
    ApiKey(String),
    Bearer(String),
    AzureCli {
        program: String,
        cache: Mutex<Option<CachedToken>>,
    },
    None,
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("ApiKey(***)"),
            Self::Bearer(_) => f.write_str("Bearer(***)"),
            Self::AzureCli { program, .. } => write!(f, "AzureCli({program})"),
            Self::None => f.write_str("None"),
        }
    }
}

impl Credential {
    /// Build the credential described by `config`
    pub fn from_config(config: &AuthConfig) -> Result<Self, RuntimeError> {
        let non_blank = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        match config.mode {
            AuthMode::ApiKey => non_blank(&config.api_key)
                .map(Self::ApiKey)
                .ok_or_else(|| RuntimeError::Credential("auth.api_key is not set".to_string())),
            AuthMode::Bearer => non_blank(&config.token)
                .map(Self::Bearer)
                .ok_or_else(|| RuntimeError::Credential("auth.token is not set".to_string())),
            AuthMode::AzureCli => Ok(Self::azure_cli("az")),
            AuthMode::None => Ok(Self::None),
        }
    }

    /// Azure CLI credential using `program` as the `az` executable
    pub fn azure_cli(program: impl Into<String>) -> Self {
        Self::AzureCli {
            program: program.into(),
            cache: Mutex::new(None),
        }
    }

    /// Attach authentication to a request
    pub async fn apply(&self, request: RequestBuilder) -> Result<RequestBuilder, RuntimeError> {
        match self {
            Self::ApiKey(key) => Ok(request.header("api-key", key)),
            Self::Bearer(token) => Ok(request.bearer_auth(token)),
            Self::AzureCli { program, cache } => {
                let mut cached = cache.lock().await;
                let now = Utc::now();
                if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(now)) {
                    return Ok(request.bearer_auth(&token.token));
                }
                let fresh = fetch_cli_token(program).await?;
                let header = request.bearer_auth(&fresh.token);
                *cached = Some(fresh);
                Ok(header)
            }
            Self::None => Ok(request),
        }
    }
}

async fn fetch_cli_token(program: &str) -> Result<CachedToken, RuntimeError> {
    debug!(program, resource = FOUNDRY_RESOURCE, "Requesting access token from Azure CLI");
    let output = Command::new(program)
        .args([
            "account",
            "get-access-token",
            "--resource",
            FOUNDRY_RESOURCE,
            "--output",
            "json",
        ])
        .output()
        .await
        .map_err(|e| RuntimeError::Credential(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        warn!(status = ?output.status, "Azure CLI token request failed");
        return Err(RuntimeError::Credential(format!(
            "{program} account get-access-token failed: {}",
            stderr.trim()
        )));
    }

    parse_cli_token(&output.stdout, Utc::now())
}

fn parse_cli_token(stdout: &[u8], now: DateTime<Utc>) -> Result<CachedToken, RuntimeError> {
    let parsed: CliToken = serde_json::from_slice(stdout)
        .map_err(|e| RuntimeError::Credential(format!("unexpected Azure CLI output: {e}")))?;
    let expires_at = parsed
        .expires_on
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
        .unwrap_or_else(|| now + ChronoDuration::minutes(DEFAULT_TOKEN_LIFETIME_MINUTES));
    Ok(CachedToken {
        token: parsed.access_token,
        expires_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_requires_value() {
        let config = AuthConfig {
            mode: AuthMode::ApiKey,
            api_key: Some("  ".to_string()),
            token: None,
        };
        assert!(matches!(
            Credential::from_config(&config),
            Err(RuntimeError::Credential(_))
        ));

        let config = AuthConfig {
            api_key: Some("secret".to_string()),
            ..config
        };
        assert!(matches!(
            Credential::from_config(&config),
            Ok(Credential::ApiKey(ref key)) if key == "secret"
        ));
    }

    #[test]
    fn test_parse_cli_token_uses_unix_expiry() {
        let now = Utc::now();
        let expires = now.timestamp() + 3600;
        let stdout = format!(
            r#"{{"accessToken": "eyJ0", "expiresOn": "2030-01-01 10:00:00.000000", "expires_on": {expires}, "tokenType": "Bearer"}}"#
        );
        let token = parse_cli_token(stdout.as_bytes(), now).unwrap();
        assert_eq!(token.token, "eyJ0");
        assert_eq!(token.expires_at.timestamp(), expires);
        assert!(token.is_fresh(now));
    }

    #[test]
    fn test_token_near_expiry_is_stale() {
        let now = Utc::now();
        let token = CachedToken {
            token: "t".to_string(),
            expires_at: now + ChronoDuration::minutes(4),
        };
        assert!(!token.is_fresh(now));
    }

    #[tokio::test]
    async fn test_missing_cli_is_credential_error() {
        let credential = Credential::azure_cli("definitely-not-an-az-binary");
        let request = reqwest::Client::new().get("http://localhost");
        let err = credential.apply(request).await.unwrap_err();
        assert!(matches!(err, RuntimeError::Credential(_)));
        assert!(!err.is_transient());
    }
}
