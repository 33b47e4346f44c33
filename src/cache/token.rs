use super::{read_optional, remove_optional, write_private_file};
use crate::error::{Result, SsoError};
use crate::models::{SsoToken, CLI_TIME_FORMAT};
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use std::path::PathBuf;

/// Buffer applied to tokens read from the AWS CLI schema.
const CLI_TOKEN_EXPIRY_BUFFER_MINUTES: i64 = 5;

/// Client registrations are assumed valid for 90 days after the write.
const REGISTRATION_LIFETIME_DAYS: i64 = 90;

/// Token file layout shared with the AWS CLI and aws-sso-util.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenFile {
    #[serde(default)]
    start_url: String,
    #[serde(default)]
    region: String,
    access_token: String,
    expires_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    received_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    registration_expires_at: Option<String>,
}

/// A token recovered from disk plus the expiry buffer its schema calls for.
#[derive(Debug)]
struct DecodedToken {
    token: SsoToken,
    expiry_buffer: Duration,
}

type TokenDecoder = fn(&[u8]) -> Result<DecodedToken>;

/// Tried in order; the first decoder that accepts the bytes wins.
const TOKEN_DECODERS: [(&str, TokenDecoder); 2] = [
    ("aws-cli", decode_cli_token),
    ("native", decode_native_token),
];

fn parse_cli_time(value: &str) -> Result<DateTime<Utc>> {
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, CLI_TIME_FORMAT) {
        return Ok(naive.and_utc());
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SsoError::CacheError(format!("failed to parse token expiry: {}", e)))
}

fn format_cli_time(value: &DateTime<Utc>) -> String {
    value.format(CLI_TIME_FORMAT).to_string()
}

fn decode_cli_token(bytes: &[u8]) -> Result<DecodedToken> {
    let file: CliTokenFile = serde_json::from_slice(bytes)?;
    let expires_at = parse_cli_time(&file.expires_at)?;
    let registration_time = file
        .received_at
        .as_deref()
        .and_then(|s| NaiveDateTime::parse_from_str(s, CLI_TIME_FORMAT).ok())
        .map(|naive| naive.and_utc());

    Ok(DecodedToken {
        token: SsoToken {
            access_token: file.access_token,
            expires_at,
            refresh_token: None,
            client_id: file.client_id.filter(|s| !s.is_empty()),
            client_secret: file.client_secret.filter(|s| !s.is_empty()),
            registration_time,
            region: file.region,
            start_url: file.start_url,
        },
        expiry_buffer: Duration::minutes(CLI_TOKEN_EXPIRY_BUFFER_MINUTES),
    })
}

fn decode_native_token(bytes: &[u8]) -> Result<DecodedToken> {
    Ok(DecodedToken {
        token: serde_json::from_slice(bytes)?,
        expiry_buffer: Duration::zero(),
    })
}

fn decode_token(bytes: &[u8]) -> Result<DecodedToken> {
    let mut last_err = SsoError::CacheError("no token decoder accepted the cache file".to_string());
    for (schema, decode) in TOKEN_DECODERS {
        match decode(bytes) {
            Ok(decoded) => {
                tracing::trace!(schema, "Decoded cached SSO token");
                return Ok(decoded);
            }
            Err(e) => {
                tracing::trace!(schema, error = %e, "Token schema did not match");
                last_err = e;
            }
        }
    }
    Err(last_err)
}

fn encode_cli_token(start_url: &str, token: &SsoToken, now: DateTime<Utc>) -> Result<Vec<u8>> {
    let client_id = token.client_id.clone().filter(|s| !s.is_empty());
    let client_secret = token.client_secret.clone().filter(|s| !s.is_empty());
    let registration_expires_at = (client_id.is_some() && client_secret.is_some())
        .then(|| format_cli_time(&(now + Duration::days(REGISTRATION_LIFETIME_DAYS))));

    let file = CliTokenFile {
        start_url: start_url.to_string(),
        region: token.region.clone(),
        access_token: token.access_token.clone(),
        expires_at: format_cli_time(&token.expires_at),
        received_at: Some(format_cli_time(&now)),
        client_id,
        client_secret,
        registration_expires_at,
    };

    Ok(serde_json::to_vec_pretty(&file)?)
}

/// SSO token cache compatible with the AWS CLI.
///
/// The file for a start URL is always `<cache_dir>/<sha1(start_url)>.json`,
/// independent of any generic [`Cache`](super::Cache) store, so the AWS CLI
/// finds the same token.
#[derive(Debug, Clone)]
pub struct TokenCache {
    cache_dir: PathBuf,
}

impl TokenCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    /// Lowercase hex SHA-1 of the start URL.
    pub fn cache_key(start_url: &str) -> String {
        let mut hasher = Sha1::new();
        hasher.update(start_url.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn cache_file_path(&self, start_url: &str) -> PathBuf {
        self.cache_dir
            .join(format!("{}.json", Self::cache_key(start_url)))
    }

    /// Get the cached token for `start_url`.
    ///
    /// Returns `None` when there is no file or the token is expired. Tokens in
    /// the AWS CLI schema count as expired five minutes early.
    pub fn get_token(&self, start_url: &str) -> Result<Option<SsoToken>> {
        let cache_file = self.cache_file_path(start_url);

        let Some(bytes) = read_optional(&cache_file)? else {
            return Ok(None);
        };

        let DecodedToken {
            mut token,
            expiry_buffer,
        } = decode_token(&bytes)?;

        if Utc::now() > token.expires_at - expiry_buffer {
            tracing::debug!(
                start_url,
                expires_at = %token.expires_at,
                "Cached SSO token is expired"
            );
            return Ok(None);
        }

        if token.start_url.is_empty() {
            token.start_url = start_url.to_string();
        }
        Ok(Some(token))
    }

    /// Save token to cache, always in the AWS CLI schema
    pub fn save_token(&self, start_url: &str, token: &SsoToken) -> Result<()> {
        let data = encode_cli_token(start_url, token, Utc::now())?;
        write_private_file(&self.cache_file_path(start_url), &data)
    }

    /// Remove token from cache (logout)
    pub fn remove_token(&self, start_url: &str) -> Result<()> {
        remove_optional(&self.cache_file_path(start_url))
    }
}
