// Input validation for SSO parameters
use crate::error::{Result, SsoError};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static ACCOUNT_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{12}$").expect("valid account id regex"));

static REGION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}-[a-z]+-[0-9]+$").expect("valid region regex"));

static ROLE_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_+=,.@-]+$").expect("valid role name regex"));

const MAX_ROLE_NAME_LEN: usize = 64;

fn invalid(message: impl Into<String>) -> SsoError {
    SsoError::InvalidConfig(message.into())
}

/// Strip everything but ASCII digits: `1234-5678-9012` becomes `123456789012`.
pub fn format_account_id(account_id: &str) -> String {
    account_id.chars().filter(|c| c.is_ascii_digit()).collect()
}

pub fn validate_start_url(start_url: &str) -> Result<()> {
    if start_url.is_empty() {
        return Err(invalid("start URL cannot be empty"));
    }

    let parsed =
        Url::parse(start_url).map_err(|e| invalid(format!("invalid start URL format: {}", e)))?;

    if parsed.scheme() != "https" {
        return Err(invalid("start URL must use HTTPS"));
    }

    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("start URL must have a valid host"))?;

    if !host.contains("awsapps.com") && !host.contains("signin.aws") {
        return Err(invalid(
            "start URL does not appear to be a valid AWS SSO URL",
        ));
    }

    Ok(())
}

pub fn validate_region(region: &str) -> Result<()> {
    if region.is_empty() {
        return Err(invalid("region cannot be empty"));
    }
    if !REGION_RE.is_match(region) {
        return Err(invalid(format!("invalid region format: {}", region)));
    }
    Ok(())
}

pub fn validate_account_id(account_id: &str) -> Result<()> {
    if account_id.is_empty() {
        return Err(invalid("account ID cannot be empty"));
    }
    if !ACCOUNT_ID_RE.is_match(&format_account_id(account_id)) {
        return Err(invalid(format!(
            "invalid account ID format: {} (must be 12 digits)",
            account_id
        )));
    }
    Ok(())
}

pub fn validate_role_name(role_name: &str) -> Result<()> {
    if role_name.is_empty() {
        return Err(invalid("role name cannot be empty"));
    }
    if role_name.len() > MAX_ROLE_NAME_LEN {
        return Err(invalid(format!(
            "role name too long: {} characters (max {})",
            role_name.len(),
            MAX_ROLE_NAME_LEN
        )));
    }
    if !ROLE_NAME_RE.is_match(role_name) {
        return Err(invalid(format!("invalid role name format: {}", role_name)));
    }
    Ok(())
}

/// Validate the parameters every login needs.
pub fn validate_login_request(start_url: &str, sso_region: &str) -> Result<()> {
    validate_start_url(start_url)?;
    validate_region(sso_region)
}

/// Validate the parameters needed to vend credentials for one account/role.
pub fn validate_sdk_config_request(
    start_url: &str,
    sso_region: &str,
    account_id: &str,
    role_name: &str,
    region: &str,
) -> Result<()> {
    validate_login_request(start_url, sso_region)?;
    validate_account_id(account_id)?;
    validate_role_name(role_name)?;
    validate_region(region)
}
