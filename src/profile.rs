// Profile name generation for account/role pairs
use crate::models::{AccountRole, AwsAccount};
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_PROFILE_TEMPLATE: &str = "{account_name}.{role_name}.{region}";

static DASH_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-+").expect("valid dash regex"));

static DISALLOWED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9._-]").expect("valid profile charset regex"));

fn sanitize_name(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            ' ' | '_' | '/' | '\\' | ':' | '@' => '-',
            other => other,
        })
        .collect();
    DASH_RUN_RE.replace_all(&replaced, "-").into_owned()
}

/// Build a profile name from `template`.
///
/// Supported placeholders are `{account_id}`, `{account_name}`, `{role_name}`
/// and `{region}`. An empty template falls back to [`DEFAULT_PROFILE_TEMPLATE`].
/// The result is lowercase and limited to `[a-z0-9._-]`.
pub fn generate_profile_name(
    template: &str,
    account: &AwsAccount,
    role: &AccountRole,
    region: &str,
) -> String {
    let template = if template.is_empty() {
        DEFAULT_PROFILE_TEMPLATE
    } else {
        template
    };

    let name = template
        .replace("{account_id}", &account.account_id)
        .replace("{account_name}", &sanitize_name(&account.account_name))
        .replace("{role_name}", &sanitize_name(&role.role_name))
        .replace("{region}", region)
        .to_lowercase();

    let name = DISALLOWED_RE.replace_all(&name, "-");
    let name = DASH_RUN_RE.replace_all(&name, "-");
    name.trim_matches('-').to_string()
}
