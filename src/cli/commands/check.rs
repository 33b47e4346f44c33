use crate::cli::CommandContext;
use ssokit::cache::CredentialCache;
use ssokit::error::{Result, SsoError};
use ssokit::validation::format_account_id;

/// Report the cached session. With an account and role, also fetch credentials
/// to prove the role can be assumed.
pub async fn execute(cmd: &CommandContext, role: Option<(String, String)>) -> Result<()> {
    let token = cmd
        .session
        .auth()
        .get_cached_token(&cmd.instance.start_url)?;

    let Some(token) = token else {
        println!("✗ No valid SSO session for {}", cmd.instance.start_url);
        return Err(SsoError::AuthenticationNeeded(
            "no valid SSO session; run `ssokit login`".to_string(),
        ));
    };

    println!("✓ SSO session valid for {}", cmd.instance.start_url);
    println!("  Token expires in: {}", token.expiration_display());

    if let Some((account, role_name)) = role {
        let account_id = format_account_id(&account);
        let provider = cmd
            .session
            .credential_provider(
                &cmd.instance,
                &account_id,
                &role_name,
                CredentialCache::in_memory(),
            )
            .await;

        let creds = provider.retrieve(&cmd.ctx).await?;
        println!("✓ Credentials for {}/{} retrieved", account_id, role_name);
        println!("  Credentials expire in: {}", creds.expiration_display());
    }

    Ok(())
}
