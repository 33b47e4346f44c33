use crate::cli::CommandContext;
use ssokit::cache::{Cache, CredentialCache, FileCache};
use ssokit::error::Result;
use ssokit::models::CredentialProcessOutput;
use ssokit::validation::{format_account_id, validate_account_id, validate_role_name};
use std::sync::Arc;

/// Print one role's credentials in the `credential_process` JSON shape.
///
/// Nothing but the JSON document may go to stdout.
pub async fn execute(cmd: &CommandContext, account: &str, role: &str, login: bool) -> Result<()> {
    let account_id = format_account_id(account);
    validate_account_id(&account_id)?;
    validate_role_name(role)?;

    if login {
        let handler = cmd.auth_handler(false);
        cmd.session
            .login(&cmd.instance, false, &handler, &cmd.ctx)
            .await?;
    }

    let cache_dirs = cmd.config.cache_dirs()?;
    let store: Arc<dyn Cache> = Arc::new(FileCache::new(&cache_dirs.cli_cache_dir));
    let provider = cmd
        .session
        .credential_provider(
            &cmd.instance,
            &account_id,
            role,
            CredentialCache::new(Some(store)),
        )
        .await;

    let creds = provider.retrieve(&cmd.ctx).await?;
    let output = CredentialProcessOutput::from(&creds);
    println!("{}", serde_json::to_string_pretty(&output)?);

    Ok(())
}
