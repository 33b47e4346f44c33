use crate::cli::CommandContext;
use ssokit::error::Result;

pub async fn execute(cmd: &CommandContext, force: bool, no_browser: bool) -> Result<()> {
    let handler = cmd.auth_handler(no_browser);
    let output = cmd
        .session
        .login(&cmd.instance, force, &handler, &cmd.ctx)
        .await?;

    if output.from_cache {
        println!("✓ Already logged in");
    } else {
        println!("✓ Login successful!");
    }
    println!("  Token expires in: {}", output.token.expiration_display());

    Ok(())
}
