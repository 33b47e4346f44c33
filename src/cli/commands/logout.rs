use crate::cli::CommandContext;
use ssokit::error::Result;

pub async fn execute(cmd: &CommandContext) -> Result<()> {
    cmd.session.logout(&cmd.instance).await?;

    println!("✓ Logged out successfully");

    Ok(())
}
