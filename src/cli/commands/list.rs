use crate::cli::{CommandContext, ListTarget, OutputFormat};
use ssokit::auth::AuthHandler;
use ssokit::error::Result;
use ssokit::models::{AccountRole, AwsAccount};
use ssokit::profile::{generate_profile_name, DEFAULT_PROFILE_TEMPLATE};

pub async fn execute(
    cmd: &CommandContext,
    target: ListTarget,
    accounts: &[String],
    format: OutputFormat,
    login: bool,
) -> Result<()> {
    let browser = login.then(|| cmd.auth_handler(false));
    let handler = browser.as_ref().map(|h| h as &dyn AuthHandler);

    match target {
        ListTarget::Accounts => {
            let accounts = cmd
                .session
                .list_accounts(&cmd.instance, handler, &cmd.ctx)
                .await?;
            print_accounts(&accounts, format)
        }
        ListTarget::Roles => {
            let roles = cmd
                .session
                .list_roles(&cmd.instance, accounts, handler, &cmd.ctx)
                .await?;
            print_roles(&roles, &cmd.instance.region, format)
        }
    }
}

fn print_accounts(accounts: &[AwsAccount], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(accounts)?),
        OutputFormat::Text => {
            println!("Available accounts:\n");
            for account in accounts {
                match &account.email_address {
                    Some(email) => println!(
                        "  {} ({}) <{}>",
                        account.account_name, account.account_id, email
                    ),
                    None => println!("  {} ({})", account.account_name, account.account_id),
                }
            }
        }
    }
    Ok(())
}

fn print_roles(roles: &[AccountRole], region: &str, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(roles)?),
        OutputFormat::Text => {
            println!("Available accounts and roles:\n");
            for role in roles {
                let account = AwsAccount {
                    account_id: role.account_id.clone(),
                    account_name: role.account_name.clone(),
                    email_address: None,
                };
                let profile = generate_profile_name(DEFAULT_PROFILE_TEMPLATE, &account, role, region);
                println!("  {}  [{}]", role.full_display(), profile);
            }
        }
    }
    Ok(())
}
