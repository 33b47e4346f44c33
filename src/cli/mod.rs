// CLI interface
pub mod commands;

use clap::{Parser, Subcommand, ValueEnum};
use ssokit::auth::BrowserAuthHandler;
use ssokit::config::Config;
use ssokit::context::OperationContext;
use ssokit::error::Result;
use ssokit::models::SsoInstance;
use ssokit::session::SessionManager;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "ssokit")]
#[command(about = "AWS SSO login and credentials, sharing the AWS CLI cache", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// SSO start URL
    #[arg(long, env = "AWS_SSO_START_URL", global = true)]
    pub start_url: Option<String>,

    /// SSO region
    #[arg(long, env = "AWS_SSO_REGION", global = true)]
    pub sso_region: Option<String>,

    /// Config file (defaults to ~/.config/ssokit/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log in to AWS SSO with the device authorization flow
    Login {
        /// Log in again even if the cached token is still valid
        #[arg(short, long)]
        force: bool,

        /// Print the verification URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },

    /// Revoke the SSO session and delete the cached token
    Logout,

    /// List available accounts or roles
    List {
        #[arg(value_enum)]
        target: ListTarget,

        /// Only list roles in these accounts (repeatable)
        #[arg(short, long = "account")]
        accounts: Vec<String>,

        /// Output format
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Start a browser login when no valid token is cached
        #[arg(long)]
        login: bool,
    },

    /// Print credentials as JSON for the AWS CLI `credential_process` setting
    ///
    /// Example ~/.aws/config entry:
    ///
    ///   [profile dev]
    ///   credential_process = ssokit credential-process --account 123456789012 --role Admin
    CredentialProcess {
        /// Account ID
        #[arg(long)]
        account: String,

        /// Role name
        #[arg(long)]
        role: String,

        /// Start a browser login when no valid token is cached
        #[arg(long)]
        login: bool,
    },

    /// Run a command with role credentials in its environment
    ///
    /// Example: ssokit run-as --account 123456789012 --role Admin -- aws s3 ls
    RunAs {
        /// Account ID
        #[arg(long)]
        account: String,

        /// Role name
        #[arg(long)]
        role: String,

        /// Region exported to the command (defaults to the SSO region)
        #[arg(long)]
        region: Option<String>,

        /// Start a browser login when no valid token is cached
        #[arg(long)]
        login: bool,

        /// Command and arguments to run
        #[arg(last = true, required = true)]
        command: Vec<String>,
    },

    /// Check the cached SSO session, and optionally access to one role
    Check {
        /// Account ID
        #[arg(long, requires = "role")]
        account: Option<String>,

        /// Role name
        #[arg(long, requires = "account")]
        role: Option<String>,
    },

    /// Generate shell completion scripts
    ///
    /// INSTALLATION:
    ///
    /// Bash:
    ///   eval "$(ssokit completions bash)"    # Add to ~/.bashrc
    ///
    /// Zsh:
    ///   eval "$(ssokit completions zsh)"     # Add to ~/.zshrc
    ///
    /// Fish:
    ///   ssokit completions fish > ~/.config/fish/completions/ssokit.fish
    Completions {
        /// Shell type to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ListTarget {
    Accounts,
    Roles,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
#[allow(clippy::enum_variant_names)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
    Elvish,
}

/// Resolved state shared by the commands that talk to AWS.
pub struct CommandContext {
    pub config: Config,
    pub instance: SsoInstance,
    pub session: SessionManager,
    pub ctx: OperationContext,
}

impl CommandContext {
    fn new(
        config: Config,
        start_url: Option<String>,
        sso_region: Option<String>,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let (start_url, region) = config.resolve_instance(start_url, sso_region)?;
        let session = SessionManager::from_config(&config)?;

        Ok(Self {
            config,
            instance: SsoInstance::new(start_url, region),
            session,
            ctx: OperationContext::new().with_cancellation(cancel),
        })
    }

    /// Browser handler, printing instructions only when no browser can be opened.
    pub fn auth_handler(&self, no_browser: bool) -> BrowserAuthHandler {
        let headless =
            ssokit::env::is_headless_environment(no_browser || self.config.login.disable_browser);
        BrowserAuthHandler::new(!headless)
    }
}

/// Cancel `token` on Ctrl-C so a pending device flow stops cleanly.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::debug!("Interrupted, cancelling");
            child.cancel();
        }
    });
    token
}

pub async fn execute(args: Cli, config: Config) -> Result<()> {
    if let Commands::Completions { shell } = args.command {
        commands::completions::execute(shell);
        return Ok(());
    }

    let cmd = CommandContext::new(config, args.start_url, args.sso_region, cancel_on_ctrl_c())?;

    match args.command {
        Commands::Login { force, no_browser } => {
            commands::login::execute(&cmd, force, no_browser).await
        }
        Commands::Logout => commands::logout::execute(&cmd).await,
        Commands::List {
            target,
            accounts,
            format,
            login,
        } => commands::list::execute(&cmd, target, &accounts, format, login).await,
        Commands::CredentialProcess {
            account,
            role,
            login,
        } => commands::credential_process::execute(&cmd, &account, &role, login).await,
        Commands::RunAs {
            account,
            role,
            region,
            login,
            command,
        } => {
            let code =
                commands::run_as::execute(&cmd, &account, &role, region.as_deref(), login, &command)
                    .await?;
            // Exit with same code as the command
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Commands::Check { account, role } => {
            commands::check::execute(&cmd, account.zip(role)).await
        }
        Commands::Completions { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_list_roles() {
        let cli = Cli::try_parse_from([
            "ssokit",
            "list",
            "roles",
            "--account",
            "111111111111",
            "--account",
            "222222222222",
            "--format",
            "json",
        ])
        .unwrap();

        match cli.command {
            Commands::List {
                target,
                accounts,
                format,
                login,
            } => {
                assert_eq!(target, ListTarget::Roles);
                assert_eq!(accounts, vec!["111111111111", "222222222222"]);
                assert_eq!(format, OutputFormat::Json);
                assert!(!login);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_check_requires_account_and_role_together() {
        assert!(Cli::try_parse_from(["ssokit", "check", "--account", "111111111111"]).is_err());
        assert!(Cli::try_parse_from([
            "ssokit",
            "check",
            "--account",
            "111111111111",
            "--role",
            "Admin"
        ])
        .is_ok());
    }

    #[test]
    fn test_parse_list_with_login() {
        let cli = Cli::try_parse_from(["ssokit", "list", "accounts", "--login"]).unwrap();
        assert!(matches!(cli.command, Commands::List { login: true, .. }));
    }

    #[test]
    fn test_parse_run_as() {
        let cli = Cli::try_parse_from([
            "ssokit",
            "run-as",
            "--account",
            "111111111111",
            "--role",
            "Admin",
            "--region",
            "eu-west-1",
            "--",
            "aws",
            "s3",
            "ls",
            "--recursive",
        ])
        .unwrap();

        match cli.command {
            Commands::RunAs {
                account,
                role,
                region,
                login,
                command,
            } => {
                assert_eq!(account, "111111111111");
                assert_eq!(role, "Admin");
                assert_eq!(region.as_deref(), Some("eu-west-1"));
                assert!(!login);
                assert_eq!(command, vec!["aws", "s3", "ls", "--recursive"]);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_run_as_requires_a_command() {
        assert!(Cli::try_parse_from([
            "ssokit",
            "run-as",
            "--account",
            "111111111111",
            "--role",
            "Admin"
        ])
        .is_err());
    }
}
