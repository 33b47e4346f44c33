use crate::cli::{Cli, Shell};
use clap::CommandFactory;
use clap_complete::{generate, Shell as ClapShell};
use std::io::{self, Write};

const BIN_NAME: &str = "ssokit";

pub fn execute(shell: Shell) {
    write_completions(shell, &mut io::stdout());

    eprintln!("\n# Installation instructions:");
    for line in install_hint(shell) {
        eprintln!("#   {}", line);
    }
}

fn write_completions(shell: Shell, out: &mut dyn Write) {
    let clap_shell = match shell {
        Shell::Bash => ClapShell::Bash,
        Shell::Zsh => ClapShell::Zsh,
        Shell::Fish => ClapShell::Fish,
        Shell::PowerShell => ClapShell::PowerShell,
        Shell::Elvish => ClapShell::Elvish,
    };
    generate(clap_shell, &mut Cli::command(), BIN_NAME, out);
}

fn install_hint(shell: Shell) -> &'static [&'static str] {
    match shell {
        Shell::Bash => &[
            "Add to ~/.bashrc:",
            "  eval \"$(ssokit completions bash)\"",
        ],
        Shell::Zsh => &[
            "Save to a directory on $fpath:",
            "  ssokit completions zsh > ~/.zfunc/_ssokit",
            "Then add to ~/.zshrc: fpath=(~/.zfunc $fpath)",
        ],
        Shell::Fish => &["  ssokit completions fish > ~/.config/fish/completions/ssokit.fish"],
        Shell::PowerShell => &[
            "Add to your PowerShell profile:",
            "  ssokit completions powershell | Out-String | Invoke-Expression",
        ],
        Shell::Elvish => &["  eval (ssokit completions elvish | slurp)"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_completions_cover_subcommands() {
        let mut out = Vec::new();
        write_completions(Shell::Bash, &mut out);
        let script = String::from_utf8(out).unwrap();

        assert!(script.contains("ssokit"));
        assert!(script.contains("credential-process"));
        assert!(script.contains("login"));
    }

    #[test]
    fn test_every_shell_has_a_hint() {
        for shell in [
            Shell::Bash,
            Shell::Zsh,
            Shell::Fish,
            Shell::PowerShell,
            Shell::Elvish,
        ] {
            assert!(!install_hint(shell).is_empty());
        }
    }
}
