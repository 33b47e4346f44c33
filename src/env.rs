// Environment detection utilities

/// Check if we're running in a headless environment
///
/// Headless mode is detected when:
/// - `force` is set (from `--no-browser` or the config file)
/// - SSH_TTY or SSH_CONNECTION is set (SSH session)
/// - CI is set
/// - TERM is "dumb" or empty
/// - on non-macOS Unix, DISPLAY is not set (no X11)
pub fn is_headless_environment(force: bool) -> bool {
    detect_headless(force, |name| std::env::var(name).ok())
}

fn detect_headless(force: bool, var: impl Fn(&str) -> Option<String>) -> bool {
    if force {
        tracing::debug!("Headless mode: forced");
        return true;
    }

    for name in ["SSH_TTY", "SSH_CONNECTION", "CI"] {
        if var(name).is_some() {
            tracing::debug!("Headless detected: {} set", name);
            return true;
        }
    }

    if let Some(term) = var("TERM") {
        if term == "dumb" || term.is_empty() {
            tracing::debug!("Headless detected: TERM is '{}'", term);
            return true;
        }
    }

    // macOS doesn't use X11/DISPLAY
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        if var("DISPLAY").is_none() {
            tracing::debug!("Headless detected: DISPLAY not set");
            return true;
        }
    }

    tracing::debug!("Not headless: detected graphical environment");
    false
}
