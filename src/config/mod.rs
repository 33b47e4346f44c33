// Configuration management
use crate::error::{Result, SsoError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CLIENT_NAME: &str = "ssokit";
pub const DEFAULT_EXPIRY_WINDOW_MINUTES: i64 = 5;

/// Cache locations handed to the cache stores at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDirs {
    /// SSO token cache shared with the AWS CLI (`~/.aws/sso/cache`).
    pub sso_cache_dir: PathBuf,
    /// Generic CLI credential cache (`~/.aws/cli/cache`).
    pub cli_cache_dir: PathBuf,
}

impl CacheDirs {
    pub fn from_home(home: &Path) -> Self {
        let aws_dir = home.join(".aws");
        Self {
            sso_cache_dir: aws_dir.join("sso").join("cache"),
            cli_cache_dir: aws_dir.join("cli").join("cache"),
        }
    }

    /// Resolve the AWS CLI default directories under the user's home.
    pub fn discover() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            SsoError::ConfigError("Could not determine home directory".to_string())
        })?;
        Ok(Self::from_home(&home))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub sso: SsoConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub login: LoginConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SsoConfig {
    pub start_url: Option<String>,
    pub region: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheConfig {
    pub sso_dir: Option<PathBuf>,
    pub cli_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginConfig {
    #[serde(default = "default_expiry_window_minutes")]
    pub expiry_window_minutes: i64,
    #[serde(default)]
    pub disable_browser: bool,
    #[serde(default = "default_client_name")]
    pub client_name: String,
}

fn default_expiry_window_minutes() -> i64 {
    DEFAULT_EXPIRY_WINDOW_MINUTES
}

fn default_client_name() -> String {
    DEFAULT_CLIENT_NAME.to_string()
}

impl Default for LoginConfig {
    fn default() -> Self {
        Self {
            expiry_window_minutes: default_expiry_window_minutes(),
            disable_browser: false,
            client_name: default_client_name(),
        }
    }
}

impl Config {
    /// Get the config directory path
    ///
    /// Priority:
    /// 1. XDG_CONFIG_HOME/ssokit (if env var is set)
    /// 2. ~/.config/ssokit (if ~/.config exists)
    /// 3. ~/.ssokit (fallback on Unix)
    /// 4. Platform default on Windows
    pub fn config_dir() -> Result<PathBuf> {
        if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config).join("ssokit"));
        }

        #[cfg(unix)]
        {
            if let Some(home_dir) = dirs::home_dir() {
                let xdg_config = home_dir.join(".config");
                if xdg_config.exists() {
                    return Ok(xdg_config.join("ssokit"));
                }
                return Ok(home_dir.join(".ssokit"));
            }
        }

        #[cfg(not(unix))]
        {
            if let Some(config_dir) = dirs::config_dir() {
                return Ok(config_dir.join("ssokit"));
            }
        }

        Err(SsoError::ConfigError(
            "Could not determine config directory".to_string(),
        ))
    }

    pub fn config_file_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from the default file location plus environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::config_file_path()?)?;

        if let Ok(start_url) = std::env::var("AWS_SSO_START_URL") {
            tracing::debug!(start_url = %start_url, "Using AWS_SSO_START_URL from environment");
            config.sso.start_url = Some(start_url);
        }

        if let Ok(region) = std::env::var("AWS_SSO_REGION") {
            tracing::debug!(region = %region, "Using AWS_SSO_REGION from environment");
            config.sso.region = Some(region);
        }

        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Config::default());
        }

        tracing::debug!(path = %path.display(), "Loading config");
        let contents = fs::read_to_string(path)
            .map_err(|e| SsoError::ConfigError(format!("Failed to read config file: {}", e)))?;

        Ok(toml::from_str(&contents)?)
    }

    /// Cache directories with config-file overrides applied over the AWS CLI defaults
    pub fn cache_dirs(&self) -> Result<CacheDirs> {
        if let (Some(sso), Some(cli)) = (&self.cache.sso_dir, &self.cache.cli_dir) {
            return Ok(CacheDirs {
                sso_cache_dir: sso.clone(),
                cli_cache_dir: cli.clone(),
            });
        }

        let mut dirs = CacheDirs::discover()?;

        if let Some(sso) = &self.cache.sso_dir {
            dirs.sso_cache_dir = sso.clone();
        }
        if let Some(cli) = &self.cache.cli_dir {
            dirs.cli_cache_dir = cli.clone();
        }
        Ok(dirs)
    }

    pub fn expiry_window(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.login.expiry_window_minutes.max(0))
    }

    /// Resolve start URL and region, preferring explicit arguments over the config file
    pub fn resolve_instance(
        &self,
        start_url: Option<String>,
        region: Option<String>,
    ) -> Result<(String, String)> {
        let start_url = start_url
            .or_else(|| self.sso.start_url.clone())
            .ok_or_else(|| {
                SsoError::InvalidConfig(
                    "SSO start URL is required. Provide --start-url, set AWS_SSO_START_URL, or configure it in the config file".to_string(),
                )
            })?;

        let region = region.or_else(|| self.sso.region.clone()).ok_or_else(|| {
            SsoError::InvalidConfig(
                "SSO region is required. Provide --sso-region, set AWS_SSO_REGION, or configure it in the config file".to_string(),
            )
        })?;

        Ok((start_url, region))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_cache_dirs_from_home() {
        let dirs = CacheDirs::from_home(Path::new("/home/alice"));
        assert_eq!(
            dirs.sso_cache_dir,
            PathBuf::from("/home/alice/.aws/sso/cache")
        );
        assert_eq!(
            dirs.cli_cache_dir,
            PathBuf::from("/home/alice/.aws/cli/cache")
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert!(config.sso.start_url.is_none());
        assert_eq!(config.login.expiry_window_minutes, 5);
        assert_eq!(config.login.client_name, DEFAULT_CLIENT_NAME);
        assert!(!config.login.disable_browser);
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[sso]
start_url = "https://my-org.awsapps.com/start"
region = "eu-west-1"

[cache]
sso_dir = "/tmp/sso"
cli_dir = "/tmp/cli"

[login]
expiry_window_minutes = 15
disable_browser = true
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(
            config.sso.start_url.as_deref(),
            Some("https://my-org.awsapps.com/start")
        );
        assert_eq!(config.expiry_window(), chrono::Duration::minutes(15));
        assert!(config.login.disable_browser);
        assert_eq!(config.login.client_name, DEFAULT_CLIENT_NAME);

        let dirs = config.cache_dirs().unwrap();
        assert_eq!(dirs.sso_cache_dir, PathBuf::from("/tmp/sso"));
        assert_eq!(dirs.cli_cache_dir, PathBuf::from("/tmp/cli"));
    }

    #[test]
    fn test_load_invalid_toml_is_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[sso\nstart_url = ").unwrap();

        assert!(matches!(Config::load_from(&path), Err(SsoError::Toml(_))));
    }

    #[test]
    fn test_resolve_instance_prefers_arguments() {
        let mut config = Config::default();
        config.sso.start_url = Some("https://file.awsapps.com/start".to_string());
        config.sso.region = Some("us-east-1".to_string());

        let (url, region) = config
            .resolve_instance(Some("https://arg.awsapps.com/start".to_string()), None)
            .unwrap();
        assert_eq!(url, "https://arg.awsapps.com/start");
        assert_eq!(region, "us-east-1");

        let empty = Config::default();
        assert!(matches!(
            empty.resolve_instance(None, None),
            Err(SsoError::InvalidConfig(_))
        ));
    }
}
