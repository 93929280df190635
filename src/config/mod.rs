// campaign-maintenance/src/config/mod.rs
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use url::Url;

use crate::errors::{AppError, Result};

pub const DEFAULT_CONFIG_PATH: &str = ".env";

pub const SERVICE_KEY: &str = "SUPABASE_SERVICE_ROLE_KEY";
pub const BASE_URL_KEY: &str = "SUPABASE_URL";
pub const TIMEOUT_KEY: &str = "HTTP_TIMEOUT_SECS";
pub const SYSTEM_PROXY_KEY: &str = "HTTP_SYSTEM_PROXY";

/// Project reference of the backend instance this tool maintains.
pub const PROJECT_REF: &str = "auqnzxrysuzypquebtpy";

/// Requests are bounded so an unresponsive backend cannot hang the run.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Key/value pairs read from a local `KEY=VALUE` settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    values: HashMap<String, String>,
}

impl Settings {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|source| AppError::ConfigLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self::parse(&content))
    }

    /// Blank lines, `#` comments and lines without `=` are skipped. The
    /// line is split on its first `=`; the value is trimmed and a repeated
    /// key keeps its last value.
    pub fn parse(content: &str) -> Self {
        let values = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once('='))
            .map(|(key, value)| (key.to_string(), value.trim().to_string()))
            .collect();
        Settings { values }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    fn non_empty(&self, key: &str) -> Option<&str> {
        self.get(key).filter(|value| !value.is_empty())
    }

    pub fn http_options(&self) -> Result<HttpOptions> {
        let timeout = match self.non_empty(TIMEOUT_KEY) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(0) => {
                    return Err(AppError::InvalidSetting {
                        key: TIMEOUT_KEY,
                        reason: "timeout must be at least one second".to_string(),
                    });
                }
                Ok(secs) => Duration::from_secs(secs),
                Err(e) => {
                    return Err(AppError::InvalidSetting {
                        key: TIMEOUT_KEY,
                        reason: format!("'{}' is not a whole number of seconds ({})", raw, e),
                    });
                }
            },
            None => DEFAULT_HTTP_TIMEOUT,
        };

        let use_system_proxy = match self.non_empty(SYSTEM_PROXY_KEY) {
            Some(raw) => parse_flag(raw).ok_or_else(|| AppError::InvalidSetting {
                key: SYSTEM_PROXY_KEY,
                reason: format!("'{}' is not one of true/false/1/0/yes/no", raw),
            })?,
            None => true,
        };

        Ok(HttpOptions {
            timeout,
            use_system_proxy,
        })
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}

/// Transport settings for the HTTP client shared by every remote step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub use_system_proxy: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        HttpOptions {
            timeout: DEFAULT_HTTP_TIMEOUT,
            use_system_proxy: true,
        }
    }
}

/// Credentials and target instance for the remote calls.
#[derive(Clone)]
pub struct AuthContext {
    secret: String,
    base_url: Url,
}

impl AuthContext {
    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }
}

impl fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthContext")
            .field("secret", &"<redacted>")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

pub fn default_base_url() -> String {
    format!("https://{}.supabase.co", PROJECT_REF)
}

/// Builds the [`AuthContext`] from loaded settings. Fails when the service
/// key is absent or empty.
pub fn resolve_auth(settings: &Settings) -> Result<AuthContext> {
    let secret = settings
        .non_empty(SERVICE_KEY)
        .ok_or(AppError::MissingCredential(SERVICE_KEY))?
        .to_string();

    let raw_base = settings
        .non_empty(BASE_URL_KEY)
        .map(str::to_string)
        .unwrap_or_else(default_base_url);
    let base_url = Url::parse(&raw_base).map_err(|source| AppError::InvalidEndpoint {
        url: raw_base.clone(),
        source,
    })?;

    Ok(AuthContext { secret, base_url })
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from(DEFAULT_CONFIG_PATH)
}
