use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub environment: Environment,
    pub backend: BackendConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub base_url: Url,
    pub request_timeout_secs: u64,
    pub refresh_timeout_secs: u64,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub session_file: PathBuf,
}

impl ClientConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Preset defaults per environment, then specific env vars win
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    /// Development defaults pointed at an explicit backend, used by tests and `--base-url`.
    pub fn for_base_url(base_url: &str) -> anyhow::Result<Self> {
        Self::development().with_base_url(base_url)
    }

    pub fn with_base_url(mut self, base_url: &str) -> anyhow::Result<Self> {
        self.backend.base_url = parse_base_url(base_url)?;
        Ok(self)
    }

    pub fn with_session_file(mut self, session_file: PathBuf) -> Self {
        self.storage.session_file = session_file;
        self
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORTFOLIO_BACKEND_URL") {
            match parse_base_url(&v) {
                Ok(url) => self.backend.base_url = url,
                Err(e) => tracing::warn!("ignoring PORTFOLIO_BACKEND_URL: {}", e),
            }
        }
        if let Ok(v) = env::var("PORTFOLIO_REQUEST_TIMEOUT_SECS") {
            self.backend.request_timeout_secs = v.parse().unwrap_or(self.backend.request_timeout_secs);
        }
        if let Ok(v) = env::var("PORTFOLIO_REFRESH_TIMEOUT_SECS") {
            self.backend.refresh_timeout_secs = v.parse().unwrap_or(self.backend.refresh_timeout_secs);
        }
        if let Ok(v) = env::var("PORTFOLIO_USER_AGENT") {
            self.backend.user_agent = v;
        }
        if let Ok(dir) = env::var("PORTFOLIO_CONFIG_DIR") {
            self.storage.session_file = PathBuf::from(dir).join(SESSION_FILE_NAME);
        }

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            backend: BackendConfig {
                base_url: default_url("http://localhost:8000/api/"),
                request_timeout_secs: 30,
                refresh_timeout_secs: 10,
                user_agent: default_user_agent(),
            },
            storage: StorageConfig {
                session_file: default_session_file(),
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            backend: BackendConfig {
                base_url: default_url("https://staging.example.com/api/"),
                request_timeout_secs: 15,
                refresh_timeout_secs: 10,
                user_agent: default_user_agent(),
            },
            storage: StorageConfig {
                session_file: default_session_file(),
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            backend: BackendConfig {
                base_url: default_url("https://api.example.com/api/"),
                request_timeout_secs: 10,
                refresh_timeout_secs: 5,
                user_agent: default_user_agent(),
            },
            storage: StorageConfig {
                session_file: default_session_file(),
            },
        }
    }
}

const SESSION_FILE_NAME: &str = "session.json";

/// Parse a backend base URL, forcing a trailing slash so relative paths like
/// `memes/` join underneath it instead of replacing the last segment.
pub fn parse_base_url(raw: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("invalid backend URL '{}': {}", raw, e))?;

    match url.scheme() {
        "http" | "https" => {}
        other => anyhow::bail!("unsupported backend URL scheme '{}'", other),
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

fn default_url(raw: &str) -> Url {
    // Presets are literals with a trailing slash already
    Url::parse(raw).expect("preset backend URL is valid")
}

fn default_user_agent() -> String {
    format!("portf/{}", env!("CARGO_PKG_VERSION"))
}

/// Directory holding the persisted session, `$HOME/.config/portfolio` unless overridden.
pub fn config_dir() -> PathBuf {
    if let Ok(custom_dir) = env::var("PORTFOLIO_CONFIG_DIR") {
        return PathBuf::from(custom_dir);
    }

    match env::var("HOME") {
        Ok(home) => PathBuf::from(home).join(".config").join("portfolio"),
        Err(_) => env::temp_dir().join("portfolio"),
    }
}

fn default_session_file() -> PathBuf {
    config_dir().join(SESSION_FILE_NAME)
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<ClientConfig> = Lazy::new(ClientConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static ClientConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = ClientConfig::development();
        assert_eq!(config.backend.base_url.as_str(), "http://localhost:8000/api/");
        assert_eq!(config.backend.refresh_timeout_secs, 10);
    }

    #[test]
    fn test_default_production_config() {
        let config = ClientConfig::production();
        assert_eq!(config.backend.base_url.scheme(), "https");
        assert!(config.backend.request_timeout_secs < ClientConfig::development().backend.request_timeout_secs);
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let url = parse_base_url("http://127.0.0.1:9000/api").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9000/api/");
        assert_eq!(url.join("memes/").unwrap().as_str(), "http://127.0.0.1:9000/api/memes/");
    }

    #[test]
    fn test_base_url_rejects_other_schemes() {
        assert!(parse_base_url("ftp://example.com").is_err());
        assert!(parse_base_url("not a url").is_err());
    }

    #[test]
    fn test_config_serializes_base_url_as_string() {
        let config = ClientConfig::development();
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["backend"]["base_url"], "http://localhost:8000/api/");

        let restored: ClientConfig = serde_json::from_value(value).unwrap();
        assert_eq!(restored.backend.base_url, config.backend.base_url);
    }
}
