//! Client configuration.
//!
//! Loads `${MINDMAP_HOME}/config.toml` with defaults for every field, then
//! applies environment overrides.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable overriding the backend base URL.
const API_URL_ENV: &str = "MINDMAP_API_URL";

pub mod paths {
    //! Path resolution for the client home directory.
    //!
    //! Resolution order:
    //! 1. `MINDMAP_HOME` environment variable (if set and non-empty)
    //! 2. `~/.mindmap`

    use std::path::PathBuf;

    use anyhow::{Context, Result};

    pub fn mindmap_home() -> Result<PathBuf> {
        if let Ok(home) = std::env::var("MINDMAP_HOME") {
            if !home.trim().is_empty() {
                return Ok(PathBuf::from(home));
            }
        }

        dirs::home_dir()
            .map(|h| h.join(".mindmap"))
            .context("Could not find home directory")
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(mindmap_home()?.join("config.toml"))
    }

    /// Directory holding the persisted token and profile.
    pub fn credentials_dir() -> Result<PathBuf> {
        Ok(mindmap_home()?.join("credentials"))
    }
}

/// OAuth (authorization-code) settings for the hosted identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OAuthConfig {
    /// Browser authorization endpoint. OAuth login is disabled when empty.
    pub authorize_url: String,
    /// Token-exchange endpoint.
    pub token_url: String,
    pub client_id: String,
    /// Sent as an empty string when not configured.
    pub client_secret: String,
    /// Where the identity provider sends the browser back to.
    pub redirect_uri: String,
    pub scope: String,
    /// Upstream identity provider hint (e.g. `Google`).
    pub identity_provider: String,
}

impl Default for OAuthConfig {
    fn default() -> Self {
        Self {
            authorize_url: String::new(),
            token_url: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:58232/".to_string(),
            scope: "openid email profile".to_string(),
            identity_provider: "Google".to_string(),
        }
    }
}

impl OAuthConfig {
    pub fn is_configured(&self) -> bool {
        !self.authorize_url.is_empty() && !self.token_url.is_empty() && !self.client_id.is_empty()
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend base URL (the `/api/...` paths are appended to it).
    pub api_base_url: String,
    /// Base of the links handed out by `share`.
    pub share_base_url: String,
    pub oauth: OAuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8081".to_string(),
            share_base_url: "http://localhost:5173".to_string(),
            oauth: OAuthConfig::default(),
        }
    }
}

impl Config {
    /// Load from the default path, or from `path` when given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => Self::load_from(&paths::config_path()?)?,
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific path. Returns defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var(API_URL_ENV) {
            let trimmed = url.trim();
            if !trimmed.is_empty() {
                self.api_base_url = trimmed.to_string();
            }
        }
    }

    /// Check that every configured URL parses.
    pub fn validate(&self) -> Result<()> {
        validate_url("api_base_url", &self.api_base_url)?;
        validate_url("share_base_url", &self.share_base_url)?;
        validate_url("oauth.redirect_uri", &self.oauth.redirect_uri)?;
        for (field, value) in [
            ("oauth.authorize_url", &self.oauth.authorize_url),
            ("oauth.token_url", &self.oauth.token_url),
        ] {
            if !value.is_empty() {
                validate_url(field, value)?;
            }
        }
        Ok(())
    }
}

fn validate_url(field: &str, value: &str) -> Result<()> {
    url::Url::parse(value).with_context(|| format!("Invalid URL for {field}: {value}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
        assert!(!config.oauth.is_configured());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
api_base_url = "https://mindmaps.example.com"

[oauth]
authorize_url = "https://auth.example.com/oauth2/authorize"
token_url = "https://auth.example.com/oauth2/token"
client_id = "abc"
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.api_base_url, "https://mindmaps.example.com");
        assert_eq!(config.share_base_url, "http://localhost:5173");
        assert!(config.oauth.is_configured());
        assert_eq!(config.oauth.scope, "openid email profile");
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_url_rejected() {
        let config = Config {
            api_base_url: "not a url".to_string(),
            ..Config::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("api_base_url"));
    }

    #[test]
    fn test_malformed_toml_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "api_base_url = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
