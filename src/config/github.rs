//! GitHub API client configuration.
//!
//! # Example
//!
//! ```toml
//! [github]
//! repository = "https://github.com/owner/repo"
//! api_url = "https://api.github.com"
//! token = "${GH_TOKEN}"
//! per_page = 100
//! timeout_secs = 30
//! ```

use serde::{Deserialize, Serialize};

/// Environment variable consulted when no token is configured.
pub const TOKEN_ENV_VAR: &str = "GH_TOKEN";

/// GitHub REST API connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitHubConfig {
    /// Repository to prune, as a URL or `owner/name`.
    /// Usually supplied with `--repo-url` instead.
    #[serde(default)]
    pub repository: Option<String>,

    /// Base URL of the REST API. Override for GitHub Enterprise Server
    /// (e.g. `https://ghe.example.com/api/v3`).
    /// Default: https://api.github.com
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Personal access token or fine-grained token with `actions: write`.
    /// Falls back to the `GH_TOKEN` environment variable when unset.
    #[serde(default)]
    pub token: Option<String>,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page size for listing endpoints (GitHub caps this at 100).
    /// Default: 100
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Per-request timeout in seconds.
    /// Default: 30
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            repository: None,
            api_url: default_api_url(),
            token: None,
            user_agent: default_user_agent(),
            per_page: default_per_page(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.github.com".to_string()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_per_page() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

impl GitHubConfig {
    /// Resolve the API token: configured value first, then `GH_TOKEN`.
    ///
    /// Blank values count as missing.
    pub fn resolve_token(&self) -> Option<String> {
        self.token
            .clone()
            .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
            .map(|token| token.trim().to_string())
            .filter(|token| !token.is_empty())
    }

    /// Get the request timeout as a Duration.
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.timeout_secs)
    }

    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.per_page == 0 || self.per_page > 100 {
            return Err(format!(
                "github.per_page must be between 1 and 100 (got {})",
                self.per_page
            ));
        }
        url::Url::parse(&self.api_url)
            .map_err(|e| format!("github.api_url is not a valid URL: {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = GitHubConfig::default();
        assert_eq!(config.api_url, "https://api.github.com");
        assert_eq!(config.per_page, 100);
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent.starts_with("run-pruner/"));
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_resolve_token_prefers_config() {
        temp_env::with_var(TOKEN_ENV_VAR, Some("from-env"), || {
            let config = GitHubConfig {
                token: Some("from-config".into()),
                ..Default::default()
            };
            assert_eq!(config.resolve_token().as_deref(), Some("from-config"));
        });
    }

    #[test]
    #[serial]
    fn test_resolve_token_falls_back_to_env() {
        temp_env::with_var(TOKEN_ENV_VAR, Some("from-env"), || {
            let config = GitHubConfig::default();
            assert_eq!(config.resolve_token().as_deref(), Some("from-env"));
        });
    }

    #[test]
    #[serial]
    fn test_resolve_token_missing_or_blank() {
        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            assert_eq!(GitHubConfig::default().resolve_token(), None);
        });
        temp_env::with_var(TOKEN_ENV_VAR, Some("   "), || {
            assert_eq!(GitHubConfig::default().resolve_token(), None);
        });
    }

    #[test]
    fn test_validate_per_page() {
        let config = GitHubConfig {
            per_page: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GitHubConfig {
            per_page: 101,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_api_url() {
        let config = GitHubConfig {
            api_url: "not a url".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
