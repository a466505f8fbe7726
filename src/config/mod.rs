//! Configuration loading.
//!
//! Settings come from an optional TOML file with `${VAR}` environment
//! expansion; command-line flags are applied on top by the binary. Every
//! section is optional.
//!
//! ```toml
//! [github]
//! repository = "owner/repo"
//! token = "${GH_TOKEN}"
//!
//! [retention]
//! min_runs = 10
//! dry_run = false
//!
//! [observability.logging]
//! format = "json"
//! ```

mod github;
mod observability;
mod retention;

use std::path::{Path, PathBuf};

pub use github::{GitHubConfig, TOKEN_ENV_VAR};
pub use observability::{LogFormat, LogLevel, LoggingConfig, ObservabilityConfig};
pub use retention::RetentionConfig;
use serde::{Deserialize, Serialize};

use crate::{
    github::{InvalidRepoRef, RepoRef},
    retention::RetentionPolicy,
};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrunerConfig {
    #[serde(default)]
    pub github: GitHubConfig,

    #[serde(default)]
    pub retention: RetentionConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl PrunerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: PrunerConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that do not depend on command-line overrides.
    ///
    /// The retention rule and repository are resolved separately through
    /// [`policy`](Self::policy) and [`repository`](Self::repository), since
    /// flags may still supply them.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.github.validate().map_err(ConfigError::Validation)
    }

    /// Apply command-line values on top of the loaded configuration.
    ///
    /// A retention rule given on the command line replaces the configured
    /// `min_runs`/`max_days` pair as a whole.
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(repo_url) = overrides.repo_url {
            self.github.repository = Some(repo_url);
        }
        if overrides.min_runs.is_some() || overrides.max_days.is_some() {
            self.retention.min_runs = overrides.min_runs;
            self.retention.max_days = overrides.max_days;
        }
        if let Some(dry_run) = overrides.dry_run {
            self.retention.dry_run = dry_run;
        }
        if let Some(path) = overrides.summary_path {
            self.retention.summary_path = path;
        }
    }

    /// Resolve the repository and retention rule, failing before any fetch.
    pub fn resolve(&self) -> Result<(RepoRef, RetentionPolicy), ConfigError> {
        self.validate()?;
        Ok((self.repository()?, self.policy()?))
    }

    /// The retention rule to apply.
    pub fn policy(&self) -> Result<RetentionPolicy, ConfigError> {
        self.retention.policy()
    }

    /// The repository to prune.
    pub fn repository(&self) -> Result<RepoRef, ConfigError> {
        let input = self.github.repository.as_deref().ok_or_else(|| {
            ConfigError::Validation(
                "no repository configured; pass --repo-url or set github.repository".into(),
            )
        })?;
        Ok(RepoRef::parse(input)?)
    }
}

/// Values supplied on the command line. `None` keeps the configured value.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub repo_url: Option<String>,
    pub min_runs: Option<i64>,
    pub max_days: Option<i64>,
    pub dry_run: Option<bool>,
    pub summary_path: Option<PathBuf>,
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Invalid repository: {0}")]
    Repository(#[from] InvalidRepoRef),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR}` references with environment values.
///
/// References after a `#` on the same line are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| ConfigError::Validation(e.to_string()))?;
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let (Some(whole), Some(name)) = (cap.get(0), cap.get(1)) else {
                continue;
            };
            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            result.push_str(&line[last_end..whole.start()]);
            let value = std::env::var(name.as_str())
                .map_err(|_| ConfigError::EnvVarNotFound(name.as_str().to_string()))?;
            result.push_str(&value);
            last_end = whole.end();
        }

        result.push_str(&line[last_end..]);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use serial_test::serial;

    use super::*;

    fn overrides(min_runs: Option<i64>, max_days: Option<i64>) -> ConfigOverrides {
        ConfigOverrides {
            repo_url: Some("owner/repo".into()),
            min_runs,
            max_days,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_config() {
        let config = PrunerConfig::from_str("").unwrap();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert!(config.retention.dry_run);
        assert_eq!(config.observability.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_full_config() {
        let toml = r#"
            [github]
            repository = "https://github.com/acme/widgets.git"
            token = "secret"
            api_url = "https://ghe.example.com/api/v3"

            [retention]
            max_days = 90
            dry_run = false

            [observability.logging]
            level = "debug"
            format = "json"
        "#;
        let config = PrunerConfig::from_str(toml).unwrap();
        assert_eq!(config.repository().unwrap(), RepoRef::new("acme", "widgets"));
        assert_eq!(config.policy().unwrap(), RetentionPolicy::KeepNewerThan(90));
        assert!(!config.retention.dry_run);
        assert_eq!(config.observability.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_unknown_section_rejected() {
        let err = PrunerConfig::from_str("[server]\nport = 8080").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_invalid_github_settings_rejected() {
        let err = PrunerConfig::from_str("[github]\nper_page = 500").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_repository() {
        let err = PrunerConfig::default().repository().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_malformed_repository() {
        let config = PrunerConfig::from_str("[github]\nrepository = \"not a repo\"").unwrap();
        assert!(matches!(
            config.repository().unwrap_err(),
            ConfigError::Repository(_)
        ));
    }

    #[test]
    #[serial]
    fn test_env_var_expansion() {
        temp_env::with_var("RUN_PRUNER_TEST_TOKEN", Some("ghp_abc"), || {
            let config =
                PrunerConfig::from_str("[github]\ntoken = \"${RUN_PRUNER_TEST_TOKEN}\"").unwrap();
            assert_eq!(config.github.token.as_deref(), Some("ghp_abc"));
        });
    }

    #[test]
    #[serial]
    fn test_env_var_missing() {
        temp_env::with_var_unset("RUN_PRUNER_MISSING_VAR", || {
            let err = PrunerConfig::from_str("[github]\ntoken = \"${RUN_PRUNER_MISSING_VAR}\"")
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::EnvVarNotFound(ref name) if name == "RUN_PRUNER_MISSING_VAR")
            );
        });
    }

    #[test]
    #[serial]
    fn test_env_vars_in_comments_are_ignored() {
        temp_env::with_var_unset("RUN_PRUNER_MISSING_VAR", || {
            let toml = "# token = \"${RUN_PRUNER_MISSING_VAR}\"\n[retention]\nmin_runs = 1 # ${RUN_PRUNER_MISSING_VAR}\n";
            let config = PrunerConfig::from_str(toml).unwrap();
            assert_eq!(config.retention.min_runs, Some(1));
        });
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[retention]\nmin_runs = 3").unwrap();

        let config = PrunerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.policy().unwrap(), RetentionPolicy::KeepLatest(3));
    }

    #[test]
    fn test_from_missing_file() {
        let err = PrunerConfig::from_file("/nonexistent/run-pruner.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }

    #[rstest]
    #[case::cli_max_days_replaces_min_runs("min_runs = 5", overrides(None, Some(30)), RetentionPolicy::KeepNewerThan(30))]
    #[case::cli_min_runs_replaces_max_days("max_days = 90", overrides(Some(2), None), RetentionPolicy::KeepLatest(2))]
    #[case::config_rule_kept("min_runs = 5", overrides(None, None), RetentionPolicy::KeepLatest(5))]
    #[case::cli_rule_only("", overrides(Some(0), None), RetentionPolicy::KeepLatest(0))]
    fn test_overrides_resolve_policy(
        #[case] retention: &str,
        #[case] overrides: ConfigOverrides,
        #[case] expected: RetentionPolicy,
    ) {
        let mut config = PrunerConfig::from_str(&format!("[retention]\n{retention}")).unwrap();
        config.apply_overrides(overrides);

        let (repo, policy) = config.resolve().unwrap();
        assert_eq!(repo, RepoRef::new("owner", "repo"));
        assert_eq!(policy, expected);
    }

    #[rstest]
    #[case::both_on_cli("", overrides(Some(3), Some(30)), "mutually exclusive")]
    #[case::neither_anywhere("", overrides(None, None), "required")]
    #[case::negative_min_runs("max_days = 10", overrides(Some(-1), None), "min_runs must not be negative")]
    #[case::negative_max_days("", overrides(None, Some(-7)), "max_days must not be negative")]
    fn test_overrides_rule_errors(
        #[case] retention: &str,
        #[case] overrides: ConfigOverrides,
        #[case] message: &str,
    ) {
        let mut config = PrunerConfig::from_str(&format!("[retention]\n{retention}")).unwrap();
        config.apply_overrides(overrides);

        let err = config.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert!(err.to_string().contains(message), "{err}");
    }

    #[test]
    fn test_overrides_repository_and_mode() {
        let mut config = PrunerConfig::from_str(
            "[github]\nrepository = \"old/repo\"\n[retention]\nmin_runs = 1\n",
        )
        .unwrap();
        config.apply_overrides(ConfigOverrides {
            repo_url: Some("git@github.com:new/repo.git".into()),
            dry_run: Some(false),
            summary_path: Some(PathBuf::from("out.json")),
            ..Default::default()
        });

        let (repo, _) = config.resolve().unwrap();
        assert_eq!(repo, RepoRef::new("new", "repo"));
        assert!(!config.retention.dry_run);
        assert_eq!(config.retention.summary_path, PathBuf::from("out.json"));
    }

    #[test]
    fn test_overrides_malformed_repository() {
        let mut config = PrunerConfig::default();
        config.apply_overrides(ConfigOverrides {
            repo_url: Some("https://gitlab.com/owner/repo".into()),
            min_runs: Some(1),
            ..Default::default()
        });
        assert!(matches!(config.resolve().unwrap_err(), ConfigError::Repository(_)));
    }
}
