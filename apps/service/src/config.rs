use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path:?}: {source}")]
    Read { path: PathBuf, source: std::io::Error },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("environment variable {0} is not set")]
    MissingEnv(String),
    #[error("invalid site {name}: {reason}")]
    InvalidSite { name: String, reason: String },
    #[error("duplicate site name: {0}")]
    DuplicateSite(String),
}

/// Top-level daemon configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub global: GlobalConfig,
    pub alerts: AlertConfig,
    pub sites: Vec<SiteConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    pub check_interval_seconds: u64,
    pub timeout_seconds: u64,
    pub db_path: PathBuf,
    pub log_level: String,
    pub confirm_down_after: u32,
    pub retention_days: i64,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            check_interval_seconds: 60,
            timeout_seconds: 10,
            db_path: PathBuf::from("/var/lib/webmon/checks.db"),
            log_level: "info".to_string(),
            confirm_down_after: 1,
            retention_days: 30,
        }
    }
}

/// Alert delivery settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AlertConfig {
    pub webhook_url: String,
}

/// A single monitored site.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub url: String,
    pub check_interval_seconds: Option<u64>,
    #[serde(default = "default_expected_status")]
    pub expected_status: u16,
}

fn default_expected_status() -> u16 {
    200
}

impl Config {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::parse(&raw)
    }

    /// Parse configuration from a TOML string, substituting `${VAR}`
    /// references in string values from the environment.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let value: toml::Value = toml::from_str(raw)?;
        let value = substitute_env(value)?;
        let config: Config = value.try_into()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.name.as_str()) {
                return Err(ConfigError::DuplicateSite(site.name.clone()));
            }

            let url = Url::parse(&site.url).map_err(|e| ConfigError::InvalidSite {
                name: site.name.clone(),
                reason: format!("invalid URL: {e}"),
            })?;

            match url.scheme() {
                "http" | "https" => {}
                other => {
                    return Err(ConfigError::InvalidSite {
                        name: site.name.clone(),
                        reason: format!("unsupported scheme: {other}"),
                    });
                }
            }
        }
        Ok(())
    }
}

fn substitute_env(value: toml::Value) -> Result<toml::Value, ConfigError> {
    use toml::Value;

    Ok(match value {
        Value::String(s) => Value::String(expand_env_vars(&s)?),
        Value::Array(items) => {
            Value::Array(items.into_iter().map(substitute_env).collect::<Result<_, _>>()?)
        }
        Value::Table(table) => Value::Table(
            table
                .into_iter()
                .map(|(key, item)| Ok((key, substitute_env(item)?)))
                .collect::<Result<_, ConfigError>>()?,
        ),
        other => other,
    })
}

/// Replace every `${NAME}` in `input` with the value of the environment
/// variable `NAME`. An unset variable is an error, not an empty string.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let tail = &rest[start + 2..];
        let Some(end) = tail.find('}') else {
            // No closing brace; keep the text literally.
            out.push_str(&rest[start..]);
            return Ok(out);
        };
        let name = &tail[..end];
        let value = env::var(name).map_err(|_| ConfigError::MissingEnv(name.to_string()))?;
        out.push_str(&value);
        rest = &tail[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[alerts]
webhook_url = "https://hooks.example.com/abc"

[[sites]]
name = "example"
url = "https://example.com"
"#;

    #[test]
    fn minimal_config_gets_defaults() {
        let config = Config::parse(MINIMAL).unwrap();
        assert_eq!(config.global.check_interval_seconds, 60);
        assert_eq!(config.global.timeout_seconds, 10);
        assert_eq!(config.global.confirm_down_after, 1);
        assert_eq!(config.global.retention_days, 30);
        assert_eq!(config.sites.len(), 1);
        assert_eq!(config.sites[0].expected_status, 200);
        assert!(config.sites[0].check_interval_seconds.is_none());
    }

    #[test]
    fn site_overrides_are_parsed() {
        let raw = r#"
[global]
check_interval_seconds = 30
confirm_down_after = 3

[alerts]
webhook_url = "https://hooks.example.com/abc"

[[sites]]
name = "api"
url = "https://api.example.com/health"
check_interval_seconds = 15
expected_status = 204
"#;
        let config = Config::parse(raw).unwrap();
        assert_eq!(config.global.check_interval_seconds, 30);
        assert_eq!(config.global.confirm_down_after, 3);
        assert_eq!(config.sites[0].check_interval_seconds, Some(15));
        assert_eq!(config.sites[0].expected_status, 204);
    }

    #[test]
    fn env_vars_are_substituted_in_strings() {
        unsafe { env::set_var("WEBMON_TEST_HOOK", "https://hooks.example.com/secret") };
        let raw = r#"
[alerts]
webhook_url = "${WEBMON_TEST_HOOK}"

[[sites]]
name = "example"
url = "https://example.com"
"#;
        let config = Config::parse(raw).unwrap();
        assert_eq!(config.alerts.webhook_url, "https://hooks.example.com/secret");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let raw = r#"
[alerts]
webhook_url = "${WEBMON_TEST_UNSET_VARIABLE}"

[[sites]]
name = "example"
url = "https://example.com"
"#;
        let err = Config::parse(raw).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(name) if name == "WEBMON_TEST_UNSET_VARIABLE"));
    }

    #[test]
    fn duplicate_site_names_are_rejected() {
        let raw = r#"
[alerts]
webhook_url = "https://hooks.example.com/abc"

[[sites]]
name = "example"
url = "https://example.com"

[[sites]]
name = "example"
url = "https://example.org"
"#;
        let err = Config::parse(raw).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSite(name) if name == "example"));
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let raw = r#"
[alerts]
webhook_url = "https://hooks.example.com/abc"

[[sites]]
name = "example"
url = "ftp://example.com"
"#;
        let err = Config::parse(raw).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSite { .. }));
    }

    #[test]
    fn text_without_references_is_untouched() {
        assert_eq!(expand_env_vars("no refs here").unwrap(), "no refs here");
    }

    #[test]
    fn unterminated_reference_is_kept_literally() {
        assert_eq!(expand_env_vars("x${OOPS").unwrap(), "x${OOPS");
    }

    #[test]
    fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, MINIMAL).unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.sites[0].name, "example");
    }
}
