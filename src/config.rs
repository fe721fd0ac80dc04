use directories::ProjectDirs;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config directory not found")]
    NoConfigDir,
    #[error("config file not found at {0}")]
    NotFound(PathBuf),
    #[error("failed to read config: {0}")]
    ReadError(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("validation failed: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub jackett: JackettConfig,
    pub debrid: DebridConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JackettConfig {
    /// Torznab endpoint, e.g. http://localhost:9117/api/v2.0/indexers/all/results/torznab
    pub url: String,
    pub apikey: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DebridConfig {
    pub token: String,
    /// Override for the debrid API base URL (mainly for testing)
    pub url: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.clone()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn config_path() -> Result<PathBuf, ConfigError> {
        ProjectDirs::from("", "", "debridstream")
            .map(|dirs| dirs.config_dir().join("config.toml"))
            .ok_or(ConfigError::NoConfigDir)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_http_url(&self.jackett.url, "jackett.url")?;

        if self.jackett.apikey.is_empty() {
            return Err(ConfigError::ValidationError(
                "jackett.apikey cannot be empty".to_string(),
            ));
        }

        if self.debrid.token.is_empty() {
            return Err(ConfigError::ValidationError(
                "debrid.token cannot be empty".to_string(),
            ));
        }

        if let Some(ref override_url) = self.debrid.url {
            validate_http_url(override_url, "debrid.url")?;
        }

        Ok(())
    }
}

fn validate_http_url(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::ValidationError(format!(
            "{} cannot be empty",
            field
        )));
    }

    let parsed = url::Url::parse(value)
        .map_err(|e| ConfigError::ValidationError(format!("{}: {}", field, e)))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ConfigError::ValidationError(format!(
            "{} must start with http:// or https://",
            field
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(contents: &str) -> Result<Config, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    #[test]
    fn test_valid_config() {
        let config = parse(
            r#"
[jackett]
url = "http://localhost:9117/api/v2.0/indexers/all/results/torznab"
apikey = "abc123"

[debrid]
token = "tok"
"#,
        )
        .unwrap();

        assert_eq!(config.jackett.apikey, "abc123");
        assert!(config.debrid.url.is_none());
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = parse(
            r#"
[jackett]
url = "ftp://indexer"
apikey = "abc123"

[debrid]
token = "tok"
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_rejects_empty_token() {
        let err = parse(
            r#"
[jackett]
url = "http://localhost:9117"
apikey = "abc123"

[debrid]
token = ""
"#,
        )
        .unwrap_err();

        assert!(matches!(err, ConfigError::ValidationError(_)));
    }
}
