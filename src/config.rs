use anyhow::{anyhow, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

pub const API_KEY_ENV: &str = "RAPID_API_KEY";

/// One RapidAPI endpoint: where to send requests and which host header to use.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub base_url: String,
    pub host: String,
}

impl EndpointConfig {
    fn rapidapi(host: &str, path: &str) -> Self {
        Self {
            base_url: format!("https://{host}{path}"),
            host: host.to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub twitter: EndpointConfig,
    pub tiktok_primary: EndpointConfig,
    pub tiktok_secondary: EndpointConfig,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            twitter: EndpointConfig::rapidapi("all-video-downloader1.p.rapidapi.com", "/all"),
            tiktok_primary: EndpointConfig::rapidapi(
                "tiktok-downloader-download-tiktok-videos-without-watermark.p.rapidapi.com",
                "/index",
            ),
            tiktok_secondary: EndpointConfig::rapidapi("tiktok-video-no-watermark2.p.rapidapi.com", "/"),
        }
    }
}

/// The structure of our configuration file (config.toml)
#[derive(Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Zero disables the timeout.
    pub upstream_timeout_secs: u64,
    pub providers: ProviderEndpoints,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            api_key: None,
            upstream_timeout_secs: 30,
            providers: ProviderEndpoints::default(),
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("upstream_timeout_secs", &self.upstream_timeout_secs)
            .field("providers", &self.providers)
            .finish()
    }
}

impl Config {
    /// The API key, ignoring blank values.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|key| !key.is_empty())
    }

    pub fn upstream_timeout(&self) -> Option<Duration> {
        (self.upstream_timeout_secs > 0).then(|| Duration::from_secs(self.upstream_timeout_secs))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Applies `RAPID_API_KEY`, `HOST` and `PORT` from `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(host) = lookup("HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .map_err(|e| anyhow!("Invalid PORT value '{}': {}", port, e))?;
        }
        Ok(())
    }

    /// Copy safe to print.
    pub fn redacted(&self) -> Config {
        let mut copy = self.clone();
        if copy.api_key.is_some() {
            copy.api_key = Some("<redacted>".to_string());
        }
        copy
    }
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("dev", "tikdrop", "tikdrop")
        .ok_or_else(|| anyhow!("Could not find a valid home directory to store config"))
}

/// Returns the cross-platform path to the configuration file, creating the directory if needed.
pub async fn default_config_path() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let config_dir = project_dirs.config_dir();
    fs::create_dir_all(config_dir).await?;
    Ok(config_dir.join("config.toml"))
}

/// Where the CLI keeps its local download history.
pub async fn history_path() -> Result<PathBuf> {
    let project_dirs = project_dirs()?;
    let data_dir = project_dirs.data_local_dir();
    fs::create_dir_all(data_dir).await?;
    Ok(data_dir.join("history.json"))
}

/// Loads the configuration from the file, or creates a default one if it doesn't exist.
pub async fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        tracing::info!(
            "No config file found. Creating a default one at: {}",
            path.display()
        );
        let default_config = Config::default();
        save_config(path, &default_config).await?;
        return Ok(default_config);
    }

    let config_content = fs::read_to_string(path).await?;
    let config: Config = toml::from_str(&config_content)
        .map_err(|e| anyhow!("Failed to parse config file at {}: {}", path.display(), e))?;

    Ok(config)
}

pub async fn save_config(path: &Path, config: &Config) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let toml_string = toml::to_string_pretty(config)?;
    fs::write(path, toml_string).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::default();
        config
            .apply_env(env(&[(API_KEY_ENV, "abc"), ("HOST", "0.0.0.0"), ("PORT", "8080")]))
            .unwrap();

        assert_eq!(config.api_key(), Some("abc"));
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn bad_port_is_rejected() {
        let mut config = Config::default();
        assert!(config.apply_env(env(&[("PORT", "eighty")])).is_err());
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let mut config = Config::default();
        config.apply_env(env(&[(API_KEY_ENV, "   ")])).unwrap();
        assert_eq!(config.api_key(), None);
    }

    #[test]
    fn zero_timeout_disables_it() {
        let mut config = Config::default();
        assert_eq!(config.upstream_timeout(), Some(Duration::from_secs(30)));
        config.upstream_timeout_secs = 0;
        assert_eq!(config.upstream_timeout(), None);
    }

    #[test]
    fn key_never_printed() {
        let mut config = Config::default();
        config.api_key = Some("hunter2".to_string());

        assert!(!format!("{config:?}").contains("hunter2"));
        let printed = toml::to_string_pretty(&config.redacted()).unwrap();
        assert!(!printed.contains("hunter2"));
    }

    #[test]
    fn partial_file_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            port = 9000

            [providers.tiktok_secondary]
            base_url = "http://localhost:9999/"
            host = "localhost"
            "#,
        )
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.providers.tiktok_secondary.host, "localhost");
        assert_eq!(config.providers.twitter, ProviderEndpoints::default().twitter);
    }

    #[tokio::test]
    async fn missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = load_config(&path).await.unwrap();
        assert_eq!(config, Config::default());
        assert!(path.exists());

        let reloaded = load_config(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }
}
