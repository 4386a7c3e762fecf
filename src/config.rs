use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Default number of rows per page for list views
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    pub news_api: NewsApiConfig,
}

fn default_database_url() -> String {
    "sqlite:newsdesk.db?mode=rwc".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0:8090".to_string()
}

fn default_page_size() -> u32 {
    20
}

#[derive(Debug, Deserialize, Clone)]
pub struct NewsApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_country")]
    pub country: String,
    /// Number of headlines requested per ingestion call
    #[serde(default = "default_api_page_size")]
    pub page_size: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_base_url() -> String {
    "https://newsapi.org/v2".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_api_page_size() -> u32 {
    100
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    "Newsdesk/0.1 (News Aggregator)".to_string()
}

impl Default for NewsApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: String::new(),
            country: default_country(),
            page_size: default_api_page_size(),
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }

    /// Let `DATABASE_URL`, `NEWS_API_KEY` and `BIND_ADDRESS` win over the file.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = get("DATABASE_URL") {
            self.database_url = url;
        }
        if let Some(key) = get("NEWS_API_KEY") {
            self.news_api.api_key = key;
        }
        if let Some(addr) = get("BIND_ADDRESS") {
            self.bind_address = addr;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults() {
        assert_eq!(default_page_size(), 20);
        assert_eq!(default_bind_address(), "0.0.0.0:8090");
        assert_eq!(default_api_page_size(), 100);
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
            database_url = "sqlite:test.db?mode=rwc"
            bind_address = "127.0.0.1:9000"
            page_size = 10

            [news_api]
            base_url = "https://api.example.com/v2"
            api_key = "secret"
            country = "kr"
            page_size = 50
        "#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let config = Config::load(temp_file.path()).unwrap();

        assert_eq!(config.database_url, "sqlite:test.db?mode=rwc");
        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.page_size, 10);
        assert_eq!(config.news_api.base_url, "https://api.example.com/v2");
        assert_eq!(config.news_api.api_key, "secret");
        assert_eq!(config.news_api.country, "kr");
        assert_eq!(config.news_api.page_size, 50);
        assert_eq!(config.news_api.timeout_secs, 30);
    }

    #[test]
    fn test_load_config_with_defaults() {
        let content = r#"
            [news_api]
            api_key = "secret"
        "#;

        let config = Config::from_str(content).unwrap();

        assert_eq!(config.database_url, "sqlite:newsdesk.db?mode=rwc");
        assert_eq!(config.page_size, 20);
        assert_eq!(config.news_api.base_url, "https://newsapi.org/v2");
        assert_eq!(config.news_api.country, "us");
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = Config::load("/nonexistent/path/newsdesk.toml");
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_invalid_toml() {
        let content = "this is not valid toml {{{";

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();

        let result = Config::load(temp_file.path());
        assert!(result.is_err());
    }

    #[test]
    fn test_load_config_missing_news_api_section() {
        let result = Config::from_str("page_size = 5");
        assert!(result.is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::from_str("[news_api]\napi_key = \"file-key\"").unwrap();
        let env: HashMap<&str, &str> = [
            ("DATABASE_URL", "sqlite::memory:"),
            ("NEWS_API_KEY", "env-key"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_url, "sqlite::memory:");
        assert_eq!(config.news_api.api_key, "env-key");
        assert_eq!(config.bind_address, "0.0.0.0:8090");
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut config = Config::from_str("[news_api]\napi_key = \"file-key\"").unwrap();

        config.apply_overrides(|_| Some("  ".to_string()));

        assert_eq!(config.news_api.api_key, "file-key");
        assert_eq!(config.database_url, "sqlite:newsdesk.db?mode=rwc");
    }
}
