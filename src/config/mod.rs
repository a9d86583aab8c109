use anyhow::Result;
use dotenvy::dotenv;
use serde::Deserialize;

fn default_database_url() -> String {
    "sqlite://clients.db".to_string()
}

fn default_log_file() -> String {
    "client_manager.log".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Configuration for the application
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Storage location, e.g. `sqlite://clients.db`
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// File receiving log output
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// `tracing_subscriber::EnvFilter` directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            log_file: default_log_file(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Reads `DATABASE_URL`, `LOG_FILE` and `LOG_FILTER`, after loading a
    /// `.env` file if one exists.
    pub fn load() -> Result<Self> {
        dotenv().ok();

        let config = envy::from_env::<Config>()?;

        Ok(config)
    }

    /// Get a direct reference to the database URL
    pub fn database_url(&self) -> &str {
        &self.database_url
    }
}

/// Initialize environment variables and load configuration
pub fn init() -> Result<Config> {
    Config::load()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_variables_fall_back_to_defaults() {
        let vars: Vec<(String, String)> = Vec::new();
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.database_url(), "sqlite://clients.db");
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn variables_override_defaults() {
        let vars = vec![
            ("DATABASE_URL".to_string(), "sqlite::memory:".to_string()),
            ("LOG_FILE".to_string(), "/tmp/cm.log".to_string()),
        ];
        let config: Config = envy::from_iter(vars).unwrap();
        assert_eq!(config.database_url(), "sqlite::memory:");
        assert_eq!(config.log_file, "/tmp/cm.log");
    }
}
