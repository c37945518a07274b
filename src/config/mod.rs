#[cfg(feature = "cli")]
pub mod cli;

use crate::utils::error::{PluginError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_PAGERDUTY_API_URL: &str = "https://api.pagerduty.com";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10_000;
/// Upstream plugin stops after three pages; kept as the default.
pub const DEFAULT_MAX_PAGES: u32 = 3;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub pagerduty: PagerDutyConfig,
    #[serde(default)]
    pub techdocs: TechDocsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7007".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PagerDutyConfig {
    pub api_token: Option<String>,
    pub api_url: String,
    pub poll_interval_ms: u64,
    pub max_pages: u32,
    pub request_timeout_seconds: u64,
}

impl Default for PagerDutyConfig {
    fn default() -> Self {
        Self {
            api_token: None,
            api_url: DEFAULT_PAGERDUTY_API_URL.to_string(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            max_pages: DEFAULT_MAX_PAGES,
            request_timeout_seconds: 30,
        }
    }
}

impl PagerDutyConfig {
    /// 取得 API token；空字串或未替換的 `${VAR}` 視為未設定
    pub fn token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty() && !token.starts_with("${"))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TechDocsConfig {
    pub working_directory: PathBuf,
}

impl Default for TechDocsConfig {
    fn default() -> Self {
        Self {
            working_directory: std::env::temp_dir().join("techdocs"),
        }
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(PluginError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| PluginError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${PAGERDUTY_TOKEN})，未定義的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| PluginError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.bind_address", &self.server.bind_address)?;
        if self.server.bind_address.parse::<std::net::SocketAddr>().is_err() {
            return Err(PluginError::InvalidConfigValueError {
                field: "server.bind_address".to_string(),
                value: self.server.bind_address.clone(),
                reason: "Expected <ip>:<port>".to_string(),
            });
        }

        validation::validate_url("pagerduty.api_url", &self.pagerduty.api_url)?;
        validation::validate_positive_number(
            "pagerduty.poll_interval_ms",
            self.pagerduty.poll_interval_ms,
            100,
        )?;
        validation::validate_range("pagerduty.max_pages", self.pagerduty.max_pages, 1, 100)?;
        validation::validate_positive_number(
            "pagerduty.request_timeout_seconds",
            self.pagerduty.request_timeout_seconds,
            1,
        )?;

        validation::validate_path(
            "techdocs.working_directory",
            &self.techdocs.working_directory.to_string_lossy(),
        )?;

        Ok(())
    }
}
