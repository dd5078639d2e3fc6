use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration file structure for alm-import.
///
/// Holds tracker coordinates, the retry/throttling policy and the on-disk
/// layout of an import run. Every section falls back to defaults, so a config
/// file only needs the values that differ.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// Remote tracker coordinates and credentials
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Retry and throttling policy for suite retrieval
    #[serde(default)]
    pub fetch: FetchConfig,

    /// File layout of an import run
    #[serde(default)]
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TrackerConfig {
    /// Base URL of the test plan API (e.g. `https://host/org/project/_apis/testplan/Plans`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Test plan the suites belong to
    #[serde(default)]
    pub plan_id: u64,

    /// Suite at which ancestor chains stop
    #[serde(default)]
    pub root_suite_id: u64,

    pub login: Option<String>,

    pub password: Option<String>,

    /// Sent as the `api-version` query parameter when set
    pub api_version: Option<String>,

    /// Skip TLS certificate validation (self-signed on-premise servers)
    #[serde(default)]
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct FetchConfig {
    /// Total attempts per suite, including the first one
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before retry `n` is `backoff_factor_ms * 2^(n-1)`
    #[serde(default = "default_backoff_factor_ms")]
    pub backoff_factor_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// HTTP statuses treated as transient
    #[serde(default = "default_retry_statuses")]
    pub retry_statuses: Vec<u16>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Minimum spacing between two requests to the tracker
    #[serde(default = "default_delay_between_requests_ms")]
    pub delay_between_requests_ms: u64,

    /// Suites fetched simultaneously (1 = strictly sequential)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PathsConfig {
    /// Flat suite list exported from the tracker
    #[serde(default = "default_suites_file")]
    pub suites_file: PathBuf,

    /// Working directory of an import run
    #[serde(default = "default_work_dir")]
    pub work_dir: PathBuf,

    /// Hierarchy map file name, relative to `work_dir`
    #[serde(default = "default_hierarchy_file")]
    pub hierarchy_file: PathBuf,

    /// Directory for raw per-suite payloads (defaults to `work_dir`)
    pub raw_dir: Option<PathBuf>,

    /// Root folder for normalized test cases
    #[serde(default = "default_target_dir")]
    pub target_dir: PathBuf,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            plan_id: 0,
            root_suite_id: 0,
            login: None,
            password: None,
            api_version: None,
            accept_invalid_certs: false,
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_factor_ms: default_backoff_factor_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            retry_statuses: default_retry_statuses(),
            request_timeout_secs: default_request_timeout_secs(),
            delay_between_requests_ms: default_delay_between_requests_ms(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            suites_file: default_suites_file(),
            work_dir: default_work_dir(),
            hierarchy_file: default_hierarchy_file(),
            raw_dir: None,
            target_dir: default_target_dir(),
        }
    }
}

impl PathsConfig {
    pub fn hierarchy_path(&self) -> PathBuf {
        self.work_dir.join(&self.hierarchy_file)
    }

    pub fn raw_dir(&self) -> PathBuf {
        self.raw_dir.clone().unwrap_or_else(|| self.work_dir.clone())
    }
}

fn default_base_url() -> String {
    "https://dev.azure.com/".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_factor_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_retry_statuses() -> Vec<u16> {
    vec![429, 500, 502, 503, 504]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_delay_between_requests_ms() -> u64 {
    500
}

fn default_max_concurrent() -> usize {
    1
}

fn default_suites_file() -> PathBuf {
    PathBuf::from("all_suites.json")
}

fn default_work_dir() -> PathBuf {
    PathBuf::from("from_alm")
}

fn default_hierarchy_file() -> PathBuf {
    PathBuf::from("suite_hierarchy_map.json")
}

fn default_target_dir() -> PathBuf {
    PathBuf::from("test_cases").join("from alm")
}

impl Config {
    /// Load configuration from a file.
    ///
    /// Searches for configuration files in this order:
    /// 1. Specified path (must exist)
    /// 2. ./alm-import.toml
    /// 3. ./alm-import.json
    /// 4. ./alm-import.yaml
    /// 5. ./alm-import.yml
    /// 6. `<config dir>/alm-import/config.toml`
    ///
    /// Returns default configuration if no file is found.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            return Self::load_from_path(path);
        }

        let candidates = [
            "alm-import.toml",
            "alm-import.json",
            "alm-import.yaml",
            "alm-import.yml",
        ];

        for candidate in &candidates {
            let path = Path::new(candidate);
            if path.exists() {
                return Self::load_from_path(path);
            }
        }

        if let Some(user_config) = dirs::config_dir().map(|dir| dir.join("alm-import/config.toml"))
        {
            if user_config.exists() {
                return Self::load_from_path(&user_config);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file path.
    fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or("");

        match extension {
            "toml" => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display())),
            "json" => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display())),
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .with_context(|| format!("Failed to parse YAML config: {}", path.display())),
            _ => toml::from_str(&contents)
                .or_else(|_| serde_json::from_str(&contents))
                .or_else(|_| serde_yaml::from_str(&contents))
                .with_context(|| format!("Failed to parse config file: {}", path.display())),
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => serde_json::to_string_pretty(self)?,
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            _ => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }
}
