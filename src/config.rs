//! Configuration for the scraper and the batch runner.

use serde::{Deserialize, Serialize};

/// Page fetching configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScraperConfig {
    /// Politeness interval between page fetches
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Time given to client-side rendering after navigation
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,
    /// Consecutive empty pages that mean the history is exhausted
    #[serde(default = "default_max_empty_pages")]
    pub max_empty_pages: u32,
    #[serde(default = "default_headless")]
    pub headless: bool,
    #[serde(default)]
    pub chrome_path: Option<String>,
}

fn default_page_delay_ms() -> u64 {
    2000
}

fn default_settle_ms() -> u64 {
    4000
}

fn default_render_timeout_secs() -> u64 {
    30
}

fn default_max_empty_pages() -> u32 {
    3
}

fn default_headless() -> bool {
    true
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            page_delay_ms: default_page_delay_ms(),
            settle_ms: default_settle_ms(),
            render_timeout_secs: default_render_timeout_secs(),
            max_empty_pages: default_max_empty_pages(),
            headless: default_headless(),
            chrome_path: None,
        }
    }
}

/// Batch runner configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Wall-clock budget per player job
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Wait between the graceful stop request and the forced kill
    #[serde(default = "default_grace_secs")]
    pub grace_secs: u64,
    /// Politeness delay between player jobs
    #[serde(default = "default_job_delay_ms")]
    pub job_delay_ms: u64,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_grace_secs() -> u64 {
    2
}

fn default_job_delay_ms() -> u64 {
    1000
}

fn default_output_dir() -> String {
    "player_data".to_string()
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            grace_secs: default_grace_secs(),
            job_delay_ms: default_job_delay_ms(),
            output_dir: default_output_dir(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub scraper: ScraperConfig,
    #[serde(default)]
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Load configuration from environment and config file
    pub fn load() -> anyhow::Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Config::try_from(&AppConfig::default())?)
            .add_source(config::File::with_name("config").required(false))
            // DUPR_BATCH__TIMEOUT_SECS, DUPR_SCRAPER__HEADLESS, ...
            .add_source(
                config::Environment::with_prefix("DUPR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
