use crate::compass::*;

use serde::{Deserialize, Serialize};
use statement_matching::catalog::TextEncoding;
use statement_matching::{FillRules, DEFAULT_THRESHOLD};
use std::time::Duration;

pub const DEFAULT_TEST_URL: &str = "https://www.politicalcompass.org/test/en?page=1";
pub const DEFAULT_DRIVER_PORT: u16 = 9515;

/// The settings of a run. Every field is optional, the defaults reproduce a standard
/// run against a local chromedriver.
#[derive(PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "webdriverUrl")]
    pub webdriver_url: Option<String>,
    #[serde(rename = "chromedriverPath")]
    pub chromedriver_path: Option<String>,
    #[serde(rename = "chromedriverPort")]
    pub chromedriver_port: Option<u16>,
    #[serde(rename = "chromeBinaryPath")]
    pub chrome_binary_path: Option<String>,
    #[serde(rename = "headless")]
    pub headless: Option<bool>,
    #[serde(rename = "windowSize")]
    pub window_size: Option<String>,
    #[serde(rename = "testUrl")]
    pub test_url: Option<String>,
    #[serde(rename = "totalPages")]
    pub total_pages: Option<u32>,
    #[serde(rename = "matchThreshold")]
    pub match_threshold: Option<f64>,
    #[serde(rename = "selectAttempts")]
    pub select_attempts: Option<u32>,
    #[serde(rename = "retryDelayMs")]
    pub retry_delay_ms: Option<u64>,
    #[serde(rename = "elementTimeoutSecs")]
    pub element_timeout_secs: Option<u64>,
    #[serde(rename = "pauseBetweenFilesMs")]
    pub pause_between_files_ms: Option<u64>,
    #[serde(rename = "encodings")]
    pub encodings: Option<Vec<String>>,
}

impl RunConfig {
    pub fn driver_port(&self) -> u16 {
        self.chromedriver_port.unwrap_or(DEFAULT_DRIVER_PORT)
    }

    pub fn webdriver_url(&self) -> String {
        match &self.webdriver_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("http://localhost:{}", self.driver_port()),
        }
    }

    pub fn headless(&self) -> bool {
        self.headless.unwrap_or(true)
    }

    pub fn window_size(&self) -> String {
        self.window_size
            .clone()
            .unwrap_or_else(|| "1920,1080".to_string())
    }

    pub fn test_url(&self) -> String {
        self.test_url
            .clone()
            .unwrap_or_else(|| DEFAULT_TEST_URL.to_string())
    }

    pub fn element_timeout(&self) -> Duration {
        Duration::from_secs(self.element_timeout_secs.unwrap_or(10))
    }

    pub fn pause_between_files(&self) -> Duration {
        Duration::from_millis(self.pause_between_files_ms.unwrap_or(2000))
    }

    pub fn fill_rules(&self) -> CompassResult<FillRules> {
        let threshold = self.match_threshold.unwrap_or(DEFAULT_THRESHOLD);
        if !(0.0..=1.0).contains(&threshold) {
            whatever!("matchThreshold must be between 0 and 1, got {}", threshold)
        }
        let defaults = FillRules::DEFAULT_RULES;
        Ok(FillRules {
            threshold,
            total_pages: self.total_pages.unwrap_or(defaults.total_pages),
            max_attempts: self.select_attempts.unwrap_or(defaults.max_attempts),
            retry_delay: self
                .retry_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry_delay),
        })
    }

    pub fn encodings(&self) -> CompassResult<Vec<TextEncoding>> {
        match &self.encodings {
            None => Ok(TextEncoding::DEFAULT_ORDER.to_vec()),
            Some(names) => {
                let mut res: Vec<TextEncoding> = Vec::new();
                for name in names.iter() {
                    let enc =
                        TextEncoding::from_name(name).context(UnknownEncodingSnafu { name })?;
                    res.push(enc);
                }
                if res.is_empty() {
                    whatever!("at least one encoding must be provided")
                }
                Ok(res)
            }
        }
    }
}

pub fn read_config(path: &str) -> CompassResult<RunConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: content: {:?}", contents);
    let config: RunConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    Ok(config)
}
