//! Run configuration
//!
//! Configuration is layered: built-in defaults, then an optional JSON file
//! named by `STAGELOAD_CONFIG`, then individual environment variables. The
//! result is validated before any request is issued.
//!
//! ```json
//! {
//!   "target_url": "http://php-apache.example/",
//!   "policy": "linear",
//!   "stages": [
//!     { "target": 5, "duration": "1m" },
//!     { "target": 0, "duration": "1m" }
//!   ],
//!   "checks": [
//!     { "name": "status is 200", "type": "status_equals", "status": 200 },
//!     { "name": "proxied", "type": "header_equals", "header": "X-Beamlit-Proxy", "value": "true" }
//!   ],
//!   "think_time": "1s"
//! }
//! ```

use std::collections::{BTreeMap, HashSet};
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;
use thiserror::Error;

use crate::check::{Check, default_checks};
use crate::profile::duration::{MAX_DURATION, human_opt, parse_duration};
use crate::profile::{ProfileError, RampPolicy, RampProfile, Stage};
use crate::report::{ReportConfig, ReportFormat};

/// Environment variable naming the JSON config file
pub const CONFIG_PATH_ENV: &str = "STAGELOAD_CONFIG";

/// Errors that prevent a run from starting
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Target URL is required (set TARGET_URL or target_url)")]
    MissingTargetUrl,

    #[error("Invalid target URL {url:?}: {reason}")]
    InvalidTargetUrl { url: String, reason: String },

    #[error("Invalid ramp profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("Check #{index} has an empty name")]
    EmptyCheckName { index: usize },

    #[error("Duplicate check name: {0:?}")]
    DuplicateCheckName(String),

    #[error("Invalid request header {name:?}: {reason}")]
    InvalidHeader { name: String, reason: String },

    #[error("{0} must be greater than zero")]
    ZeroDuration(&'static str),

    #[error("{0} must not be longer than one year")]
    DurationTooLong(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

/// Main run configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// What each virtual user requests
    pub request: RequestConfig,

    /// How load is shaped and judged
    pub load: LoadConfig,

    /// Where the final report goes
    pub report: ReportConfig,

    /// Serve Prometheus metrics on this address (optional)
    pub metrics_addr: Option<SocketAddr>,
}

/// Request-related configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Target URL for every GET
    pub url: String,
    /// Per-request timeout
    pub timeout: Duration,
    /// Static headers sent with every request
    pub headers: BTreeMap<String, String>,
}

/// Load-shaping configuration consumed by the driver
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Stages to run through
    pub profile: RampProfile,
    /// Transition policy between stage targets
    pub policy: RampPolicy,
    /// Checks evaluated on every response
    pub checks: Vec<Check>,
    /// Pause between iterations of one virtual user
    pub think_time: Duration,
    /// Upper bound of uniform random jitter added to `think_time`
    pub think_time_jitter: Duration,
    /// How long draining waits for in-flight iterations
    pub graceful_stop: Duration,
    /// How often the driver re-evaluates target concurrency
    pub tick_interval: Duration,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: Duration::from_secs(30),
            headers: BTreeMap::new(),
        }
    }
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            profile: RampProfile::default(),
            policy: RampPolicy::default(),
            checks: default_checks(),
            think_time: Duration::ZERO,
            think_time_jitter: Duration::ZERO,
            graceful_stop: Duration::from_secs(30),
            tick_interval: Duration::from_millis(100),
        }
    }
}

impl RequestConfig {
    /// Parse the target URL, accepting only http and https
    pub fn parse_url(&self) -> Result<Url, ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::MissingTargetUrl);
        }
        let url = Url::parse(self.url.trim()).map_err(|e| ConfigError::InvalidTargetUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;
        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(ConfigError::InvalidTargetUrl {
                url: self.url.clone(),
                reason: format!("unsupported scheme {:?}", other),
            }),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.parse_url()?;
        if self.timeout.is_zero() {
            return Err(ConfigError::ZeroDuration("request_timeout"));
        }
        within_limit("request_timeout", Some(self.timeout))
    }
}

impl LoadConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for (index, check) in self.checks.iter().enumerate() {
            if check.name.trim().is_empty() {
                return Err(ConfigError::EmptyCheckName { index });
            }
            if !seen.insert(check.name.as_str()) {
                return Err(ConfigError::DuplicateCheckName(check.name.clone()));
            }
        }
        if self.tick_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("tick_interval"));
        }
        within_limit(
            "think_time + think_time_jitter",
            self.think_time.checked_add(self.think_time_jitter),
        )?;
        within_limit("graceful_stop", Some(self.graceful_stop))?;
        within_limit("tick_interval", Some(self.tick_interval))
    }
}

/// `None` stands for an overflowed sum
fn within_limit(name: &'static str, value: Option<Duration>) -> Result<(), ConfigError> {
    match value {
        Some(d) if d <= MAX_DURATION => Ok(()),
        _ => Err(ConfigError::DurationTooLong(name)),
    }
}

/// On-disk shape of the JSON config file; every field is optional
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    target_url: Option<String>,
    stages: Option<Vec<Stage>>,
    policy: Option<RampPolicy>,
    checks: Option<Vec<Check>>,
    headers: Option<BTreeMap<String, String>>,
    #[serde(with = "human_opt")]
    request_timeout: Option<Duration>,
    #[serde(with = "human_opt")]
    think_time: Option<Duration>,
    #[serde(with = "human_opt")]
    think_time_jitter: Option<Duration>,
    #[serde(with = "human_opt")]
    graceful_stop: Option<Duration>,
    #[serde(with = "human_opt")]
    tick_interval: Option<Duration>,
    report: Option<ReportConfig>,
    metrics_addr: Option<SocketAddr>,
}

impl Config {
    /// Load configuration from the optional config file and the environment
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var(CONFIG_PATH_ENV) {
            Ok(path) if !path.is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON config file layered over the defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse JSON config text layered over the defaults
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(text).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;

        let mut config = Self::default();
        if let Some(url) = file.target_url {
            config.request.url = url;
        }
        if let Some(stages) = file.stages {
            config.load.profile = RampProfile::new(stages)?;
        }
        if let Some(policy) = file.policy {
            config.load.policy = policy;
        }
        if let Some(checks) = file.checks {
            config.load.checks = checks;
        }
        if let Some(headers) = file.headers {
            config.request.headers = headers;
        }
        if let Some(timeout) = file.request_timeout {
            config.request.timeout = timeout;
        }
        if let Some(d) = file.think_time {
            config.load.think_time = d;
        }
        if let Some(d) = file.think_time_jitter {
            config.load.think_time_jitter = d;
        }
        if let Some(d) = file.graceful_stop {
            config.load.graceful_stop = d;
        }
        if let Some(d) = file.tick_interval {
            config.load.tick_interval = d;
        }
        if let Some(report) = file.report {
            config.report = report;
        }
        if file.metrics_addr.is_some() {
            config.metrics_addr = file.metrics_addr;
        }

        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    ///
    /// Unlike the JSON file, a malformed override is an error rather than
    /// being ignored: a typo in `STAGES` must not silently run the default
    /// profile.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let duration = |key: &'static str, value: String| {
            parse_duration(&value).map_err(|_| ConfigError::InvalidEnv { key, value })
        };

        if let Some(url) = lookup("TARGET_URL")
            && !url.is_empty()
        {
            self.request.url = url;
        }
        if let Some(stages) = lookup("STAGES")
            && !stages.is_empty()
        {
            self.load.profile = RampProfile::parse_compact(&stages)?;
        }
        if let Some(policy) = lookup("RAMP_POLICY")
            && !policy.is_empty()
        {
            self.load.policy = policy.parse()?;
        }
        if let Some(val) = lookup("REQUEST_TIMEOUT") {
            self.request.timeout = duration("REQUEST_TIMEOUT", val)?;
        }
        if let Some(val) = lookup("THINK_TIME") {
            self.load.think_time = duration("THINK_TIME", val)?;
        }
        if let Some(val) = lookup("THINK_TIME_JITTER") {
            self.load.think_time_jitter = duration("THINK_TIME_JITTER", val)?;
        }
        if let Some(val) = lookup("GRACEFUL_STOP") {
            self.load.graceful_stop = duration("GRACEFUL_STOP", val)?;
        }
        if let Some(val) = lookup("REPORT_FORMAT") {
            self.report.format = match val.to_lowercase().as_str() {
                "text" => ReportFormat::Text,
                "json" => ReportFormat::Json,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        key: "REPORT_FORMAT",
                        value: val,
                    });
                }
            };
        }
        if let Some(path) = lookup("REPORT_PATH")
            && !path.is_empty()
        {
            self.report.path = Some(PathBuf::from(path));
        }
        if let Some(val) = lookup("METRICS_ADDR")
            && !val.is_empty()
        {
            self.metrics_addr = Some(val.parse().map_err(|_| ConfigError::InvalidEnv {
                key: "METRICS_ADDR",
                value: val,
            })?);
        }

        Ok(())
    }

    /// Reject anything that would make the run meaningless
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.request.validate()?;
        self.load.validate()
    }
}
