//! Configuration file parsing and structures.
//!
//! Every section and key is optional; a missing file gives the same result as
//! an empty one. The remote service URL can also be supplied on the command
//! line or through `WASHBOARD_API_URL`, which take precedence over the file.

use std::collections::BTreeSet;
use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::filter::Targets;

use crate::engine::Appliance;
use crate::engine::EngineSettings;

/// Config file read when `--config` is not given. It may be absent.
pub const DEFAULT_CONFIG_PATH: &str = "washboard.toml";

pub const DEFAULT_API_URL: &str = "http://localhost:8001";

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub display: DisplayConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: LogLevel,

    /// Per-target levels, e.g. `"washboard::remote" = "debug"`
    pub overrides: HashMap<String, LogLevel>,
}

impl LoggingConfig {
    /// Build the filter for the fmt layer.
    pub fn filter(&self) -> Targets {
        Targets::new()
            .with_default(LevelFilter::from(self.level))
            .with_targets(
                self.overrides
                    .iter()
                    .map(|(target, level)| (target.clone(), LevelFilter::from(*level))),
            )
    }
}

/// Where the laundry status service lives.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub base_url: String,

    /// Per-request timeout for every call to the service
    pub request_timeout_ms: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            request_timeout_ms: 4000,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Appliances shown, in order. A single appliance switches the display to
    /// toggle mode.
    pub appliances: Vec<Appliance>,

    pub poll_interval_ms: u64,
    pub settle_delay_ms: u64,

    /// Reload user names on this period. Unset loads them once.
    pub names_refresh_interval_ms: Option<u64>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        let settings = EngineSettings::default();
        Self {
            appliances: settings.appliances,
            poll_interval_ms: 5000,
            settle_delay_ms: 300,
            names_refresh_interval_ms: None,
        }
    }
}

/// HTTP API the presentation layer talks to
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub listen: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen: "127.0.0.1".to_string(),
            port: 8600,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(path.as_ref().to_path_buf(), e))?;

        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Load `path` if given, otherwise [`DEFAULT_CONFIG_PATH`] if it exists,
    /// otherwise all defaults.
    ///
    /// An explicitly named file has to exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => Ok(Self::default()),
        }
    }

    /// Override the remote base URL, e.g. from the command line.
    pub fn with_api_url(mut self, api_url: Option<String>) -> Self {
        if let Some(api_url) = api_url {
            self.remote.base_url = api_url;
        }
        self
    }

    /// Check cross-field constraints, reporting every problem at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        match reqwest::Url::parse(&self.remote.base_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => errors.push(format!(
                "remote.base_url: unsupported scheme '{}'",
                url.scheme()
            )),
            Err(e) => errors.push(format!(
                "remote.base_url: '{}' is not a valid URL: {}",
                self.remote.base_url, e
            )),
        }

        if self.display.appliances.is_empty() {
            errors.push("display.appliances: at least one appliance is required".to_string());
        }
        let mut seen = BTreeSet::new();
        for appliance in &self.display.appliances {
            if !seen.insert(appliance) {
                errors.push(format!("display.appliances: '{}' is listed twice", appliance));
            }
        }

        let intervals = [
            ("remote.request_timeout_ms", Some(self.remote.request_timeout_ms)),
            ("display.poll_interval_ms", Some(self.display.poll_interval_ms)),
            ("display.settle_delay_ms", Some(self.display.settle_delay_ms)),
            (
                "display.names_refresh_interval_ms",
                self.display.names_refresh_interval_ms,
            ),
        ];
        for (field, value) in intervals {
            if value == Some(0) {
                errors.push(format!("{}: must be greater than zero", field));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.remote.request_timeout_ms)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            appliances: self.display.appliances.clone(),
            poll_interval: Duration::from_millis(self.display.poll_interval_ms),
            settle_delay: Duration::from_millis(self.display.settle_delay_ms),
            names_refresh_interval: self
                .display
                .names_refresh_interval_ms
                .map(Duration::from_millis),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        config.validate().unwrap();

        assert_eq!(config.remote.base_url, "http://localhost:8001");
        assert_eq!(config.request_timeout(), Duration::from_millis(4000));
        assert_eq!(config.api.listen, "127.0.0.1");
        assert_eq!(config.api.port, 8600);
        assert_eq!(config.logging.level, LogLevel::Info);
        assert_eq!(config.engine_settings(), EngineSettings::default());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
            [remote]
            base_url = "http://laundry.local:8001"
            request_timeout_ms = 2500

            [display]
            appliances = ["dryer"]
            poll_interval_ms = 10000
            settle_delay_ms = 500
            names_refresh_interval_ms = 60000

            [api]
            listen = "0.0.0.0"
            port = 9000

            [logging]
            level = "debug"

            [logging.overrides]
            "washboard::remote" = "trace"
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        config.validate().unwrap();

        assert_eq!(config.remote.base_url, "http://laundry.local:8001");
        assert_eq!(config.request_timeout(), Duration::from_millis(2500));
        assert_eq!(config.api.listen, "0.0.0.0");
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(
            config.logging.overrides.get("washboard::remote"),
            Some(&LogLevel::Trace)
        );
        assert_eq!(
            config.engine_settings(),
            EngineSettings {
                appliances: vec![Appliance::Dryer],
                poll_interval: Duration::from_secs(10),
                settle_delay: Duration::from_millis(500),
                names_refresh_interval: Some(Duration::from_secs(60)),
            }
        );
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml = r#"
            [display]
            poll_interval_ms = 2000
        "#;

        let config: Config = toml::from_str(toml).unwrap();
        let settings = config.engine_settings();
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert_eq!(settings.settle_delay, Duration::from_millis(300));
        assert_eq!(settings.appliances, vec![Appliance::Washer, Appliance::Dryer]);
    }

    #[test]
    fn test_api_url_override_wins() {
        let toml = r#"
            [remote]
            base_url = "http://from-file:8001"
        "#;
        let config: Config = toml::from_str(toml).unwrap();

        let config = config.with_api_url(Some("http://from-cli:9001".to_string()));
        assert_eq!(config.remote.base_url, "http://from-cli:9001");

        let config = config.with_api_url(None);
        assert_eq!(config.remote.base_url, "http://from-cli:9001");
    }

    #[test]
    fn test_unknown_appliance_rejected() {
        let toml = r#"
            [display]
            appliances = ["washer", "oven"]
        "#;
        let err = toml::from_str::<Config>(toml).unwrap_err();
        assert!(err.to_string().contains("oven"), "{}", err);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;
        assert!(toml::from_str::<Config>(toml).is_err());
    }

    #[test]
    fn test_validation_reports_every_problem() {
        let toml = r#"
            [remote]
            base_url = "not a url"

            [display]
            appliances = ["washer", "washer"]
            poll_interval_ms = 0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();

        insta::assert_snapshot!(err.to_string(), @"Invalid configuration: remote.base_url: 'not a url' is not a valid URL: relative URL without a base; display.appliances: 'washer' is listed twice; display.poll_interval_ms: must be greater than zero");
    }

    #[test]
    fn test_empty_appliance_list_rejected() {
        let toml = r#"
            [display]
            appliances = []
            names_refresh_interval_ms = 0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        let err = config.validate().unwrap_err();

        insta::assert_snapshot!(err.to_string(), @"Invalid configuration: display.appliances: at least one appliance is required; display.names_refresh_interval_ms: must be greater than zero");
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let config = Config::default().with_api_url(Some("ftp://laundry.local".to_string()));
        let err = config.validate().unwrap_err();

        insta::assert_snapshot!(err.to_string(), @"Invalid configuration: remote.base_url: unsupported scheme 'ftp'");
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[api]\nport = 8700").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.api.port, 8700);

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.api.port, 8700);
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.toml");

        let err = Config::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Io(ref p, _) if *p == path));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[display\npoll_interval_ms = 1").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LevelFilter::from(LogLevel::Trace), LevelFilter::TRACE);
        assert_eq!(LevelFilter::from(LogLevel::Warn), LevelFilter::WARN);
        assert!(LogLevel::Debug < LogLevel::Error);
    }
}
