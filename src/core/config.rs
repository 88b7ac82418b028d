//! # Configuration
//!
//! Centralizes all settings with a clear override hierarchy:
//! defaults → config file → env vars → CLI flags.
//!
//! Config lives at `~/.echoline/config.toml`. If missing on first run, a
//! commented-out default is generated so users can discover all options.
//! The marker set is not configurable; only sizing, timing and logging are.

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::frame::{DEFAULT_FRAME_CAPACITY, OverflowPolicy};

// ============================================================================
// Config Structs (all fields Option<T> for sparse TOML)
// ============================================================================

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct EcholineConfig {
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct PipelineConfig {
    pub frame_capacity: Option<usize>,
    pub echo_capacity: Option<usize>,
    pub line_capacity: Option<usize>,
    pub poll_interval_ms: Option<u64>,
    pub input_wait_ms: Option<u64>,
    pub send_retries: Option<u32>,
    pub overflow: Option<OverflowPolicy>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoggingConfig {
    pub file: Option<String>,
    pub level: Option<String>,
}

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_ECHO_CAPACITY: usize = 256;
pub const DEFAULT_LINE_CAPACITY: usize = 16;
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1;
pub const DEFAULT_INPUT_WAIT_MS: u64 = 100;
pub const DEFAULT_SEND_RETRIES: u32 = 8;
pub const DEFAULT_LOG_FILE: &str = "echoline.log";
pub const DEFAULT_LOG_LEVEL: &str = "debug";

// ============================================================================
// Resolved Config (concrete values, no Options)
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub frame_capacity: usize,
    pub echo_capacity: usize,
    pub line_capacity: usize,
    pub poll_interval: Duration,
    pub input_wait: Duration,
    pub send_retries: u32,
    pub overflow: OverflowPolicy,
    pub log_file: PathBuf,
    pub log_level: log::LevelFilter,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            frame_capacity: DEFAULT_FRAME_CAPACITY,
            echo_capacity: DEFAULT_ECHO_CAPACITY,
            line_capacity: DEFAULT_LINE_CAPACITY,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            input_wait: Duration::from_millis(DEFAULT_INPUT_WAIT_MS),
            send_retries: DEFAULT_SEND_RETRIES,
            overflow: OverflowPolicy::default(),
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            log_level: log::LevelFilter::Debug,
        }
    }
}

/// Values supplied on the command line (None = not specified).
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub frame_capacity: Option<usize>,
    pub overflow: Option<OverflowPolicy>,
    pub log_file: Option<PathBuf>,
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "config I/O error: {e}"),
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io(e) => Some(e),
            ConfigError::Parse(e) => Some(e),
            ConfigError::Invalid(_) => None,
        }
    }
}

// ============================================================================
// Loading
// ============================================================================

/// Returns the path to `~/.echoline/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".echoline").join("config.toml"))
}

/// Load config from `path`, or from `~/.echoline/config.toml` when `None`.
///
/// A missing default file is generated and `EcholineConfig::default()` is
/// returned. A missing explicit path is an error. A malformed file returns
/// `ConfigError::Parse`.
pub fn load_config(path: Option<&Path>) -> Result<EcholineConfig, ConfigError> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Some(p) => {
                if !p.exists() {
                    info!("No config file found, generating default at {}", p.display());
                    generate_default_config(&p);
                    return Ok(EcholineConfig::default());
                }
                p
            }
            None => {
                warn!("Could not determine home directory, using default config");
                return Ok(EcholineConfig::default());
            }
        },
    };

    let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
    let config = parse_config(&contents)?;
    info!("Loaded config from {}", path.display());
    debug!("Config: {:?}", config);
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<EcholineConfig, ConfigError> {
    toml::from_str(contents).map_err(ConfigError::Parse)
}

/// Generates a commented-out default config file at the given path.
fn generate_default_config(path: &Path) {
    let default_content = r#"# echoline configuration
# All settings are optional; defaults are used for anything not specified.
# Override hierarchy: defaults → this file → env vars → CLI flags.

# [pipeline]
# frame_capacity = 64        # bytes per line frame (ECHOLINE_FRAME_CAPACITY)
# echo_capacity = 256        # raw-echo channel slots
# line_capacity = 16         # line / translated-line channel slots
# poll_interval_ms = 1       # idle sleep between channel polls
# input_wait_ms = 100        # how long capture waits for a key before rechecking stop requests
# send_retries = 8           # attempts before a full channel drops a unit or line
# overflow = "truncate"      # "truncate" or "reject" (ECHOLINE_OVERFLOW)

# [logging]
# file = "echoline.log"      # ECHOLINE_LOG_FILE
# level = "debug"            # "off", "error", "warn", "info", "debug", "trace"
"#;

    if let Some(parent) = path.parent() {
        if let Err(e) = fs::create_dir_all(parent) {
            warn!("Failed to create config directory: {}", e);
            return;
        }
    }
    if let Err(e) = fs::write(path, default_content) {
        warn!("Failed to write default config: {}", e);
    }
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve the final config by collapsing: defaults → config file → env vars → CLI.
pub fn resolve(config: &EcholineConfig, cli: &CliOverrides) -> Result<ResolvedConfig, ConfigError> {
    resolve_with_env(config, cli, |key| std::env::var(key).ok())
}

/// Same as [`resolve`], with the environment lookup supplied by the caller.
pub fn resolve_with_env<F>(
    config: &EcholineConfig,
    cli: &CliOverrides,
    env: F,
) -> Result<ResolvedConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let pipeline = &config.pipeline;

    // Frame capacity: CLI → env → config → default
    let frame_capacity = match cli.frame_capacity {
        Some(n) => n,
        None => match env("ECHOLINE_FRAME_CAPACITY") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ConfigError::Invalid(format!("ECHOLINE_FRAME_CAPACITY is not a number: {raw}"))
            })?,
            None => pipeline.frame_capacity.unwrap_or(DEFAULT_FRAME_CAPACITY),
        },
    };

    // Overflow policy: CLI → env → config → default
    let overflow = match cli.overflow {
        Some(policy) => policy,
        None => match env("ECHOLINE_OVERFLOW") {
            Some(raw) => raw.parse().map_err(ConfigError::Invalid)?,
            None => pipeline.overflow.unwrap_or_default(),
        },
    };

    // Log file: CLI → env → config → default
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| env("ECHOLINE_LOG_FILE").map(PathBuf::from))
        .or_else(|| config.logging.file.as_ref().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE));

    let level = config
        .logging
        .level
        .as_deref()
        .unwrap_or(DEFAULT_LOG_LEVEL);
    let log_level = level
        .parse::<log::LevelFilter>()
        .map_err(|_| ConfigError::Invalid(format!("unknown log level '{level}'")))?;

    let resolved = ResolvedConfig {
        frame_capacity,
        echo_capacity: pipeline.echo_capacity.unwrap_or(DEFAULT_ECHO_CAPACITY),
        line_capacity: pipeline.line_capacity.unwrap_or(DEFAULT_LINE_CAPACITY),
        poll_interval: Duration::from_millis(
            pipeline.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
        ),
        input_wait: Duration::from_millis(pipeline.input_wait_ms.unwrap_or(DEFAULT_INPUT_WAIT_MS)),
        send_retries: pipeline.send_retries.unwrap_or(DEFAULT_SEND_RETRIES),
        overflow,
        log_file,
        log_level,
    };
    resolved.validate()?;
    Ok(resolved)
}

impl ResolvedConfig {
    /// Rejects sizes the pipeline cannot be built with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_capacity == 0 {
            return Err(ConfigError::Invalid("frame_capacity must be at least 1".into()));
        }
        if self.echo_capacity == 0 {
            return Err(ConfigError::Invalid("echo_capacity must be at least 1".into()));
        }
        if self.line_capacity == 0 {
            return Err(ConfigError::Invalid("line_capacity must be at least 1".into()));
        }
        Ok(())
    }
}
