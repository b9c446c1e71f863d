//! Configuration system for the `Taskdash` client.
//!
//! Supports layered configuration with the following priority (highest first):
//! 1. CLI arguments
//! 2. Environment variables (via clap `env` attribute)
//! 3. TOML config file (`~/.config/taskdash/config.toml`)
//! 4. Compiled defaults
//!
//! Missing config file is not an error (defaults are used). An explicit
//! `--config` path that doesn't exist is an error.

use std::path::PathBuf;
use std::time::Duration;

use taskdash_proto::StatusFilter;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Failed to parse the TOML configuration.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// TOML file structs (all fields Option for partial overrides)
// ---------------------------------------------------------------------------

/// Top-level TOML config file structure.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ConfigFile {
    api: ApiFileConfig,
    snapshot: SnapshotFileConfig,
}

/// `[api]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ApiFileConfig {
    base_url: Option<String>,
    request_timeout_secs: Option<u64>,
}

/// `[snapshot]` section of the config file.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct SnapshotFileConfig {
    dir: Option<PathBuf>,
    enabled: Option<bool>,
}

// ---------------------------------------------------------------------------
// Resolved configuration
// ---------------------------------------------------------------------------

/// Fully resolved client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root URL of the task API.
    pub base_url: String,
    /// Per-request timeout; `None` waits indefinitely.
    pub request_timeout: Option<Duration>,
    /// Directory holding the local snapshot files.
    pub snapshot_dir: PathBuf,
    /// Whether the local snapshot is read and written at all.
    pub snapshot_enabled: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            request_timeout: None,
            snapshot_dir: default_snapshot_dir(),
            snapshot_enabled: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration by merging CLI args, env vars, and a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the explicit config file cannot be read,
    /// or if any config file that exists cannot be parsed.
    pub fn load(cli: &CliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    /// Resolve a `ClientConfig` from CLI args and a parsed config file.
    ///
    /// Priority: CLI > file > default.
    #[must_use]
    fn resolve(cli: &CliArgs, file: &ConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            base_url: cli
                .api_url
                .clone()
                .or_else(|| file.api.base_url.clone())
                .unwrap_or(defaults.base_url),
            request_timeout: cli
                .timeout_secs
                .or(file.api.request_timeout_secs)
                .map(Duration::from_secs),
            snapshot_dir: cli
                .snapshot_dir
                .clone()
                .or_else(|| file.snapshot.dir.clone())
                .unwrap_or(defaults.snapshot_dir),
            snapshot_enabled: !cli.no_snapshot
                && file.snapshot.enabled.unwrap_or(defaults.snapshot_enabled),
        }
    }
}

/// CLI arguments parsed by clap.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Task management dashboard client")]
pub struct CliArgs {
    /// Base URL of the task API.
    #[arg(long, env = "TASKDASH_API_URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds.
    #[arg(long, env = "TASKDASH_TIMEOUT_SECS")]
    pub timeout_secs: Option<u64>,

    /// Directory for the local snapshot cache.
    #[arg(long, env = "TASKDASH_SNAPSHOT_DIR")]
    pub snapshot_dir: Option<PathBuf>,

    /// Neither read nor write the local snapshot cache.
    #[arg(long)]
    pub no_snapshot: bool,

    /// Path to config file (default: `~/.config/taskdash/config.toml`).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "TASKDASH_LOG")]
    pub log_level: String,

    /// Path to log file (default: `$TMPDIR/taskdash.log`).
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// What to do (default: `list`).
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Dashboard commands.
#[derive(clap::Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// List tasks through the current filters; any flag replaces the saved filters.
    List {
        /// Completion status: all, completed, or pending.
        #[arg(long)]
        status: Option<StatusFilter>,
        /// Case-insensitive title substring.
        #[arg(long)]
        search: Option<String>,
        /// Only tasks owned by these user ids (repeatable).
        #[arg(long = "user")]
        users: Vec<i64>,
    },
    /// Show one task.
    Show {
        /// Task id.
        id: i64,
    },
    /// Create a task.
    Add {
        /// Task title.
        #[arg(long)]
        title: String,
        /// Owning user id.
        #[arg(long)]
        user: i64,
        /// Create it already completed.
        #[arg(long)]
        completed: bool,
    },
    /// Mark a task completed.
    Done {
        /// Task id.
        id: i64,
    },
    /// Mark a task pending again.
    Undo {
        /// Task id.
        id: i64,
    },
    /// Change a task's title.
    Rename {
        /// Task id.
        id: i64,
        /// New title.
        title: String,
    },
    /// Delete a task.
    Delete {
        /// Task id.
        id: i64,
    },
    /// Show task and user totals.
    Stats,
    /// List users.
    Users,
    /// Show the saved filters.
    Filters {
        /// Reset the saved filters.
        #[arg(long)]
        clear: bool,
    },
}

impl Default for Command {
    fn default() -> Self {
        Self::List {
            status: None,
            search: None,
            users: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn default_snapshot_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("taskdash")
}

/// Load and parse a TOML config file.
///
/// If `explicit_path` is `Some`, the file must exist (error if not).
/// If `explicit_path` is `None`, the default path is tried and missing file
/// is treated as empty config.
fn load_config_file(explicit_path: Option<&std::path::Path>) -> Result<ConfigFile, ConfigError> {
    let path = if let Some(p) = explicit_path {
        let contents = std::fs::read_to_string(p).map_err(|e| ConfigError::ReadFile {
            path: p.to_path_buf(),
            source: e,
        })?;
        return Ok(toml::from_str(&contents)?);
    } else {
        let Some(config_dir) = dirs::config_dir() else {
            return Ok(ConfigFile::default());
        };
        config_dir.join("taskdash").join("config.toml")
    };

    match std::fs::read_to_string(&path) {
        Ok(contents) => Ok(toml::from_str(&contents)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(ConfigFile::default()),
        Err(e) => Err(ConfigError::ReadFile { path, source: e }),
    }
}
