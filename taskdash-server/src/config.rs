//! Settings for `taskdash-server`.
//!
//! A flag wins over its environment variable, which wins over
//! `[server]` in `~/.config/taskdash-server/config.toml`, which wins over
//! the built-in defaults. The log level only comes from the command line
//! or `TASKDASH_SERVER_LOG`.

use std::path::{Path, PathBuf};

/// Why the server settings could not be loaded.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file exists (or was named) but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        /// File that was read.
        path: PathBuf,
        /// I/O failure.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for this layout.
    #[error("failed to parse config file: {0}")]
    ParseToml(#[from] toml::de::Error),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerConfigFile {
    server: ServerFileConfig,
}

/// `[server]`; every key may be left out.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct ServerFileConfig {
    bind_addr: Option<String>,
    data_dir: Option<PathBuf>,
}

/// Command line of `taskdash-server`.
#[derive(clap::Parser, Debug, Default)]
#[command(version, about = "Taskdash REST API server")]
pub struct ServerCliArgs {
    /// Listen address, e.g. `127.0.0.1:3000`.
    #[arg(short, long, env = "TASKDASH_ADDR")]
    pub bind: Option<String>,

    /// Config file to use instead of `~/.config/taskdash-server/config.toml`.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for `tasks.json` / `users.json`; omit to keep records in memory.
    #[arg(long, env = "TASKDASH_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Tracing filter for server logs.
    #[arg(long, default_value = "info", env = "TASKDASH_SERVER_LOG")]
    pub log_level: String,
}

/// Settings the server runs with.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind_addr: String,
    /// Where records are persisted; `None` keeps them in memory only.
    pub data_dir: Option<PathBuf>,
    /// Tracing filter.
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:3000".to_string(),
            data_dir: None,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Reads the config file and layers `cli` over it.
    ///
    /// The default config file may be absent; a file named with `--config`
    /// must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file cannot be read or parsed.
    pub fn load(cli: &ServerCliArgs) -> Result<Self, ConfigError> {
        let file = load_config_file(cli.config.as_deref())?;
        Ok(Self::resolve(cli, &file))
    }

    fn resolve(cli: &ServerCliArgs, file: &ServerConfigFile) -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: cli
                .bind
                .clone()
                .or_else(|| file.server.bind_addr.clone())
                .unwrap_or(defaults.bind_addr),
            data_dir: cli
                .data_dir
                .clone()
                .or_else(|| file.server.data_dir.clone()),
            log_level: cli.log_level.clone(),
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("taskdash-server").join("config.toml"))
}

fn load_config_file(explicit_path: Option<&Path>) -> Result<ServerConfigFile, ConfigError> {
    let read = |path: &Path| {
        std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source,
        })
    };

    if let Some(path) = explicit_path {
        return Ok(toml::from_str(&read(path)?)?);
    }
    let Some(path) = default_config_path() else {
        return Ok(ServerConfigFile::default());
    };
    if !path.exists() {
        return Ok(ServerConfigFile::default());
    }
    Ok(toml::from_str(&read(&path)?)?)
}
