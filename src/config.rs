//! Configuration manager for prometheus-demo.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::FromRef;
use serde::Deserialize;

use crate::AppState;
use crate::database::StoreKind;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_PORT: u16 = 8080;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Configuration {
    /// TCP port, bound on every interface.
    pub port: u16,
    /// Hostname:port of the Redis instance. Overridden by `REDIS_ADDR`.
    pub redis_addr: String,
    /// Where counters are kept.
    pub store: StoreKind,
    /// Seconds before a request is answered with `408`. No limit if unset.
    pub request_timeout: Option<u64>,
    /// Export process memory and CPU gauges.
    pub process_metrics: bool,
    #[serde(skip)]
    path: PathBuf,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            redis_addr: String::default(),
            store: StoreKind::default(),
            request_timeout: None,
            process_metrics: true,
            path: PathBuf::default(),
        }
    }
}

impl FromRef<AppState> for Arc<Configuration> {
    fn from_ref(state: &AppState) -> Arc<Configuration> {
        Arc::clone(&state.config)
    }
}

impl Configuration {
    /// File to read instead of `config.yaml`, used when it exists.
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location. The file is optional.
    pub fn read(self) -> Self {
        let file_path = if self.path.is_file() {
            self.path
        } else {
            PathBuf::from(DEFAULT_CONFIG_PATH)
        };

        match File::open(&file_path) {
            Ok(file) => match serde_yaml::from_reader(file) {
                Ok(config) => config,
                Err(err) => {
                    tracing::error!(error = %err, path = %file_path.display(), "invalid configuration file, using defaults");
                    Self::default()
                },
            },
            Err(err) => {
                tracing::warn!(error = %err, path = %file_path.display(), "no configuration file, using defaults");
                Self::default()
            },
        }
    }

    /// Apply `REDIS_ADDR` and `PORT` values on top of the file.
    pub fn with_env(mut self, redis_addr: Option<String>, port: Option<String>) -> Self {
        if let Some(addr) = redis_addr {
            self.redis_addr = addr;
        }

        if let Some(port) = port {
            match port.parse() {
                Ok(port) => self.port = port,
                Err(err) => {
                    tracing::warn!(%port, error = %err, "ignoring invalid `PORT` variable")
                },
            }
        }

        self
    }
}
