#![forbid(unsafe_code)]

//! Receiver configuration. Parses a TOML file into a strongly-typed structure; every field has a
//! default so a missing file or an empty table yields a runnable configuration. Command-line flags
//! override whatever was loaded.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::Error;

/// Configuration for the receiver daemon.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// First UDP listen port; flowlets occupy consecutive ports from here.
    pub listen_port: u16,

    /// Number of flowlet ports to listen on.
    pub flowlets: u16,

    /// Reorder window length in slots.
    pub window: usize,

    /// Directory receiving the record tables.
    pub output_dir: PathBuf,

    /// Seconds between drops samples.
    pub drops_period_secs: u64,

    /// Seconds between flow samples.
    pub flows_period_secs: u64,

    /// Offset of the first flow sample relative to the first drops sample.
    pub flows_offset_secs: u64,

    /// Logging verbosity (`error`, `warn`, `info`, `debug`, `trace`).
    pub log_level: Option<String>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            flowlets: 1,
            window: default_window(),
            output_dir: default_output_dir(),
            drops_period_secs: 10,
            flows_period_secs: 10,
            flows_offset_secs: 5,
            log_level: Some("info".to_string()),
        }
    }
}

fn default_listen_port() -> u16 {
    5678
}

fn default_window() -> usize {
    1024
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("/tmp/flowprobe")
}

impl ReceiverConfig {
    /// Load a configuration file from the given path.
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let data = fs::read_to_string(&path).map_err(Error::from)?;
        let cfg = toml::from_str::<ReceiverConfig>(&data).map_err(Error::ConfigParse)?;
        Ok(cfg)
    }
}
