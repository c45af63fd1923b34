use crate::hint::OutputMode;
use floe_common::Result;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub async_lookup: AsyncLookupSettings,
}

/// Defaults for async lookups when a join carries no hint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AsyncLookupSettings {
    #[serde(default = "default_buffer_capacity")]
    pub buffer_capacity: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default)]
    pub output_mode: OutputMode,
    #[serde(default)]
    pub prefer_async: bool,
}

fn default_buffer_capacity() -> usize {
    100
}

fn default_timeout_ms() -> u64 {
    180_000
}

impl Default for AsyncLookupSettings {
    fn default() -> Self {
        Self {
            buffer_capacity: default_buffer_capacity(),
            timeout_ms: default_timeout_ms(),
            output_mode: OutputMode::default(),
            prefer_async: false,
        }
    }
}

impl Settings {
    /// Loads settings from the file named by `FLOE_PLANNER_CONFIG_PATH`, if
    /// set, then from `FLOE_PLANNER__*` environment variables.
    pub fn new() -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Ok(path) = std::env::var("FLOE_PLANNER_CONFIG_PATH") {
            builder = builder.add_source(config::File::with_name(&path).required(true));
        }
        let s = builder.add_source(environment()).build()?;
        Ok(s.try_deserialize()?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let s = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).required(true))
            .add_source(environment())
            .build()?;
        Ok(s.try_deserialize()?)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix("FLOE_PLANNER")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}
