//! The LOOKUP join hint and the async lookup options derived from it.

use crate::config::AsyncLookupSettings;
use floe_common::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// Output ordering of an async lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    #[default]
    Ordered,
    AllowUnordered,
}

impl OutputMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ordered" => Ok(OutputMode::Ordered),
            "allow_unordered" => Ok(OutputMode::AllowUnordered),
            _ => Err(Error::InvalidHint(format!(
                "invalid output-mode: '{s}' (expected 'ordered' or 'allow_unordered')"
            ))),
        }
    }
}

impl fmt::Display for OutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMode::Ordered => write!(f, "ORDERED"),
            OutputMode::AllowUnordered => write!(f, "ALLOW_UNORDERED"),
        }
    }
}

/// Retry policy for lookups that find no match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "strategy", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum RetryStrategy {
    FixedDelay { delay_ms: u64, max_attempts: u32 },
}

impl fmt::Display for RetryStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryStrategy::FixedDelay { delay_ms, max_attempts } => {
                write!(f, "LOOKUP_MISS, FIXED_DELAY, {delay_ms}ms, {max_attempts}")
            }
        }
    }
}

/// Options of a `LOOKUP(...)` join hint. Unset options fall back to settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupJoinHint {
    pub table: Option<String>,
    pub async_: Option<bool>,
    pub output_mode: Option<OutputMode>,
    pub capacity: Option<usize>,
    pub timeout_ms: Option<u64>,
    pub retry: Option<RetryStrategy>,
}

const KNOWN_OPTIONS: &[&str] = &[
    "table",
    "async",
    "output-mode",
    "capacity",
    "timeout",
    "retry-predicate",
    "retry-strategy",
    "fixed-delay",
    "max-attempts",
];

const RETRY_OPTIONS: &[&str] = &["retry-predicate", "retry-strategy", "fixed-delay", "max-attempts"];

impl LookupJoinHint {
    /// Validates and extracts typed options from the raw hint key/value map.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidHint` for unknown keys, malformed values, or a
    /// partial retry configuration.
    pub fn from_options<S: std::hash::BuildHasher>(options: &HashMap<String, String, S>) -> Result<Self> {
        if let Some(unknown) = options.keys().find(|k| !KNOWN_OPTIONS.contains(&k.as_str())) {
            return Err(Error::InvalidHint(format!("unknown lookup hint option: '{unknown}'")));
        }

        let async_ = options
            .get("async")
            .map(|s| match s.trim().to_ascii_lowercase().as_str() {
                "true" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::InvalidHint(format!("invalid async: '{s}'"))),
            })
            .transpose()?;

        let output_mode = options.get("output-mode").map(|s| OutputMode::parse(s)).transpose()?;

        let capacity = options
            .get("capacity")
            .map(|s| match s.trim().parse::<usize>() {
                Ok(n) if n > 0 => Ok(n),
                _ => Err(Error::InvalidHint(format!("invalid capacity: '{s}'"))),
            })
            .transpose()?;

        let timeout_ms = options.get("timeout").map(|s| parse_duration_ms(s)).transpose()?;

        Ok(Self {
            table: options.get("table").cloned(),
            async_,
            output_mode,
            capacity,
            timeout_ms,
            retry: parse_retry(options)?,
        })
    }
}

fn parse_retry<S: std::hash::BuildHasher>(options: &HashMap<String, String, S>) -> Result<Option<RetryStrategy>> {
    let present = RETRY_OPTIONS.iter().filter(|k| options.contains_key(**k)).count();
    if present == 0 {
        return Ok(None);
    }
    if present != RETRY_OPTIONS.len() {
        return Err(Error::InvalidHint(format!(
            "retry options must be given together: {}",
            RETRY_OPTIONS.join(", ")
        )));
    }

    let predicate = &options["retry-predicate"];
    if !predicate.trim().eq_ignore_ascii_case("lookup_miss") {
        return Err(Error::InvalidHint(format!("unsupported retry-predicate: '{predicate}'")));
    }
    let strategy = &options["retry-strategy"];
    if !strategy.trim().eq_ignore_ascii_case("fixed_delay") {
        return Err(Error::InvalidHint(format!("unsupported retry-strategy: '{strategy}'")));
    }

    let delay_ms = parse_duration_ms(&options["fixed-delay"])?;
    let attempts = &options["max-attempts"];
    let max_attempts = match attempts.trim().parse::<u32>() {
        Ok(n) if n > 0 => n,
        _ => return Err(Error::InvalidHint(format!("invalid max-attempts: '{attempts}'"))),
    };
    Ok(Some(RetryStrategy::FixedDelay { delay_ms, max_attempts }))
}

/// Parses `500ms`, `10s`, `3min` or `1h` into milliseconds. A bare number is
/// taken as milliseconds.
pub fn parse_duration_ms(s: &str) -> Result<u64> {
    let s = s.trim().to_ascii_lowercase();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    let invalid = || Error::InvalidHint(format!("invalid duration: '{s}'"));

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let factor = match unit.trim() {
        "" | "ms" => 1,
        "s" => 1_000,
        "min" => 60_000,
        "h" => 3_600_000,
        _ => return Err(invalid()),
    };
    value.checked_mul(factor).ok_or_else(invalid)
}

/// Async lookup settings of one join, resolved from its hint, the planner
/// settings and the table's lookup capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncLookupOptions {
    pub enabled: bool,
    pub capacity: usize,
    pub timeout_ms: u64,
    pub ordering: OutputMode,
}

impl AsyncLookupOptions {
    /// Async is used when it is requested and supported, or when the table can
    /// only be looked up asynchronously. Updates on the input force ordered output.
    pub fn resolve(
        hint: Option<&LookupJoinHint>,
        settings: &AsyncLookupSettings,
        supports_sync: bool,
        supports_async: bool,
        input_insert_only: bool,
    ) -> Self {
        let requested = hint.and_then(|h| h.async_).unwrap_or(settings.prefer_async);
        let enabled = match (supports_sync, supports_async) {
            (_, false) => {
                if requested {
                    warn!("async lookup requested but the table only supports sync lookup");
                }
                false
            }
            (false, true) => true,
            (true, true) => requested,
        };

        let mut ordering = hint.and_then(|h| h.output_mode).unwrap_or(settings.output_mode);
        if !input_insert_only {
            ordering = OutputMode::Ordered;
        }

        Self {
            enabled,
            capacity: hint.and_then(|h| h.capacity).unwrap_or(settings.buffer_capacity),
            timeout_ms: hint.and_then(|h| h.timeout_ms).unwrap_or(settings.timeout_ms),
            ordering,
        }
    }
}

impl fmt::Display for AsyncLookupOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled {
            write!(f, "{}, {}, {}ms", self.ordering, self.capacity, self.timeout_ms)
        } else {
            write!(f, "false")
        }
    }
}
