#![forbid(unsafe_code)]

use anyhow::{Context, Result, anyhow};
use std::{
    collections::HashMap,
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::api::MAX_PAGE_SIZE;
use crate::transport::{DEFAULT_RETRY_DELAY, RetryPolicy};

pub const DEFAULT_ENV_PATH: &str = ".env";
pub const DEFAULT_OUTPUT_NAME: &str = "ytb_channel_data";
pub const DEFAULT_PAGE_SIZE: u32 = MAX_PAGE_SIZE;

pub const API_KEY_VAR: &str = "YOUTUBE_API_KEY";
pub const RETRY_DELAY_VAR: &str = "FETCH_RETRY_DELAY_SECS";
pub const MAX_RETRIES_VAR: &str = "FETCH_MAX_RETRIES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchSettings {
    pub api_key: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub api_key: Option<String>,
    pub retry_delay_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub env_path: Option<PathBuf>,
}

pub fn resolve_settings(overrides: SettingsOverrides) -> Result<FetchSettings> {
    let env_path = overrides
        .env_path
        .as_deref()
        .unwrap_or_else(|| Path::new(DEFAULT_ENV_PATH));
    let file_vars = read_env_file(env_path)?;
    build_settings(&file_vars, env_var_string, overrides)
}

fn build_settings(
    file_vars: &HashMap<String, String>,
    env_lookup: impl Fn(&str) -> Option<String>,
    overrides: SettingsOverrides,
) -> Result<FetchSettings> {
    let api_key = overrides
        .api_key
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .or_else(|| lookup_value(API_KEY_VAR, file_vars, &env_lookup))
        .ok_or_else(|| anyhow!("no API key given; pass --key or set {API_KEY_VAR}"))?;
    let delay = overrides
        .retry_delay_secs
        .or_else(|| {
            lookup_value(RETRY_DELAY_VAR, file_vars, &env_lookup)
                .and_then(|value| value.parse::<u64>().ok())
        })
        .map(Duration::from_secs)
        .unwrap_or(DEFAULT_RETRY_DELAY);
    let max_retries = overrides.max_retries.or_else(|| {
        lookup_value(MAX_RETRIES_VAR, file_vars, &env_lookup)
            .and_then(|value| value.parse::<u32>().ok())
    });
    let retry = match max_retries {
        Some(attempts) => RetryPolicy::bounded(delay, attempts),
        None => RetryPolicy::unbounded(delay),
    };
    Ok(FetchSettings { api_key, retry })
}

/// Maps any requested page size outside `1..=50` to the default.
///
/// Returns the effective size and whether a replacement happened so the
/// caller can warn about it.
pub fn clamp_page_size(requested: i64) -> (u32, bool) {
    match u32::try_from(requested) {
        Ok(size) if (1..=MAX_PAGE_SIZE).contains(&size) => (size, false),
        _ => (DEFAULT_PAGE_SIZE, true),
    }
}

fn env_var_string(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

fn lookup_value(
    key: &str,
    file_vars: &HashMap<String, String>,
    env_lookup: &impl Fn(&str) -> Option<String>,
) -> Option<String> {
    env_lookup(key).or_else(|| {
        file_vars
            .get(key)
            .filter(|value| !value.trim().is_empty())
            .cloned()
    })
}

pub fn read_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let mut vars = HashMap::new();
    if !path.exists() {
        return Ok(vars);
    }
    let content =
        fs::read_to_string(path).with_context(|| format!("Reading {}", path.display()))?;
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        let Some((key, value_raw)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        let value = value_raw.trim();
        let value = value
            .strip_prefix('"')
            .and_then(|value| value.strip_suffix('"'))
            .or_else(|| {
                value
                    .strip_prefix('\'')
                    .and_then(|value| value.strip_suffix('\''))
            })
            .unwrap_or(value);
        vars.insert(key.to_string(), value.to_string());
    }
    Ok(vars)
}
