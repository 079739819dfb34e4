use crate::error::{Error, Result};
use std::env;
use std::fmt;

pub const DEFAULT_API_URL: &str = "https://app.daytona.io/api";

pub const API_KEY_ENV: &str = "DAYTONA_API_KEY";
pub const API_URL_ENV: &str = "DAYTONA_API_URL";
/// Older name for [`API_URL_ENV`], still honored.
pub const SERVER_URL_ENV: &str = "DAYTONA_SERVER_URL";
pub const TARGET_ENV: &str = "DAYTONA_TARGET";
pub const ORGANIZATION_ID_ENV: &str = "DAYTONA_ORGANIZATION_ID";

#[derive(Clone)]
pub struct Config {
    pub api_key: String,
    pub api_url: String,
    pub target: Option<String>,
    pub organization_id: Option<String>,
    /// Per-request timeout. `0` leaves requests unbounded, which build log
    /// streams rely on.
    pub timeout_seconds: u64,
}

impl Config {
    /// Resolves everything from the process environment.
    pub fn new() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same resolution as [`Config::new`], reading variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = non_empty(lookup(API_KEY_ENV)).ok_or(Error::ApiKeyNotFound)?;
        Ok(Self::resolve(api_key, &lookup))
    }

    /// Uses the given key. An empty key falls back to `DAYTONA_API_KEY`; if
    /// that is unset too the key stays empty and [`crate::Client::with_config`]
    /// rejects it.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        let lookup = |key: &str| env::var(key).ok();
        let mut api_key = api_key.into();
        if api_key.is_empty() {
            api_key = non_empty(lookup(API_KEY_ENV)).unwrap_or_default();
        }
        Self::resolve(api_key, &lookup)
    }

    fn resolve<F>(api_key: String, lookup: &F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = non_empty(lookup(API_URL_ENV))
            .or_else(|| {
                let legacy = non_empty(lookup(SERVER_URL_ENV));
                if legacy.is_some() {
                    tracing::warn!(
                        "{} is deprecated, use {} instead",
                        SERVER_URL_ENV,
                        API_URL_ENV
                    );
                }
                legacy
            })
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        Self {
            api_key,
            api_url,
            target: non_empty(lookup(TARGET_ENV)),
            organization_id: non_empty(lookup(ORGANIZATION_ID_ENV)),
            timeout_seconds: 0,
        }
    }

    pub fn api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn organization_id(mut self, id: impl Into<String>) -> Self {
        self.organization_id = Some(id.into());
        self
    }

    pub fn timeout_seconds(mut self, timeout: u64) -> Self {
        self.timeout_seconds = timeout;
        self
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let api_key = if self.api_key.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Config")
            .field("api_key", &api_key)
            .field("api_url", &self.api_url)
            .field("target", &self.target)
            .field("organization_id", &self.organization_id)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
