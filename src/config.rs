// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Application configuration loaded from environment variables.

use crate::models::user::UserSession;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}

/// Where uploaded assets go.
#[derive(Debug, Clone, PartialEq)]
pub enum StorageConfig {
    /// Firebase-style REST bucket endpoint.
    Http { url: String, token: Option<String> },
    /// Local directory.
    Local { root: PathBuf },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub api_url: String,
    pub storage: StorageConfig,
    /// Signed-in author; `None` when `USER_UID` is unset.
    pub user: Option<UserSession>,
    pub request_timeout_secs: u64,
    /// Playback rate for image-sequence sources.
    pub frame_rate: f64,
}

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                  |
    /// |------------------------|--------------------------|
    /// | `API_URL`              | `REACT_APP_API_URL`, then `http://localhost:8000` |
    /// | `STORAGE_URL`          | unset (local storage)    |
    /// | `STORAGE_DIR`          | `./storage`              |
    /// | `STORAGE_TOKEN`        | unset                    |
    /// | `USER_UID`             | unset                    |
    /// | `USER_EMAIL`           | empty                    |
    /// | `USERNAME`             | email local part         |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                     |
    /// | `FRAME_RATE`           | `30`                     |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("API_URL")
            .or_else(|| get("REACT_APP_API_URL"))
            .unwrap_or_else(|| "http://localhost:8000".into())
            .trim_end_matches('/')
            .to_string();

        let storage = match get("STORAGE_URL") {
            Some(url) => StorageConfig::Http {
                url,
                token: get("STORAGE_TOKEN"),
            },
            None => StorageConfig::Local {
                root: get("STORAGE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./storage")),
            },
        };

        let user = get("USER_UID").map(|uid| {
            UserSession::new(uid, get("USER_EMAIL").unwrap_or_default(), get("USERNAME"))
        });

        let request_timeout_secs: u64 = parse(&get, "REQUEST_TIMEOUT_SECS", "u64", 30)?;

        let frame_rate: f64 = parse(&get, "FRAME_RATE", "positive number", 30.0)?;
        if !(frame_rate.is_finite() && frame_rate > 0.0) {
            return Err(ConfigError::Invalid {
                name: "FRAME_RATE",
                expected: "positive number",
                value: frame_rate.to_string(),
            });
        }

        Ok(Self {
            api_url,
            storage,
            user,
            request_timeout_secs,
            frame_rate,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".into(),
            storage: StorageConfig::Local {
                root: PathBuf::from("./storage"),
            },
            user: None,
            request_timeout_secs: 30,
            frame_rate: 30.0,
        }
    }
}

fn parse<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_api_url_fallback_order() {
        let cfg = config(&[("REACT_APP_API_URL", "http://legacy:9000/")]).unwrap();
        assert_eq!(cfg.api_url, "http://legacy:9000");

        let cfg = config(&[
            ("API_URL", "http://api:8000"),
            ("REACT_APP_API_URL", "http://legacy:9000"),
        ])
        .unwrap();
        assert_eq!(cfg.api_url, "http://api:8000");
    }

    #[test]
    fn test_http_storage_and_user() {
        let cfg = config(&[
            ("STORAGE_URL", "https://storage.example.com/v0/b/bucket"),
            ("STORAGE_TOKEN", "secret"),
            ("USER_UID", "uid-9"),
            ("USER_EMAIL", "maker@example.com"),
        ])
        .unwrap();
        assert_eq!(
            cfg.storage,
            StorageConfig::Http {
                url: "https://storage.example.com/v0/b/bucket".into(),
                token: Some("secret".into()),
            }
        );
        let user = cfg.user.unwrap();
        assert_eq!(user.uid, "uid-9");
        assert_eq!(user.username, "maker");
    }

    #[test]
    fn test_invalid_numbers_are_rejected() {
        let err = config(&[("REQUEST_TIMEOUT_SECS", "soon")]).unwrap_err();
        assert_eq!(err.to_string(), "REQUEST_TIMEOUT_SECS must be a valid u64, got \"soon\"");
        assert!(config(&[("FRAME_RATE", "0")]).is_err());
        assert!(config(&[("FRAME_RATE", "24")]).is_ok());
    }
}
