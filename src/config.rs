//! Connector configuration loaded from environment variables.
//!
//! Resolved once, when a connector is constructed:
//! - `TIGER_BASE_URL`: REST endpoint (default `https://openapi.tigerfintech.com/v1`)
//! - `TIGER_TIMEOUT_SECS`: per-request timeout in seconds (default 10)
//! - `TIGER_ACCOUNT_ID`, `TIGER_API_KEY`, `TIGER_API_SECRET`: optional
//!   session credentials

use std::time::Duration;

use crate::credentials::Credentials;

/// Default Tiger Brokers REST endpoint.
const DEFAULT_TIGER_BASE_URL: &str = "https://openapi.tigerfintech.com/v1";

/// Default transport timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Top-level application configuration.
#[derive(Debug)]
pub struct AppConfig {
    pub tiger: TigerConfig,
}

/// Tiger-specific configuration values.
#[derive(Debug, Clone)]
pub struct TigerConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub credentials: Option<Credentials>,
}

impl TigerConfig {
    /// Configuration pointing at `base_url` with the default timeout and
    /// no credentials.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            credentials: None,
        }
    }
}

impl Default for TigerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_TIGER_BASE_URL)
    }
}

/// Loads the application configuration from environment variables.
///
/// Credentials are optional, but when the key or secret is set both must
/// be present together with an account id.
///
/// # Errors
///
/// Returns [`BrokerError::Config`](crate::BrokerError::Config) if the
/// timeout is not a positive integer or the credentials are incomplete.
pub fn fetch_config() -> crate::Result<AppConfig> {
    let base_url = non_empty_var("TIGER_BASE_URL")
        .map(|url| url.trim_end_matches('/').to_string())
        .unwrap_or_else(|| DEFAULT_TIGER_BASE_URL.to_string());

    let timeout = match non_empty_var("TIGER_TIMEOUT_SECS") {
        Some(raw) => match raw.parse::<u64>() {
            Ok(secs) if secs > 0 => Duration::from_secs(secs),
            _ => {
                return Err(crate::BrokerError::Config(format!(
                    "TIGER_TIMEOUT_SECS must be a positive integer, got {raw:?}"
                )));
            }
        },
        None => DEFAULT_TIMEOUT,
    };

    let account_id = non_empty_var("TIGER_ACCOUNT_ID");
    let api_key = non_empty_var("TIGER_API_KEY");
    let api_secret = non_empty_var("TIGER_API_SECRET");

    let credentials = match (account_id, api_key, api_secret) {
        (Some(account), Some(key), Some(secret)) => Some(Credentials::new(account, key, secret)),
        (_, None, None) => None,
        (_, Some(_), None) => {
            return Err(crate::BrokerError::Config(
                "TIGER_API_KEY is set but TIGER_API_SECRET is missing".to_string(),
            ));
        }
        (_, None, Some(_)) => {
            return Err(crate::BrokerError::Config(
                "TIGER_API_SECRET is set but TIGER_API_KEY is missing".to_string(),
            ));
        }
        (None, Some(_), Some(_)) => {
            return Err(crate::BrokerError::Config(
                "TIGER_API_KEY is set but TIGER_ACCOUNT_ID is missing".to_string(),
            ));
        }
    };

    Ok(AppConfig {
        tiger: TigerConfig {
            base_url,
            timeout,
            credentials,
        },
    })
}

/// Returns the value of an environment variable if it exists and is non-empty.
fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that touch the process environment.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ALL_VARS: [&str; 5] = [
        "TIGER_BASE_URL",
        "TIGER_TIMEOUT_SECS",
        "TIGER_ACCOUNT_ID",
        "TIGER_API_KEY",
        "TIGER_API_SECRET",
    ];

    /// Temporarily sets env vars, runs `f`, then restores originals.
    ///
    /// Variables not listed in `vars` are cleared for the duration of `f`.
    pub(crate) fn with_env<F: FnOnce()>(vars: &[(&str, &str)], f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());

        let originals: Vec<(&str, Option<String>)> =
            ALL_VARS.iter().map(|k| (*k, std::env::var(k).ok())).collect();

        // SAFETY: env mutation is serialized by ENV_LOCK.
        unsafe {
            for k in ALL_VARS {
                std::env::remove_var(k);
            }
            for (k, v) in vars {
                std::env::set_var(k, v);
            }
        }

        f();

        // SAFETY: restoring original values under the same lock.
        unsafe {
            for (k, original) in originals {
                match original {
                    Some(val) => std::env::set_var(k, val),
                    None => std::env::remove_var(k),
                }
            }
        }
    }

    #[test]
    fn defaults_without_env_vars() {
        with_env(&[], || {
            let config = fetch_config().unwrap();
            assert_eq!(config.tiger.base_url, DEFAULT_TIGER_BASE_URL);
            assert_eq!(config.tiger.timeout, DEFAULT_TIMEOUT);
            assert!(config.tiger.credentials.is_none());
        });
    }

    #[test]
    fn loads_credentials_from_env() {
        with_env(
            &[
                ("TIGER_ACCOUNT_ID", "U1234"),
                ("TIGER_API_KEY", "test-key"),
                ("TIGER_API_SECRET", "test-secret"),
            ],
            || {
                let config = fetch_config().unwrap();
                let creds = config.tiger.credentials.unwrap();
                assert_eq!(creds.account_id(), "U1234");
                assert_eq!(creds.api_key(), "test-key");
                assert_eq!(creds.api_secret(), "test-secret");
            },
        );
    }

    #[test]
    fn custom_base_url_and_timeout() {
        with_env(
            &[
                ("TIGER_BASE_URL", "https://sandbox.example.com/v1/"),
                ("TIGER_TIMEOUT_SECS", "3"),
            ],
            || {
                let config = fetch_config().unwrap();
                assert_eq!(config.tiger.base_url, "https://sandbox.example.com/v1");
                assert_eq!(config.tiger.timeout, Duration::from_secs(3));
            },
        );
    }

    #[test]
    fn rejects_bad_timeout() {
        for raw in ["0", "ten", "-1"] {
            with_env(&[("TIGER_TIMEOUT_SECS", raw)], || {
                let err = fetch_config().unwrap_err();
                assert!(err.to_string().contains("TIGER_TIMEOUT_SECS"));
            });
        }
    }

    #[test]
    fn rejects_key_without_secret() {
        with_env(
            &[("TIGER_ACCOUNT_ID", "U1"), ("TIGER_API_KEY", "key-only")],
            || {
                let err = fetch_config().unwrap_err();
                assert!(err.to_string().contains("TIGER_API_SECRET is missing"));
            },
        );
    }

    #[test]
    fn rejects_secret_without_key() {
        with_env(&[("TIGER_API_SECRET", "secret-only")], || {
            let err = fetch_config().unwrap_err();
            assert!(err.to_string().contains("TIGER_API_KEY is missing"));
        });
    }

    #[test]
    fn rejects_credentials_without_account() {
        with_env(
            &[("TIGER_API_KEY", "k"), ("TIGER_API_SECRET", "s")],
            || {
                let err = fetch_config().unwrap_err();
                assert!(err.to_string().contains("TIGER_ACCOUNT_ID is missing"));
            },
        );
    }

    #[test]
    fn empty_values_treated_as_absent() {
        with_env(
            &[
                ("TIGER_BASE_URL", ""),
                ("TIGER_API_KEY", ""),
                ("TIGER_API_SECRET", ""),
            ],
            || {
                let config = fetch_config().unwrap();
                assert_eq!(config.tiger.base_url, DEFAULT_TIGER_BASE_URL);
                assert!(config.tiger.credentials.is_none());
            },
        );
    }
}
