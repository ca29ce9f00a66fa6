//! Broker credentials and keychain storage.
//!
//! [`Credentials`] is what a caller passes to
//! [`Broker::connect`](crate::broker::Broker::connect). The API secret is
//! wiped from memory on drop and `Debug` output never shows key material.
//!
//! At startup, [`populate_env_from_keychain`] copies any credentials stored
//! in the system keychain into environment variables so
//! [`crate::config::fetch_config`] picks them up transparently.

use std::fmt;

use tracing::{debug, warn};
use zeroize::Zeroizing;

/// Keychain service name used for all stored credentials.
const SERVICE: &str = "brokerlink";

/// Session credentials for one broker account.
#[derive(Clone)]
pub struct Credentials {
    account_id: String,
    api_key: Zeroizing<String>,
    api_secret: Zeroizing<String>,
}

impl Credentials {
    pub fn new(
        account_id: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            api_key: Zeroizing::new(api_key.into()),
            api_secret: Zeroizing::new(api_secret.into()),
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn api_key(&self) -> &str {
        self.api_key.as_str()
    }

    pub fn api_secret(&self) -> &str {
        self.api_secret.as_str()
    }

    /// Whether any field is blank.
    pub fn is_incomplete(&self) -> bool {
        self.account_id.trim().is_empty()
            || self.api_key.trim().is_empty()
            || self.api_secret.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("account_id", &self.account_id)
            .field("api_key", &"[REDACTED]")
            .field("api_secret", &"[REDACTED]")
            .finish()
    }
}

/// Known credential keys managed by this module.
#[derive(Clone, Copy, Debug)]
pub enum CredentialKey {
    TigerAccountId,
    TigerApiKey,
    TigerApiSecret,
}

impl CredentialKey {
    /// Returns the keychain entry identifier.
    pub fn keyring_id(self) -> &'static str {
        match self {
            Self::TigerAccountId => "tiger_account_id",
            Self::TigerApiKey => "tiger_api_key",
            Self::TigerApiSecret => "tiger_api_secret",
        }
    }

    /// Returns the environment variable name for this credential.
    pub fn env_var(self) -> &'static str {
        match self {
            Self::TigerAccountId => "TIGER_ACCOUNT_ID",
            Self::TigerApiKey => "TIGER_API_KEY",
            Self::TigerApiSecret => "TIGER_API_SECRET",
        }
    }

    /// All credential keys.
    pub const ALL: [CredentialKey; 3] = [
        Self::TigerAccountId,
        Self::TigerApiKey,
        Self::TigerApiSecret,
    ];
}

/// Loads a credential from the keychain, returning `None` if not set.
pub fn load(key: CredentialKey) -> Option<Zeroizing<String>> {
    let entry = keyring::Entry::new(SERVICE, key.keyring_id()).ok()?;
    match entry.get_password() {
        Ok(password) => Some(Zeroizing::new(password)),
        Err(keyring::Error::NoEntry) => None,
        Err(e) => {
            warn!(key = key.keyring_id(), error = %e, "failed to read keychain entry");
            None
        }
    }
}

/// Saves a credential to the keychain.
///
/// # Errors
///
/// Returns [`BrokerError::Config`](crate::BrokerError::Config) if the
/// keychain rejects the entry.
pub fn save(key: CredentialKey, value: &str) -> crate::Result<()> {
    let entry = keyring::Entry::new(SERVICE, key.keyring_id())
        .map_err(|e| crate::BrokerError::Config(format!("keyring entry error: {e}")))?;
    entry
        .set_password(value)
        .map_err(|e| crate::BrokerError::Config(format!("failed to save to keychain: {e}")))
}

/// Populates environment variables from the keychain for any
/// credentials not already set in the environment.
///
/// Call this at startup before [`crate::config::fetch_config`] and before
/// any other thread exists, such as the worker threads of a tokio runtime.
pub fn populate_env_from_keychain() {
    for key in CredentialKey::ALL {
        if std::env::var(key.env_var()).is_err()
            && let Some(value) = load(key)
        {
            debug!(key = key.env_var(), "loaded credential from keychain");
            // SAFETY: callers run this before spawning threads (see the docs above).
            unsafe {
                std::env::set_var(key.env_var(), value.as_str());
            }
        }
    }
}
