use std::collections::HashMap;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

/// Keychain service name for stored tokens
const SERVICE_NAME: &str = "brewview";

/// Storage key for the access token
pub const TOKEN_KEY: &str = "token";

/// Storage key for the refresh token
pub const REFRESH_KEY: &str = "refresh token";

/// Persistent string storage for tokens.
pub trait TokenBackend {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    /// Removing a key that does not exist succeeds.
    fn delete(&mut self, key: &str) -> Result<()>;
}

/// Tokens in the OS keychain, one entry per key.
#[derive(Debug, Clone)]
pub struct KeyringBackend {
    service: String,
}

impl KeyringBackend {
    pub fn new() -> Self {
        Self::with_service(SERVICE_NAME)
    }

    /// Separate keychain namespace, e.g. one per server.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service, key).context("Failed to create keyring entry")
    }
}

impl Default for KeyringBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenBackend for KeyringBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to retrieve token from keychain"),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entry(key)?
            .set_password(value)
            .context("Failed to store token in keychain")
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}

/// In-process storage; nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    values: HashMap<String, String>,
}

impl TokenBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<()> {
        self.values.remove(key);
        Ok(())
    }
}

/// Holds the access token and refresh token.
///
/// Tokens live independently of any `Session`: they survive restarts and are
/// only removed by an explicit clear.
pub struct TokenStore {
    backend: Box<dyn TokenBackend>,
}

impl TokenStore {
    pub fn new(backend: Box<dyn TokenBackend>) -> Self {
        Self { backend }
    }

    pub fn keyring() -> Self {
        Self::new(Box::new(KeyringBackend::new()))
    }

    pub fn in_memory() -> Self {
        Self::new(Box::new(MemoryBackend::default()))
    }

    pub fn get_token(&self) -> Result<Option<String>> {
        self.backend.get(TOKEN_KEY)
    }

    pub fn set_token(&mut self, token: &str) -> Result<()> {
        debug!("Storing access token");
        self.backend.set(TOKEN_KEY, token)
    }

    pub fn clear_token(&mut self) -> Result<()> {
        debug!("Clearing access token");
        self.backend.delete(TOKEN_KEY)
    }

    pub fn get_refresh(&self) -> Result<Option<String>> {
        self.backend.get(REFRESH_KEY)
    }

    pub fn set_refresh(&mut self, refresh: &str) -> Result<()> {
        self.backend.set(REFRESH_KEY, refresh)
    }

    pub fn clear_refresh(&mut self) -> Result<()> {
        self.backend.delete(REFRESH_KEY)
    }

    /// Clear both tokens, attempting the refresh token even if the first fails.
    pub fn clear_all(&mut self) -> Result<()> {
        let token = self.clear_token();
        let refresh = self.clear_refresh();
        token.and(refresh)
    }
}
