//! Configured entry point tying the key and the security log together

use tracing::info;

use crate::audit::{ClientInfo, EventDetails, SecurityLog};
use crate::crypto::{self, EncryptionKey};
use crate::error::Result;
use crate::settings::GuardConfig;

/// Holds the process-wide key and log target
///
/// Stateless helpers (hashing, tokens, CSRF, sanitizing) stay free functions;
/// this type exists for the operations that need configuration.
pub struct SecurityToolkit {
    key: EncryptionKey,
    log: SecurityLog,
}

impl SecurityToolkit {
    pub fn new(key: EncryptionKey, log: SecurityLog) -> Self {
        Self { key, log }
    }

    /// Build from loaded configuration; fails if no valid key is configured
    pub fn from_config(config: &GuardConfig) -> Result<Self> {
        let key = config.encryption.key()?;
        info!(
            "Security toolkit ready (cipher: {}, log: {:?})",
            key.cipher(),
            config.security_log
        );
        Ok(Self::new(key, SecurityLog::new(&config.security_log)))
    }

    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }

    pub fn log(&self) -> &SecurityLog {
        &self.log
    }

    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        crypto::encrypt(plaintext, &self.key)
    }

    pub fn decrypt(&self, blob: &str) -> Result<Vec<u8>> {
        crypto::decrypt(blob, &self.key)
    }

    /// Fail-open audit logging, see [`SecurityLog::log_event`]
    pub fn log_event(
        &self,
        event: &str,
        actor_id: Option<&str>,
        client: &ClientInfo,
        details: EventDetails,
    ) {
        self.log.log_event(event, actor_id, client, details);
    }
}
