//! Guard configuration
//!
//! Stored in a plain JSON file (`guard.json`). The encryption key lives here
//! as hex; keep the file outside the web root and readable by the app user
//! only.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::crypto::{Cipher, EncryptionKey};
use crate::database::ConnectionSettings;
use crate::error::{GuardError, Result};
use crate::upload::UploadSettings;

/// Config file name inside the config directory
pub const CONFIG_FILE_NAME: &str = "guard.json";

/// Symmetric encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct EncryptionSettings {
    /// Cipher identifier (e.g., "aes-256-gcm")
    pub cipher: Cipher,
    /// Hex-encoded key; must match the cipher's key length
    pub key_hex: Option<String>,
}

impl EncryptionSettings {
    /// Build the process-wide key
    pub fn key(&self) -> Result<EncryptionKey> {
        let key_hex = self
            .key_hex
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GuardError::Config("No encryption key configured".to_string()))?;
        EncryptionKey::from_hex(self.cipher, key_hex)
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardConfig {
    /// Config file version
    pub version: u32,
    /// Encryption key and cipher
    pub encryption: EncryptionSettings,
    /// Database connection parameters
    pub database: ConnectionSettings,
    /// Upload validation and storage
    pub uploads: UploadSettings,
    /// Append-only security log
    pub security_log: PathBuf,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            version: 1,
            encryption: EncryptionSettings::default(),
            database: ConnectionSettings::default(),
            uploads: UploadSettings::default(),
            security_log: PathBuf::from("logs/security.log"),
        }
    }
}

/// Loads and saves [`GuardConfig`]
pub struct ConfigManager {
    config_file: PathBuf,
    config: GuardConfig,
}

impl ConfigManager {
    /// Load from `dir`, falling back to defaults when the file is absent
    pub fn new(dir: &Path) -> Result<Self> {
        let config_file = dir.join(CONFIG_FILE_NAME);
        let config = Self::load_from_file(&config_file)?;

        Ok(Self {
            config_file,
            config,
        })
    }

    /// Platform config directory for the application
    pub fn default_dir() -> Result<PathBuf> {
        ProjectDirs::from("org", "campus-guard", "campus-guard")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| GuardError::Config("Could not determine config directory".to_string()))
    }

    fn load_from_file(path: &Path) -> Result<GuardConfig> {
        if !path.exists() {
            debug!("No config file found at {:?}, using defaults", path);
            return Ok(GuardConfig::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: GuardConfig = serde_json::from_str(&contents)
            .map_err(|e| GuardError::Config(format!("Invalid {}: {}", CONFIG_FILE_NAME, e)))?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Save config to file
    pub async fn save(&self) -> Result<()> {
        if let Some(parent) = self.config_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(&self.config)?;

        // Write atomically using temp file
        let temp_path = self.config_file.with_extension("tmp");
        tokio::fs::write(&temp_path, &contents).await?;
        tokio::fs::rename(&temp_path, &self.config_file).await?;

        debug!("Saved config to {:?}", self.config_file);
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.config_file
    }

    pub fn get(&self) -> &GuardConfig {
        &self.config
    }

    pub fn get_mut(&mut self) -> &mut GuardConfig {
        &mut self.config
    }

    /// Store a newly generated key for `cipher` and save
    pub async fn rotate_key(&mut self, cipher: Cipher) -> Result<()> {
        let key = EncryptionKey::generate(cipher)?;
        self.config.encryption = EncryptionSettings {
            cipher,
            key_hex: Some(key.to_hex().expose().to_string()),
        };
        self.save().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::new(temp_dir.path()).unwrap();

        let config = manager.get();
        assert_eq!(config.version, 1);
        assert_eq!(config.encryption.cipher, Cipher::Aes256Gcm);
        assert!(config.encryption.key().is_err());
        assert_eq!(config.uploads.max_size_bytes, 10 * 1024 * 1024);
    }

    #[tokio::test]
    async fn test_config_persistence() {
        let temp_dir = TempDir::new().unwrap();

        {
            let mut manager = ConfigManager::new(temp_dir.path()).unwrap();
            manager.get_mut().database.host = "db.internal".to_string();
            manager.get_mut().uploads.max_size_bytes = 1024;
            manager.rotate_key(Cipher::Aes128Gcm).await.unwrap();
        }

        {
            let manager = ConfigManager::new(temp_dir.path()).unwrap();
            assert_eq!(manager.get().database.host, "db.internal");
            assert_eq!(manager.get().uploads.max_size_bytes, 1024);

            let key = manager.get().encryption.key().unwrap();
            assert_eq!(key.cipher(), Cipher::Aes128Gcm);
            assert_eq!(key.as_bytes().len(), 16);
        }
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"{ "encryption": { "cipher": "aes-256-gcm", "keyHex": null } }"#,
        )
        .unwrap();

        let manager = ConfigManager::new(temp_dir.path()).unwrap();
        assert_eq!(manager.get().security_log, PathBuf::from("logs/security.log"));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "{ not json").unwrap();

        assert!(matches!(
            ConfigManager::new(temp_dir.path()),
            Err(GuardError::Config(_))
        ));
    }
}
