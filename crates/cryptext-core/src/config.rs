use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CryptextError, CryptextResult};

/// Lowest PBKDF2 iteration count the config accepts.
pub const MIN_KDF_ITERATIONS: u32 = 100_000;

/// Top-level configuration (loaded from cryptext.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CryptextConfig {
    pub log: LogConfig,
    pub kdf: KdfConfig,
    pub transport: TransportConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: String,
}

/// Password key derivation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// PBKDF2-HMAC-SHA256 iterations (default: 100000)
    pub iterations: u32,
    /// "cascade" (one derivation per stage cipher) or "single"
    pub password_mode: PasswordModeSetting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PasswordModeSetting {
    #[default]
    Cascade,
    Single,
}

/// How sealed messages are rendered as text
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// "base64url" or "base61"
    pub encoding: EncodingSetting,
    /// Wrap output as a link (default: true)
    pub wrap_url: bool,
    /// Link prefix (default: cryptext://m/)
    pub url_prefix: String,
    /// Gzip level, 0-9 (default: 6)
    pub compression_level: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncodingSetting {
    #[default]
    Base64url,
    Base61,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Key store JSON file (default: ~/.config/cryptext/keys.json)
    pub path: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: "text".into(),
        }
    }
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            iterations: MIN_KDF_ITERATIONS,
            password_mode: PasswordModeSetting::Cascade,
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            encoding: EncodingSetting::Base64url,
            wrap_url: true,
            url_prefix: "cryptext://m/".into(),
            compression_level: 6,
        }
    }
}

impl StoreConfig {
    /// Configured path, or the default under `$HOME/.config/cryptext`.
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => {
                let home = std::env::var_os("HOME").map(PathBuf::from).unwrap_or_default();
                home.join(".config").join("cryptext").join("keys.json")
            }
        }
    }
}

impl CryptextConfig {
    /// Load from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> CryptextResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| CryptextError::Config(format!("{}: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CryptextResult<()> {
        if self.kdf.iterations < MIN_KDF_ITERATIONS {
            return Err(CryptextError::Config(format!(
                "kdf.iterations must be at least {MIN_KDF_ITERATIONS}, got {}",
                self.kdf.iterations
            )));
        }
        let prefix = &self.transport.url_prefix;
        if prefix.is_empty() {
            return Err(CryptextError::Config(
                "transport.url_prefix must not be empty".into(),
            ));
        }
        if prefix.chars().any(char::is_whitespace) {
            return Err(CryptextError::Config(format!(
                "transport.url_prefix must not contain whitespace: {prefix:?}"
            )));
        }
        if self.transport.compression_level > 9 {
            return Err(CryptextError::Config(format!(
                "transport.compression_level must be 0-9, got {}",
                self.transport.compression_level
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[log]
level = "debug"
format = "json"

[kdf]
iterations = 250000
password_mode = "single"

[transport]
encoding = "base61"
wrap_url = false
url_prefix = "https://example.com/m/"
compression_level = 9

[store]
path = "/tmp/keys.json"
"#;
        let config: CryptextConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, "json");
        assert_eq!(config.kdf.iterations, 250_000);
        assert_eq!(config.kdf.password_mode, PasswordModeSetting::Single);
        assert_eq!(config.transport.encoding, EncodingSetting::Base61);
        assert!(!config.transport.wrap_url);
        assert_eq!(config.transport.url_prefix, "https://example.com/m/");
        assert_eq!(config.transport.compression_level, 9);
        assert_eq!(config.store.resolved_path(), PathBuf::from("/tmp/keys.json"));
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_defaults() {
        let config: CryptextConfig = toml::from_str("").unwrap();

        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, "text");
        assert_eq!(config.kdf.iterations, MIN_KDF_ITERATIONS);
        assert_eq!(config.kdf.password_mode, PasswordModeSetting::Cascade);
        assert_eq!(config.transport.encoding, EncodingSetting::Base64url);
        assert!(config.transport.wrap_url);
        assert_eq!(config.transport.url_prefix, "cryptext://m/");
        assert_eq!(config.transport.compression_level, 6);
        assert!(config.store.path.is_none());
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
[transport]
encoding = "base61"
"#;
        let config: CryptextConfig = toml::from_str(toml_str).unwrap();

        // Overridden
        assert_eq!(config.transport.encoding, EncodingSetting::Base61);
        // Defaults
        assert!(config.transport.wrap_url);
        assert_eq!(config.kdf.iterations, MIN_KDF_ITERATIONS);
    }

    #[test]
    fn test_unknown_encoding_rejected() {
        let toml_str = r#"
[transport]
encoding = "hex"
"#;
        assert!(toml::from_str::<CryptextConfig>(toml_str).is_err());
    }

    #[test]
    fn test_validate_rejects_weak_kdf() {
        let mut config = CryptextConfig::default();
        config.kdf.iterations = MIN_KDF_ITERATIONS - 1;
        assert!(matches!(config.validate(), Err(CryptextError::Config(_))));
    }

    #[test]
    fn test_validate_rejects_bad_prefix() {
        let mut config = CryptextConfig::default();
        config.transport.url_prefix = String::new();
        assert!(config.validate().is_err());

        config.transport.url_prefix = "cryptext:// m/".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_compression_level() {
        let mut config = CryptextConfig::default();
        config.transport.compression_level = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CryptextConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.transport.url_prefix, "cryptext://m/");
    }

    #[test]
    fn test_load_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cryptext.toml");
        std::fs::write(&path, "[kdf]\niterations = 10\n").unwrap();
        assert!(matches!(
            CryptextConfig::load(&path),
            Err(CryptextError::Config(_))
        ));
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = CryptextConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: CryptextConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.kdf.iterations, parsed.kdf.iterations);
        assert_eq!(config.transport.url_prefix, parsed.transport.url_prefix);
        assert_eq!(config.transport.encoding, parsed.transport.encoding);
    }
}
