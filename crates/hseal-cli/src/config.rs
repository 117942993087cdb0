use anyhow::{Context, Result};
use hseal_crypto::CodecOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Top-level CLI configuration (loaded from hseal.toml)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HsealConfig {
    pub log: LogConfig,
    pub codec: CodecOptions,
    pub keys: KeysConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (default: warn)
    pub level: String,
    /// Log format: "json" or "text"
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Text,
}

/// Names of the environment variables key material is read from.
///
/// Every value is standard base64, except the cookie key which is passed
/// through as text and decoded by the cookie codec itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub secret_env: String,
    pub sign_key_env: String,
    pub cookie_key_env: String,
    pub block_key_env: String,
    pub stream_key_env: String,
    pub hmac_key_env: String,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            secret_env: "HSEAL_SECRET".into(),
            sign_key_env: "HSEAL_SIGN_KEY".into(),
            cookie_key_env: "HSEAL_COOKIE_KEY".into(),
            block_key_env: "HSEAL_BLOCK_KEY".into(),
            stream_key_env: "HSEAL_STREAM_KEY".into(),
            hmac_key_env: "HSEAL_HMAC_KEY".into(),
        }
    }
}

/// Read and parse `path`. `Ok(None)` when the file does not exist.
pub fn load_config(path: &Path) -> Result<Option<HsealConfig>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("reading config: {}", path.display()))?;
    let config: HsealConfig =
        toml::from_str(&content).with_context(|| format!("parsing config: {}", path.display()))?;
    config
        .codec
        .validate()
        .with_context(|| format!("invalid [codec] in {}", path.display()))?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hseal_crypto::{CookieEncoding, TextEncoding};
    use std::io::Write;

    #[test]
    fn test_parse_defaults() {
        let config: HsealConfig = toml::from_str("").unwrap();

        assert_eq!(config.log.level, "warn");
        assert_eq!(config.log.format, LogFormat::Text);
        assert!(!config.codec.slow_kdf);
        assert_eq!(config.codec.stream_chunk_size, 4096);
        assert_eq!(config.codec.frame_chunk_size, 16384);
        assert_eq!(config.keys.secret_env, "HSEAL_SECRET");
        assert_eq!(config.keys.hmac_key_env, "HSEAL_HMAC_KEY");
    }

    #[test]
    fn test_parse_full_config() {
        let toml_str = r#"
[log]
level = "debug"
format = "json"

[codec]
slow_kdf = true
text_encoding = "hex"
cookie_encoding = "hex"
stream_chunk_size = 8192

[codec.kdf]
mem_cost_kib = 19456
time_cost = 2
parallelism = 1

[keys]
secret_env = "APP_SECRET"
"#;
        let config: HsealConfig = toml::from_str(toml_str).unwrap();

        assert_eq!(config.log.level, "debug");
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(config.codec.slow_kdf);
        assert_eq!(config.codec.text_encoding, TextEncoding::Hex);
        assert_eq!(config.codec.cookie_encoding, CookieEncoding::Hex);
        assert_eq!(config.codec.stream_chunk_size, 8192);
        assert_eq!(config.codec.kdf.mem_cost_kib, 19456);
        assert_eq!(config.codec.kdf.time_cost, 2);
        // Overridden
        assert_eq!(config.keys.secret_env, "APP_SECRET");
        // Defaults
        assert_eq!(config.keys.sign_key_env, "HSEAL_SIGN_KEY");
        assert_eq!(config.codec.frame_chunk_size, 16384);
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = HsealConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: HsealConfig = toml::from_str(&toml_str).unwrap();

        assert_eq!(config.codec, parsed.codec);
        assert_eq!(config.log.level, parsed.log.level);
        assert_eq!(config.keys.cookie_key_env, parsed.keys.cookie_key_env);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load_config(&dir.path().join("absent.toml")).unwrap().is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[codec]\nframe_chunk_size = 1024").unwrap();

        let config = load_config(file.path()).unwrap().unwrap();
        assert_eq!(config.codec.frame_chunk_size, 1024);
    }

    #[test]
    fn test_load_rejects_bad_values() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[codec]\nframe_chunk_size = 70000").unwrap();
        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("frame_chunk_size"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[log\nlevel = ").unwrap();
        assert!(load_config(file.path()).is_err());
    }
}
