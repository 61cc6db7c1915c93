//! TOML configuration file loading
//!
//! Supports `~/.config/minaret/config.toml` as a persistent config source.
//! All fields are optional — the file is a partial overlay on top of
//! defaults, with environment variables taking final precedence.

use std::path::PathBuf;

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct MinaretConfigFile {
    /// Server/runtime configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Webhook ingestion rules
    #[serde(default)]
    pub ingest: IngestFileConfig,

    /// Extraction service configuration
    #[serde(default)]
    pub llm: LlmFileConfig,

    /// WhatsApp gateway configuration
    #[serde(default)]
    pub whatsapp: WhatsAppFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// API server port
    pub port: Option<u16>,

    /// Data directory (database location)
    pub data_dir: Option<String>,
}

/// Webhook ingestion rules
#[derive(Debug, Default, Deserialize)]
pub struct IngestFileConfig {
    /// Provisioned device identifier accepted by the webhook
    pub device_id: Option<String>,

    /// Trigger token required on group messages (e.g. "/review")
    pub group_trigger: Option<String>,

    /// Sender suffix marking a group context
    pub group_suffix: Option<String>,

    /// Server suffix stripped from direct-message sender IDs
    pub direct_suffix: Option<String>,

    /// Display name used when the sender has none
    pub fallback_name: Option<String>,
}

/// Extraction service configuration
#[derive(Debug, Default, Deserialize)]
pub struct LlmFileConfig {
    /// OpenAI-compatible API base URL
    pub api_url: Option<String>,

    /// API key (env `MINARET_LLM_API_KEY` / `OPENAI_API_KEY` take precedence)
    pub api_key: Option<String>,

    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: Option<String>,
}

/// WhatsApp gateway configuration
#[derive(Debug, Default, Deserialize)]
pub struct WhatsAppFileConfig {
    /// Gateway base URL for the send API
    pub api_url: Option<String>,

    /// Gateway bearer token
    pub token: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `MinaretConfigFile::default()` if the file doesn't exist or
/// can't be parsed.
pub fn load_config_file() -> MinaretConfigFile {
    let Some(path) = config_file_path() else {
        return MinaretConfigFile::default();
    };

    if !path.exists() {
        return MinaretConfigFile::default();
    }

    match std::fs::read_to_string(&path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                MinaretConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            MinaretConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/minaret/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("minaret").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_parses() {
        let content = r#"
            [ingest]
            device_id = "minaret-device-01"
            group_trigger = "/ulasan"
        "#;

        let config: MinaretConfigFile = toml::from_str(content).unwrap();
        assert_eq!(config.ingest.device_id.as_deref(), Some("minaret-device-01"));
        assert_eq!(config.ingest.group_trigger.as_deref(), Some("/ulasan"));
        assert!(config.llm.model.is_none());
        assert!(config.server.port.is_none());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config: MinaretConfigFile = toml::from_str("").unwrap();
        assert!(config.ingest.device_id.is_none());
    }
}
