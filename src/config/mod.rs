//! Configuration management for the Minaret gateway

pub mod file;

use std::path::PathBuf;

use secrecy::SecretString;

use crate::Result;

/// Minaret gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to data directory (database lives here)
    pub data_dir: PathBuf,

    /// HTTP server configuration
    pub server: ServerConfig,

    /// Webhook ingestion rules
    pub ingest: IngestConfig,

    /// Extraction service configuration
    pub extraction: ExtractionConfig,

    /// WhatsApp gateway for outbound replies (replies disabled when absent)
    pub whatsapp: Option<WhatsAppConfig>,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Webhook ingestion rules
#[derive(Debug, Clone)]
pub struct IngestConfig {
    /// Provisioned device identifier; calls carrying any other value are
    /// rejected (shared-endpoint replay defense). Required for serving.
    pub device_id: Option<String>,

    /// Trigger token required at the start of group messages
    pub group_trigger: String,

    /// Sender suffix marking a group context
    pub group_suffix: String,

    /// Server suffix stripped from direct-message sender IDs
    pub direct_suffix: String,

    /// Display name used when the sender has none
    pub fallback_name: String,
}

/// Extraction service configuration
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// OpenAI-compatible API base URL
    pub api_url: String,

    /// API key; extraction is unavailable without one
    pub api_key: Option<SecretString>,

    /// Model identifier
    pub model: String,
}

/// WhatsApp gateway configuration
#[derive(Debug, Clone)]
pub struct WhatsAppConfig {
    /// Gateway base URL for the send API
    pub api_url: String,

    /// Gateway bearer token
    pub token: SecretString,
}

impl Config {
    /// Load configuration: defaults, then the TOML overlay, then env vars
    ///
    /// # Errors
    ///
    /// Returns error if the data directory cannot be created
    pub fn load() -> Result<Self> {
        let overlay = file::load_config_file();

        let data_dir = env_var("MINARET_DATA_DIR")
            .map(PathBuf::from)
            .or_else(|| overlay.server.data_dir.map(PathBuf::from))
            .unwrap_or_else(default_data_dir);
        std::fs::create_dir_all(&data_dir)?;

        let server = ServerConfig {
            port: overlay.server.port.unwrap_or(8787),
        };

        let ingest = IngestConfig {
            device_id: env_var("MINARET_DEVICE_ID").or(overlay.ingest.device_id),
            group_trigger: env_var("MINARET_GROUP_TRIGGER")
                .or(overlay.ingest.group_trigger)
                .unwrap_or_else(|| "/review".to_string()),
            group_suffix: overlay
                .ingest
                .group_suffix
                .unwrap_or_else(|| "@g.us".to_string()),
            direct_suffix: overlay
                .ingest
                .direct_suffix
                .unwrap_or_else(|| "@s.whatsapp.net".to_string()),
            fallback_name: overlay
                .ingest
                .fallback_name
                .unwrap_or_else(|| "Hamba Allah".to_string()),
        };

        let extraction = ExtractionConfig {
            api_url: env_var("MINARET_LLM_API_URL")
                .or(overlay.llm.api_url)
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            api_key: env_var("MINARET_LLM_API_KEY")
                .or_else(|| env_var("OPENAI_API_KEY"))
                .or(overlay.llm.api_key)
                .map(SecretString::from),
            model: env_var("MINARET_LLM_MODEL")
                .or(overlay.llm.model)
                .unwrap_or_else(|| "gpt-4o-mini".to_string()),
        };

        let wa_url = env_var("MINARET_WA_API_URL").or(overlay.whatsapp.api_url);
        let wa_token = env_var("MINARET_WA_TOKEN").or(overlay.whatsapp.token);
        let whatsapp = wa_url.zip(wa_token).map(|(api_url, token)| WhatsAppConfig {
            api_url,
            token: SecretString::from(token),
        });

        Ok(Self {
            data_dir,
            server,
            ingest,
            extraction,
            whatsapp,
        })
    }

    /// Path to the SQLite database file
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("minaret.db")
    }
}

/// Read a non-empty environment variable
fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Default data directory: `~/.local/share/minaret` (platform equivalent)
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("dev", "minaret", "minaret").map_or_else(
        || PathBuf::from(".minaret"),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}
