//! config/server_config.rs

use std::path::PathBuf;

use super::env_or;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Carpeta donde se guardan los adjuntos subidos hasta que se envían
    pub attachment_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 5022,
            attachment_dir: std::env::temp_dir().join("campaign_attachments"),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let defaults = ServerConfig::default();
        ServerConfig {
            host: std::env::var("SERVER_HOST").unwrap_or(defaults.host),
            port: env_or("SERVER_PORT", defaults.port),
            attachment_dir: std::env::var("ATTACHMENT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.attachment_dir),
        }
    }
}
