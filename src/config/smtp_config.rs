//! config/smtp_config.rs
//! Credenciales y parámetros del servidor SMTP.

use crate::error::CampaignError;

use super::{env_flag, env_or};

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    /// STARTTLS obligatorio
    pub use_tls: bool,
    /// TLS implícito (puerto 465)
    pub use_ssl: bool,
    pub username: String,
    pub password: String,
    pub from_email: String,
}

impl Default for SmtpConfig {
    /// Gmail con STARTTLS; las credenciales quedan vacías.
    fn default() -> Self {
        SmtpConfig {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            use_tls: true,
            use_ssl: false,
            username: String::new(),
            password: String::new(),
            from_email: String::new(),
        }
    }
}

impl SmtpConfig {
    /// Falla con `Configuration` listando todas las variables que faltan.
    pub fn from_env() -> Result<Self, CampaignError> {
        let username = std::env::var("SMTP_USERNAME").unwrap_or_default();
        let password = std::env::var("SMTP_PASSWORD").unwrap_or_default();
        let from_email = std::env::var("SMTP_FROM_EMAIL").unwrap_or_default();

        let missing: Vec<&str> = [
            ("SMTP_USERNAME", &username),
            ("SMTP_PASSWORD", &password),
            ("SMTP_FROM_EMAIL", &from_email),
        ]
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(key, _)| *key)
        .collect();

        if !missing.is_empty() {
            return Err(CampaignError::Configuration(format!(
                "Missing email configuration: {}",
                missing.join(", ")
            )));
        }

        let defaults = SmtpConfig::default();
        Ok(SmtpConfig {
            host: std::env::var("SMTP_SERVER").unwrap_or(defaults.host),
            port: env_or("SMTP_PORT", defaults.port),
            use_tls: env_flag("SMTP_USE_TLS", defaults.use_tls),
            use_ssl: env_flag("SMTP_USE_SSL", defaults.use_ssl),
            username,
            password,
            from_email,
        })
    }
}
