//! config/mod.rs
//! Configuración leída de variables de entorno (.env incluido), con defaults fijos.

pub mod dispatch_config;
pub mod server_config;
pub mod smtp_config;

use std::str::FromStr;

/// Lee `key` del entorno; si falta o no se puede parsear, usa `default`.
pub(crate) fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr + std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                log::warn!(
                    "(env_or) Valor inválido para {}='{}', usando default {}",
                    key,
                    raw,
                    default
                );
                default
            }
        },
        Err(_) => default,
    }
}

/// Booleanos al estilo "True"/"false"/"1".
pub(crate) fn env_flag(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(raw) => matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        Err(_) => default,
    }
}
