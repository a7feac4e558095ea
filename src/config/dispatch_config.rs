//! config/dispatch_config.rs
//! Límites de envío por lotes y del scheduler de campañas.

use std::time::Duration;

use chrono::Duration as ChronoDuration;
use super::env_or;

const DEFAULT_BATCH_SIZE: usize = 50;
const DEFAULT_MAX_WORKERS: usize = 3;
const DEFAULT_PAUSE_SECS: u64 = 30;
const DEFAULT_SEND_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_HORIZON_DAYS: i64 = 30;
const DEFAULT_MISFIRE_GRACE_SECS: i64 = 3600;

/// Configuración del despachador por lotes.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Destinatarios por lote
    pub batch_size: usize,
    /// Envíos simultáneos dentro de un lote
    pub max_workers: usize,
    /// Pausa entre lotes (nunca después del último)
    pub pause: Duration,
    /// Tiempo máximo por destinatario
    pub send_timeout: Duration,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        DispatchConfig {
            batch_size: DEFAULT_BATCH_SIZE,
            max_workers: DEFAULT_MAX_WORKERS,
            pause: Duration::from_secs(DEFAULT_PAUSE_SECS),
            send_timeout: Duration::from_secs(DEFAULT_SEND_TIMEOUT_SECS),
        }
    }
}

impl DispatchConfig {
    pub fn from_env() -> Self {
        DispatchConfig {
            batch_size: env_or("CAMPAIGN_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            max_workers: env_or("CAMPAIGN_MAX_WORKERS", DEFAULT_MAX_WORKERS).max(1),
            pause: Duration::from_secs(env_or("CAMPAIGN_PAUSE_SECS", DEFAULT_PAUSE_SECS)),
            send_timeout: Duration::from_secs(env_or(
                "CAMPAIGN_SEND_TIMEOUT_SECS",
                DEFAULT_SEND_TIMEOUT_SECS,
            )),
        }
    }
}

/// Configuración del scheduler de campañas diferidas.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Máximo adelanto permitido al programar
    pub max_horizon: ChronoDuration,
    /// Retraso tolerado para un job vencido antes de descartarlo
    pub misfire_grace: ChronoDuration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            max_horizon: ChronoDuration::days(DEFAULT_MAX_HORIZON_DAYS),
            misfire_grace: ChronoDuration::seconds(DEFAULT_MISFIRE_GRACE_SECS),
        }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        SchedulerConfig {
            max_horizon: ChronoDuration::days(
                env_or("CAMPAIGN_MAX_HORIZON_DAYS", DEFAULT_MAX_HORIZON_DAYS).max(1),
            ),
            misfire_grace: ChronoDuration::seconds(
                env_or("CAMPAIGN_MISFIRE_GRACE_SECS", DEFAULT_MISFIRE_GRACE_SECS).max(0),
            ),
        }
    }
}
