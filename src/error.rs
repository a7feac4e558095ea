//! error.rs
//! Errores de dominio para campañas (validación, precondiciones, misfire).

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum CampaignError {
    /// Falta configuración del transporte (credenciales SMTP, remitente...).
    #[error("{0}")]
    Configuration(String),

    #[error("recipient list is empty")]
    EmptyRecipients,

    /// Subject o body vacíos.
    #[error("missing required field: {0}")]
    MissingContent(&'static str),

    #[error("scheduled time must be in the future")]
    ScheduleNotInFuture,

    #[error("schedule time cannot be more than {max_days} days in the future")]
    ScheduleBeyondHorizon { max_days: i64 },

    #[error("campaign {0} is already scheduled")]
    DuplicateCampaign(Uuid),

    /// Precondición fallida: algún adjunto ya no existe al momento del envío.
    #[error("Missing attachments: {}", names.join(", "))]
    MissingAttachments { names: Vec<String> },

    /// El job programado no pudo ejecutarse dentro de la ventana de gracia.
    #[error("missed schedule: job ran {late_by_secs}s after its due time")]
    Misfire { late_by_secs: i64 },

    /// La tarea que ejecutaba la corrida terminó sin resultado (panic).
    #[error("campaign run aborted: {0}")]
    RunAborted(String),

    #[error("campaign {0} not found")]
    NotFound(Uuid),

    #[error("invalid attachment: {0}")]
    InvalidAttachment(String),

    #[error("attachment I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CampaignError {
    /// Errores que se rechazan de forma síncrona al enviar la campaña.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CampaignError::EmptyRecipients
                | CampaignError::MissingContent(_)
                | CampaignError::ScheduleNotInFuture
                | CampaignError::ScheduleBeyondHorizon { .. }
                | CampaignError::DuplicateCampaign(_)
                | CampaignError::InvalidAttachment(_)
        )
    }
}
