//! models/campaign_model.rs
//! Campañas: request inmutable, estado del ciclo de vida y resultado agregado.

use std::{collections::BTreeMap, path::PathBuf, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::email_model::AttachmentUpload;

/// Lo que el usuario envía. No se modifica una vez aceptado.
#[derive(Debug, Clone)]
pub struct CampaignRequest {
    pub subject: String,
    pub body: String,
    /// En el orden original; se permiten duplicados
    pub recipients: Vec<String>,
    /// nombre visible -> ruta en disco
    pub attachments: BTreeMap<String, PathBuf>,
    pub scheduled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampaignStatus {
    Pending,
    Scheduled,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl CampaignStatus {
    /// Scheduled o Running: lo que devuelve `list_active`.
    pub fn is_active(self) -> bool {
        matches!(self, CampaignStatus::Scheduled | CampaignStatus::Running)
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            CampaignStatus::Completed | CampaignStatus::Failed | CampaignStatus::Cancelled
        )
    }
}

#[derive(Debug, Clone)]
pub struct Campaign {
    pub id: Uuid,
    pub request: Arc<CampaignRequest>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Destinatarios ya procesados (se actualiza por lote)
    pub processed: usize,
    pub result: Option<CampaignResult>,
    pub error: Option<String>,
}

impl Campaign {
    pub fn new(id: Uuid, request: Arc<CampaignRequest>, created_at: DateTime<Utc>) -> Self {
        let status = if request.scheduled_at.is_some() {
            CampaignStatus::Scheduled
        } else {
            CampaignStatus::Pending
        };
        Campaign {
            id,
            request,
            status,
            created_at,
            started_at: None,
            processed: 0,
            result: None,
            error: None,
        }
    }
}

/// Resultado de una corrida. Invariante: sent_count + failed_count == total_recipients.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignResult {
    pub sent_count: usize,
    pub failed_count: usize,
    pub total_recipients: usize,
    pub completed_at: DateTime<Utc>,
    /// Sólo los destinatarios fallidos, con su error
    pub failures: Vec<RecipientOutcome>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipientOutcome {
    pub recipient: String,
    pub success: bool,
    pub error: Option<String>,
}

impl RecipientOutcome {
    pub fn sent(recipient: impl Into<String>) -> Self {
        RecipientOutcome {
            recipient: recipient.into(),
            success: true,
            error: None,
        }
    }

    pub fn failed(recipient: impl Into<String>, error: impl Into<String>) -> Self {
        RecipientOutcome {
            recipient: recipient.into(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Observación emitida al terminar cada lote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchProgress {
    /// Empieza en 0
    pub batch_index: usize,
    pub batch_count: usize,
    pub batch_size: usize,
    pub processed: usize,
    pub total: usize,
    pub sent: usize,
    pub failed: usize,
    /// true si después de este lote viene una pausa
    pub pause_follows: bool,
}

/// Vista serializable de una campaña para la API de estado.
#[derive(Debug, Clone, Serialize)]
pub struct CampaignSummary {
    pub id: Uuid,
    pub subject: String,
    pub recipient_count: usize,
    pub attachment_count: usize,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub status: CampaignStatus,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub processed: usize,
    pub result: Option<CampaignResult>,
    pub error: Option<String>,
}

impl From<&Campaign> for CampaignSummary {
    fn from(campaign: &Campaign) -> Self {
        CampaignSummary {
            id: campaign.id,
            subject: campaign.request.subject.clone(),
            recipient_count: campaign.request.recipients.len(),
            attachment_count: campaign.request.attachments.len(),
            scheduled_at: campaign.request.scheduled_at,
            status: campaign.status,
            created_at: campaign.created_at,
            started_at: campaign.started_at,
            processed: campaign.processed,
            result: campaign.result.clone(),
            error: campaign.error.clone(),
        }
    }
}

/// Body de POST /api/campaigns
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCampaignRequest {
    /// Si el cliente trae su propio id; si no, se genera uno
    pub campaign_id: Option<Uuid>,
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub attachments: Vec<AttachmentUpload>,
    pub scheduled_at: Option<DateTime<Utc>>,
    /// Envío inmediato pero en segundo plano
    #[serde(default)]
    pub async_send: bool,
}
