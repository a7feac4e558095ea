//! services/scheduler_service.rs
//! Ciclo de vida de campañas: envío inmediato o diferido a una fecha futura,
//! consulta de campañas activas y cancelación antes de que venzan.

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use dashmap::{mapref::entry::Entry, DashMap};
use tokio::{runtime::Handle, sync::oneshot};
use uuid::Uuid;

use crate::{
    clock::Clock,
    config::dispatch_config::SchedulerConfig,
    error::CampaignError,
    models::campaign_model::{Campaign, CampaignRequest, CampaignResult},
    services::{campaign_service::CampaignService, dispatch_service::DispatchService},
};

#[derive(Clone)]
pub struct SchedulerService {
    dispatcher: DispatchService,
    campaigns: CampaignService,
    config: SchedulerConfig,
    clock: Arc<dyn Clock>,
    /// Jobs diferidos que todavía no arrancaron. Quien haga `remove` primero
    /// (el timer al vencer o `cancel`) se queda con la campaña.
    jobs: Arc<DashMap<Uuid, oneshot::Sender<()>>>,
    /// Runtime de fondo donde corren los jobs diferidos
    runtime: Handle,
}

impl SchedulerService {
    pub fn new(
        dispatcher: DispatchService,
        campaigns: CampaignService,
        config: SchedulerConfig,
        clock: Arc<dyn Clock>,
        runtime: Handle,
    ) -> Self {
        Self {
            dispatcher,
            campaigns,
            config,
            clock,
            jobs: Arc::new(DashMap::new()),
            runtime,
        }
    }

    pub fn campaigns(&self) -> &CampaignService {
        &self.campaigns
    }

    pub fn campaign(&self, id: &Uuid) -> Option<Campaign> {
        self.campaigns.get(id)
    }

    // ----------------------------------------------------------------
    // Envío diferido
    // ----------------------------------------------------------------

    pub fn schedule_at(
        &self,
        request: CampaignRequest,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Uuid, CampaignError> {
        self.schedule_at_with_id(Uuid::new_v4(), request, scheduled_at)
    }

    /// Registra un job de un solo disparo para `scheduled_at`.
    pub fn schedule_at_with_id(
        &self,
        id: Uuid,
        mut request: CampaignRequest,
        scheduled_at: DateTime<Utc>,
    ) -> Result<Uuid, CampaignError> {
        validate_request(&request)?;
        self.validate_schedule(scheduled_at)?;

        request.scheduled_at = Some(scheduled_at);
        let request = Arc::new(request);
        let (cancel_tx, cancel_rx) = oneshot::channel();

        match self.jobs.entry(id) {
            Entry::Occupied(_) => return Err(CampaignError::DuplicateCampaign(id)),
            Entry::Vacant(slot) => {
                let campaign = Campaign::new(id, Arc::clone(&request), self.clock.now());
                if !self.campaigns.insert(campaign) {
                    return Err(CampaignError::DuplicateCampaign(id));
                }
                slot.insert(cancel_tx);
            }
        }

        log::info!(
            "(schedule_at) Campaña {} programada para {} ({} destinatarios, {} adjuntos)",
            id,
            scheduled_at.to_rfc3339(),
            request.recipients.len(),
            request.attachments.len()
        );

        let this = self.clone();
        self.runtime
            .spawn(async move { this.run_scheduled(id, request, scheduled_at, cancel_rx).await });

        Ok(id)
    }

    async fn run_scheduled(
        self,
        id: Uuid,
        request: Arc<CampaignRequest>,
        due: DateTime<Utc>,
        cancel_rx: oneshot::Receiver<()>,
    ) {
        let delay = (due - self.clock.now()).to_std().unwrap_or(Duration::ZERO);

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = cancel_rx => {
                log::info!("(run_scheduled) Campaña {} cancelada antes de vencer", id);
                return;
            }
        }

        if self.jobs.remove(&id).is_none() {
            // cancel() ganó la carrera
            return;
        }

        let late_by = self.clock.now() - due;
        if late_by > self.config.misfire_grace {
            let err = CampaignError::Misfire {
                late_by_secs: late_by.num_seconds(),
            };
            log::error!("(run_scheduled) Campaña {} descartada: {}", id, err);
            self.campaigns.mark_failed(&id, &err.to_string());
            self.dispatcher.discard_attachments(&request).await;
            return;
        }

        log::info!("(run_scheduled) Iniciando campaña programada {}", id);
        // Nadie espera este resultado: queda registrado en la campaña
        let _ = self.execute(id, &request).await;
    }

    // ----------------------------------------------------------------
    // Envío inmediato
    // ----------------------------------------------------------------

    pub async fn run_now(&self, request: CampaignRequest) -> Result<CampaignResult, CampaignError> {
        self.run_now_with_id(Uuid::new_v4(), request).await
    }

    /// Pending -> Running -> Completed/Failed. El llamador espera el resultado,
    /// pero la corrida vive en el runtime: si el llamador se cae, termina igual.
    pub async fn run_now_with_id(
        &self,
        id: Uuid,
        request: CampaignRequest,
    ) -> Result<CampaignResult, CampaignError> {
        let request = self.register_pending(id, request)?;

        let this = self.clone();
        let run = self
            .runtime
            .spawn(async move { this.execute(id, &request).await });

        match run.await {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = CampaignError::RunAborted(e.to_string());
                log::error!("(run_now) Campaña {} abortada: {}", id, err);
                self.campaigns.mark_failed(&id, &err.to_string());
                Err(err)
            }
        }
    }

    /// Igual que `run_now` pero en segundo plano; devuelve el id al instante.
    pub fn spawn_now(&self, id: Uuid, request: CampaignRequest) -> Result<Uuid, CampaignError> {
        let request = self.register_pending(id, request)?;

        let this = self.clone();
        self.runtime.spawn(async move {
            let _ = this.execute(id, &request).await;
        });

        Ok(id)
    }

    fn register_pending(
        &self,
        id: Uuid,
        mut request: CampaignRequest,
    ) -> Result<Arc<CampaignRequest>, CampaignError> {
        validate_request(&request)?;
        request.scheduled_at = None;

        let request = Arc::new(request);
        let campaign = Campaign::new(id, Arc::clone(&request), self.clock.now());
        if !self.campaigns.insert(campaign) {
            return Err(CampaignError::DuplicateCampaign(id));
        }

        log::info!(
            "(run_now) Campaña {} aceptada ({} destinatarios)",
            id,
            request.recipients.len()
        );
        Ok(request)
    }

    async fn execute(
        &self,
        id: Uuid,
        request: &CampaignRequest,
    ) -> Result<CampaignResult, CampaignError> {
        self.campaigns.mark_running(&id, self.clock.now());

        let campaigns = self.campaigns.clone();
        let outcome = self
            .dispatcher
            .dispatch_with_progress(request, move |progress| {
                campaigns.update_progress(&id, progress.processed)
            })
            .await;

        match &outcome {
            Ok(result) => {
                log::info!(
                    "(execute) Campaña {} completada: {} enviados, {} fallidos",
                    id,
                    result.sent_count,
                    result.failed_count
                );
                self.campaigns.mark_completed(&id, result.clone());
            }
            Err(e) => {
                log::error!("(execute) Campaña {} fallida: {}", id, e);
                self.campaigns.mark_failed(&id, &e.to_string());
            }
        }

        outcome
    }

    // ----------------------------------------------------------------
    // Consulta y cancelación
    // ----------------------------------------------------------------

    /// Campañas Scheduled o Running.
    pub fn list_active(&self) -> Vec<Uuid> {
        self.campaigns.active_ids()
    }

    /// Sólo se puede cancelar un job que todavía no venció.
    pub async fn cancel(&self, id: Uuid) -> Result<(), CampaignError> {
        let (_, cancel_tx) = self.jobs.remove(&id).ok_or(CampaignError::NotFound(id))?;
        let _ = cancel_tx.send(());
        self.campaigns.mark_cancelled(&id);

        if let Some(campaign) = self.campaigns.get(&id) {
            self.dispatcher.discard_attachments(&campaign.request).await;
        }

        log::info!("(cancel) Campaña {} cancelada", id);
        Ok(())
    }

    fn validate_schedule(&self, scheduled_at: DateTime<Utc>) -> Result<(), CampaignError> {
        let now = self.clock.now();
        if scheduled_at <= now {
            return Err(CampaignError::ScheduleNotInFuture);
        }
        if scheduled_at - now > self.config.max_horizon {
            return Err(CampaignError::ScheduleBeyondHorizon {
                max_days: self.config.max_horizon.num_days(),
            });
        }
        Ok(())
    }
}

/// Destinatarios, asunto y cuerpo son obligatorios.
fn validate_request(request: &CampaignRequest) -> Result<(), CampaignError> {
    if request.recipients.is_empty() {
        return Err(CampaignError::EmptyRecipients);
    }
    if request.subject.trim().is_empty() {
        return Err(CampaignError::MissingContent("subject"));
    }
    if request.body.trim().is_empty() {
        return Err(CampaignError::MissingContent("body"));
    }
    Ok(())
}
