//! services/dispatch_service.rs
//! Envío de una campaña por lotes: concurrencia acotada dentro de cada lote,
//! pausa entre lotes y conteo de resultados por destinatario.

use std::{sync::Arc, time::Duration};

use futures_util::future::join_all;
use tokio::{sync::Semaphore, time::timeout};

use crate::{
    clock::Clock,
    config::dispatch_config::DispatchConfig,
    error::CampaignError,
    models::{
        campaign_model::{BatchProgress, CampaignRequest, CampaignResult, RecipientOutcome},
        email_model::{EmailAttachment, OutgoingMessage},
    },
    services::{attachment_service::AttachmentService, email_service::MailTransport},
};

#[derive(Clone)]
pub struct DispatchService {
    transport: Arc<dyn MailTransport>,
    attachments: AttachmentService,
    config: DispatchConfig,
    clock: Arc<dyn Clock>,
}

/// Lotes consecutivos de `batch_size` respetando el orden; el último puede ser menor.
pub fn partition(recipients: &[String], batch_size: usize) -> Vec<&[String]> {
    recipients.chunks(batch_size.max(1)).collect()
}

impl DispatchService {
    pub fn new(
        transport: Arc<dyn MailTransport>,
        attachments: AttachmentService,
        config: DispatchConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            attachments,
            config,
            clock,
        }
    }

    pub async fn dispatch(&self, request: &CampaignRequest) -> Result<CampaignResult, CampaignError> {
        self.dispatch_with_progress(request, |_| {}).await
    }

    /// Corre la campaña completa. Sólo una precondición (adjuntos) aborta la
    /// corrida; los fallos por destinatario se cuentan y se sigue.
    pub async fn dispatch_with_progress<F>(
        &self,
        request: &CampaignRequest,
        mut on_batch: F,
    ) -> Result<CampaignResult, CampaignError>
    where
        F: FnMut(&BatchProgress) + Send,
    {
        let total = request.recipients.len();
        log::info!(
            "(dispatch) Iniciando envío: {} destinatarios, {} adjuntos",
            total,
            request.attachments.len()
        );

        // 1) Precondición: adjuntos presentes y legibles
        let loaded = match self.prepare_attachments(request).await {
            Ok(loaded) => loaded,
            Err(e) => {
                log::error!("(dispatch) Precondición fallida, no se envía nada: {}", e);
                self.attachments.cleanup(&request.attachments).await;
                return Err(e);
            }
        };

        let message = Arc::new(OutgoingMessage {
            subject: request.subject.clone(),
            body: request.body.clone(),
            attachments: loaded,
        });

        // 2) Lotes en orden, uno detrás de otro
        let batches = partition(&request.recipients, self.config.batch_size);
        let batch_count = batches.len();
        let mut sent = 0;
        let mut failed = 0;
        let mut failures = Vec::new();
        let mut processed = 0;

        for (batch_index, batch) in batches.into_iter().enumerate() {
            let outcomes = self.send_batch(batch, &message).await;

            for outcome in outcomes {
                if outcome.success {
                    sent += 1;
                } else {
                    failed += 1;
                    failures.push(outcome);
                }
            }
            processed += batch.len();

            let pause_follows = batch_index + 1 < batch_count;
            log::info!("(dispatch) Progreso: {}/{} procesados", processed, total);
            on_batch(&BatchProgress {
                batch_index,
                batch_count,
                batch_size: batch.len(),
                processed,
                total,
                sent,
                failed,
                pause_follows,
            });

            // 3) Pausa entre lotes, nunca después del último
            if pause_follows && !self.config.pause.is_zero() {
                log::info!("(dispatch) Pausa de {:?} antes del siguiente lote", self.config.pause);
                tokio::time::sleep(self.config.pause).await;
            }
        }

        // 4) Adjuntos fuera, una sola vez
        self.attachments.cleanup(&request.attachments).await;

        log::info!("(dispatch) Resultado: {} enviados, {} fallidos", sent, failed);

        Ok(CampaignResult {
            sent_count: sent,
            failed_count: failed,
            total_recipients: total,
            completed_at: self.clock.now(),
            failures,
        })
    }

    /// Para campañas que ya no van a correr (canceladas o descartadas por misfire).
    pub async fn discard_attachments(&self, request: &CampaignRequest) {
        self.attachments.cleanup(&request.attachments).await;
    }

    async fn prepare_attachments(
        &self,
        request: &CampaignRequest,
    ) -> Result<Vec<EmailAttachment>, CampaignError> {
        if request.attachments.is_empty() {
            return Ok(Vec::new());
        }
        self.attachments.validate(&request.attachments).await?;
        self.attachments.load(&request.attachments).await
    }

    /// Un task por destinatario; el semáforo limita cuántos envían a la vez.
    /// Devuelve un outcome por destinatario, en el orden del lote.
    async fn send_batch(
        &self,
        batch: &[String],
        message: &Arc<OutgoingMessage>,
    ) -> Vec<RecipientOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers.max(1)));

        let handles: Vec<_> = batch
            .iter()
            .map(|recipient| {
                let semaphore = Arc::clone(&semaphore);
                let transport = Arc::clone(&self.transport);
                let message = Arc::clone(message);
                let recipient = recipient.clone();
                let send_timeout = self.config.send_timeout;

                tokio::spawn(async move {
                    let _permit = match semaphore.acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            return RecipientOutcome::failed(recipient, "worker pool closed")
                        }
                    };
                    send_one(transport.as_ref(), &recipient, &message, send_timeout).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(batch)
            .map(|(joined, recipient)| match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("(send_batch) Task de envío a {} abortado: {}", recipient, e);
                    RecipientOutcome::failed(recipient.as_str(), format!("send task aborted: {e}"))
                }
            })
            .collect()
    }
}

async fn send_one(
    transport: &dyn MailTransport,
    recipient: &str,
    message: &OutgoingMessage,
    send_timeout: Duration,
) -> RecipientOutcome {
    match timeout(send_timeout, transport.send(recipient, message)).await {
        Ok(Ok(())) => RecipientOutcome::sent(recipient),
        Ok(Err(e)) => {
            log::warn!("(send_one) Error enviando a {}: {:#}", recipient, e);
            RecipientOutcome::failed(recipient, format!("{e:#}"))
        }
        Err(_) => {
            log::warn!(
                "(send_one) Timeout enviando a {} ({}s)",
                recipient,
                send_timeout.as_secs()
            );
            RecipientOutcome::failed(
                recipient,
                format!("send timed out after {}s", send_timeout.as_secs()),
            )
        }
    }
}
