//! tests/support.rs
//! Dobles de prueba: transporte que registra envíos y reloj manual.

use std::{
    collections::HashSet,
    path::Path,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::{
    clock::Clock,
    config::dispatch_config::{DispatchConfig, SchedulerConfig},
    models::{campaign_model::CampaignRequest, email_model::OutgoingMessage},
    services::{
        attachment_service::AttachmentService, campaign_service::CampaignService,
        dispatch_service::DispatchService, email_service::MailTransport,
        scheduler_service::SchedulerService,
    },
};

#[derive(Default)]
pub struct RecordingTransport {
    fail_for: HashSet<String>,
    panic_for: HashSet<String>,
    delay: Duration,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    sent: Mutex<Vec<String>>,
    attachment_counts: Mutex<Vec<usize>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(mut self, recipients: &[&str]) -> Self {
        self.fail_for = recipients.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn panicking(mut self, recipients: &[&str]) -> Self {
        self.panic_for = recipients.iter().map(|r| r.to_string()).collect();
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Destinatarios enviados con éxito, en orden de finalización.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    pub fn attachment_counts(&self) -> Vec<usize> {
        self.attachment_counts.lock().unwrap().clone()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, recipient: &str, message: &OutgoingMessage) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.panic_for.contains(recipient) {
            panic!("transport exploded for {recipient}");
        }

        let now_in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now_in_flight, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        self.attachment_counts
            .lock()
            .unwrap()
            .push(message.attachments.len());

        if self.fail_for.contains(recipient) {
            return Err(anyhow!("mailbox unavailable"));
        }
        self.sent.lock().unwrap().push(recipient.to_string());
        Ok(())
    }
}

/// Reloj que sólo avanza cuando el test lo pide.
pub struct ManualClock(Mutex<DateTime<Utc>>);

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock(Mutex::new(start))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock().unwrap()
    }
}

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Pausas y timeouts cortos para que los tests no tarden.
pub fn fast_config(batch_size: usize) -> DispatchConfig {
    DispatchConfig {
        batch_size,
        max_workers: 3,
        pause: Duration::from_millis(10),
        send_timeout: Duration::from_secs(2),
    }
}

pub fn recipients(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("user{i}@example.com")).collect()
}

pub fn request(count: usize) -> CampaignRequest {
    CampaignRequest {
        subject: "Novedades de marzo".to_string(),
        body: "<h1>Hola</h1><p>Tenemos novedades.</p>".to_string(),
        recipients: recipients(count),
        attachments: Default::default(),
        scheduled_at: None,
    }
}

/// Crea un archivo de adjunto en `dir` y devuelve su ruta.
pub fn write_attachment(dir: &Path, name: &str, contents: &[u8]) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

pub fn dispatcher(
    transport: Arc<RecordingTransport>,
    config: DispatchConfig,
    dir: &Path,
    clock: Arc<dyn Clock>,
) -> DispatchService {
    DispatchService::new(transport, AttachmentService::new(dir), config, clock)
}

pub fn scheduler(
    transport: Arc<RecordingTransport>,
    dir: &Path,
    clock: Arc<dyn Clock>,
) -> SchedulerService {
    SchedulerService::new(
        dispatcher(transport, fast_config(50), dir, clock.clone()),
        CampaignService::new(),
        SchedulerConfig::default(),
        clock,
        tokio::runtime::Handle::current(),
    )
}
