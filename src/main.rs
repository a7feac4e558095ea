use std::sync::Arc;

use actix_web::{web, App, HttpServer};
use dotenv::dotenv;

use crate::clock::{Clock, SystemClock};
use crate::config::dispatch_config::{DispatchConfig, SchedulerConfig};
use crate::config::server_config::ServerConfig;
use crate::config::smtp_config::SmtpConfig;
use crate::logger::init_logger;
use crate::services::attachment_service::AttachmentService;
use crate::services::campaign_service::CampaignService;
use crate::services::dispatch_service::DispatchService;
use crate::services::email_service::{EmailService, MailTransport};
use crate::services::scheduler_service::SchedulerService;

mod app;
mod clock;
mod config;
mod error;
mod handlers;
mod logger;
mod models;
mod services;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok(); // Cargar .env al inicio
    init_logger();

    // Sin credenciales SMTP no arrancamos: nada se despacha a medias
    let smtp_config = SmtpConfig::from_env().map_err(|e| {
        log::error!("{}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
    })?;
    let email_service = EmailService::new(&smtp_config).map_err(|e| {
        log::error!("No se pudo inicializar el transporte SMTP: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let server_config = ServerConfig::from_env();
    let dispatch_config = DispatchConfig::from_env();
    let scheduler_config = SchedulerConfig::from_env();
    log::info!(
        "Lotes de {} destinatarios, {} workers, pausa {:?}; horizonte {} días, gracia {}s",
        dispatch_config.batch_size,
        dispatch_config.max_workers,
        dispatch_config.pause,
        scheduler_config.max_horizon.num_days(),
        scheduler_config.misfire_grace.num_seconds()
    );

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let transport: Arc<dyn MailTransport> = Arc::new(email_service);
    let attachment_service = AttachmentService::new(server_config.attachment_dir.clone());
    let campaign_service = CampaignService::new();

    let dispatch_service = DispatchService::new(
        transport,
        attachment_service.clone(),
        dispatch_config,
        clock.clone(),
    );

    // Los jobs diferidos corren en el runtime principal, no en los workers HTTP
    let scheduler_service = SchedulerService::new(
        dispatch_service,
        campaign_service,
        scheduler_config,
        clock,
        tokio::runtime::Handle::current(),
    );

    log::info!(
        "Levantando servidor en {}:{}",
        server_config.host,
        server_config.port
    );
    HttpServer::new(move || {
        App::new()
            // Los adjuntos van en base64 dentro del JSON
            .app_data(web::JsonConfig::default().limit(32 * 1024 * 1024))
            .app_data(web::Data::new(attachment_service.clone()))
            .app_data(web::Data::new(scheduler_service.clone()))
            .configure(app::init_app)
    })
    .workers(1)
    .bind((server_config.host.as_str(), server_config.port))?
    .run()
    .await
}
