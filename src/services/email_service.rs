//! services/email_service.rs
//! Transporte SMTP: envía un mensaje a un único destinatario.

use anyhow::{Context, Result};
use async_trait::async_trait;
use lettre::{
    message::{
        header::{ContentDisposition, ContentType},
        Body, Mailbox, MultiPart, SinglePart,
    },
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::{config::smtp_config::SmtpConfig, models::email_model::OutgoingMessage};

/// Contrato que consume el despachador. Debe poder invocarse en paralelo
/// desde varios workers; cualquier `Err` cuenta como envío fallido.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, recipient: &str, message: &OutgoingMessage) -> Result<()>;
}

#[derive(Clone)]
pub struct EmailService {
    from: Mailbox,
    mailer: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailService {
    /// Construye el transporte una sola vez; lettre mantiene un pool de
    /// conexiones que se reutiliza entre workers.
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        let from: Mailbox = config
            .from_email
            .parse()
            .context("Invalid SMTP_FROM_EMAIL address")?;

        let tls = if config.use_ssl {
            Tls::Wrapper(TlsParameters::new(config.host.clone())?)
        } else if config.use_tls {
            Tls::Required(TlsParameters::new(config.host.clone())?)
        } else {
            Tls::None
        };

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
            .port(config.port)
            .credentials(Credentials::new(
                config.username.clone(),
                config.password.clone(),
            ))
            .tls(tls)
            .build();

        log::info!(
            "(EmailService::new) SMTP host={}:{}, user={}",
            config.host,
            config.port,
            config.username
        );

        Ok(Self { from, mailer })
    }

    fn build_message(&self, recipient: &str, message: &OutgoingMessage) -> Result<Message> {
        let to: Mailbox = recipient
            .parse()
            .with_context(|| format!("Invalid recipient address '{recipient}'"))?;

        // Cuerpo en HTML
        let html_part = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(message.body.clone());

        let mut multipart = MultiPart::mixed().singlepart(html_part);

        for attach in &message.attachments {
            let part = SinglePart::builder()
                .header(
                    ContentType::parse(&attach.content_type)
                        .with_context(|| format!("Invalid content type for {}", attach.filename))?,
                )
                .header(ContentDisposition::attachment(&attach.filename))
                .body(Body::new(attach.data.clone()));
            multipart = multipart.singlepart(part);
        }

        Message::builder()
            .from(self.from.clone())
            .to(to)
            .subject(&message.subject)
            .multipart(multipart)
            .context("Failed to build email message")
    }
}

#[async_trait]
impl MailTransport for EmailService {
    async fn send(&self, recipient: &str, message: &OutgoingMessage) -> Result<()> {
        let email = self.build_message(recipient, message)?;
        self.mailer
            .send(email)
            .await
            .with_context(|| format!("SMTP send to {recipient} failed"))?;
        log::debug!("(EmailService::send) Enviado a {}", recipient);
        Ok(())
    }
}
