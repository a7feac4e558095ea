//! services/attachment_service.rs
//! Adjuntos de campañas: guardado al recibirlos, verificación justo antes de
//! cada corrida (todo o nada) y borrado al terminar.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::Arc,
};

use uuid::Uuid;

use crate::{
    error::CampaignError,
    models::email_model::{AttachmentUpload, EmailAttachment, DEFAULT_CONTENT_TYPE},
};

const ALLOWED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "txt", "png", "jpg", "jpeg", "gif", "xlsx", "xls", "zip", "rar",
];

#[derive(Debug, Clone)]
pub struct AttachmentService {
    storage_dir: Arc<PathBuf>,
}

impl AttachmentService {
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: Arc::new(storage_dir.into()),
        }
    }

    /// Guarda los adjuntos subidos como `<uuid>_<nombre>` y devuelve el mapa
    /// nombre -> ruta que viaja en el `CampaignRequest`.
    pub async fn store(
        &self,
        uploads: Vec<AttachmentUpload>,
    ) -> Result<BTreeMap<String, PathBuf>, CampaignError> {
        let mut stored = BTreeMap::new();
        if uploads.is_empty() {
            return Ok(stored);
        }

        tokio::fs::create_dir_all(self.storage_dir.as_path()).await?;

        for upload in uploads {
            let result = self.store_one(&stored, upload).await;
            match result {
                Ok((name, path)) => {
                    stored.insert(name, path);
                }
                Err(e) => {
                    // Lo que ya se escribió no lo va a borrar nadie más
                    self.cleanup(&stored).await;
                    return Err(e);
                }
            }
        }

        Ok(stored)
    }

    async fn store_one(
        &self,
        stored: &BTreeMap<String, PathBuf>,
        upload: AttachmentUpload,
    ) -> Result<(String, PathBuf), CampaignError> {
        let name = sanitize_filename(&upload.filename).ok_or_else(|| {
            CampaignError::InvalidAttachment(format!("invalid filename '{}'", upload.filename))
        })?;

        if !is_allowed(&name) {
            return Err(CampaignError::InvalidAttachment(format!(
                "file type not allowed: {name}"
            )));
        }
        if stored.contains_key(&name) {
            return Err(CampaignError::InvalidAttachment(format!(
                "duplicate attachment name: {name}"
            )));
        }

        let path = self
            .storage_dir
            .join(format!("{}_{}", Uuid::new_v4(), name));
        tokio::fs::write(&path, &upload.data).await?;
        log::debug!(
            "(store) Adjunto '{}' guardado en {:?} ({} bytes)",
            name,
            path,
            upload.data.len()
        );

        Ok((name, path))
    }

    /// Precondición de la corrida: todos los archivos deben seguir existiendo.
    pub async fn validate(
        &self,
        attachments: &BTreeMap<String, PathBuf>,
    ) -> Result<(), CampaignError> {
        let mut missing = Vec::new();
        for (name, path) in attachments {
            if !matches!(tokio::fs::try_exists(path).await, Ok(true)) {
                log::error!("(validate) Adjunto faltante al momento del envío: {:?}", path);
                missing.push(name.clone());
            }
        }

        if missing.is_empty() {
            Ok(())
        } else {
            Err(CampaignError::MissingAttachments { names: missing })
        }
    }

    /// Lee los bytes una vez por corrida; todos los destinatarios comparten el resultado.
    pub async fn load(
        &self,
        attachments: &BTreeMap<String, PathBuf>,
    ) -> Result<Vec<EmailAttachment>, CampaignError> {
        let mut loaded = Vec::with_capacity(attachments.len());
        for (name, path) in attachments {
            let data = match tokio::fs::read(path).await {
                Ok(data) => data,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(CampaignError::MissingAttachments {
                        names: vec![name.clone()],
                    })
                }
                Err(e) => return Err(e.into()),
            };
            loaded.push(EmailAttachment {
                filename: name.clone(),
                content_type: content_type_for(name).to_string(),
                data,
            });
        }
        Ok(loaded)
    }

    /// Borra los archivos de la campaña. Los errores sólo se registran.
    pub async fn cleanup(&self, attachments: &BTreeMap<String, PathBuf>) {
        for path in attachments.values() {
            match tokio::fs::remove_file(path).await {
                Ok(()) => log::debug!("(cleanup) Adjunto eliminado: {:?}", path),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => log::error!("(cleanup) Error eliminando adjunto {:?}: {}", path, e),
            }
        }
    }
}

/// Deja sólo el último componente de la ruta y caracteres seguros.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_whitespace() { '_' } else { c })
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();
    let cleaned = cleaned.trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}

fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

fn is_allowed(name: &str) -> bool {
    extension(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("pdf") => "application/pdf",
        Some("txt") => "text/plain",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("zip") => "application/zip",
        _ => DEFAULT_CONTENT_TYPE,
    }
}
