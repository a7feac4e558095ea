//! models/email_model.rs
//! Mensaje ya resuelto (asunto, HTML y bytes de adjuntos) que recibe el transporte.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Adjunto tal como llega en `POST /api/campaigns`. El tipo MIME no se
/// acepta del cliente: se deduce de la extensión al cargarlo.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentUpload {
    pub filename: String,
    #[serde(
        serialize_with = "serialize_base64",
        deserialize_with = "deserialize_base64"
    )]
    pub data: Vec<u8>,
}

/// Adjunto ya leído de disco, listo para el transporte.
#[derive(Debug, Clone)]
pub struct EmailAttachment {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

fn serialize_base64<S>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&base64::encode(data))
}

fn deserialize_base64<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    base64::decode(&s).map_err(serde::de::Error::custom)
}

/// Contenido común a todos los destinatarios de una corrida.
/// Se comparte entre workers detrás de un `Arc`, sin estado mutable.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub subject: String,
    /// HTML
    pub body: String,
    pub attachments: Vec<EmailAttachment>,
}
