//! services/mod.rs
//! Módulo que agrupa distintos "servicios" o "capas de negocio" de la app.

pub mod attachment_service;
pub mod campaign_service;
pub mod dispatch_service;
pub mod email_service;
pub mod scheduler_service;
