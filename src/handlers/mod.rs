//! handlers/mod.rs
pub mod campaign_handler;
