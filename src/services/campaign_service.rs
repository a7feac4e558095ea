//! services/campaign_service.rs
//! Registro en memoria de campañas y su último estado conocido.
//! Vive lo que vive el proceso; no hay persistencia.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::campaign_model::{
    Campaign, CampaignResult, CampaignStatus, CampaignSummary,
};

#[derive(Clone, Default)]
pub struct CampaignService {
    campaigns: Arc<DashMap<Uuid, Campaign>>,
}

impl CampaignService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta la campaña si el id está libre. Devuelve false si ya existía.
    pub fn insert(&self, campaign: Campaign) -> bool {
        match self.campaigns.entry(campaign.id) {
            dashmap::mapref::entry::Entry::Occupied(_) => false,
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(campaign);
                true
            }
        }
    }

    pub fn get(&self, id: &Uuid) -> Option<Campaign> {
        self.campaigns.get(id).map(|entry| entry.value().clone())
    }

    pub fn mark_running(&self, id: &Uuid, started_at: DateTime<Utc>) {
        if let Some(mut campaign) = self.campaigns.get_mut(id) {
            campaign.status = CampaignStatus::Running;
            campaign.started_at = Some(started_at);
        }
    }

    pub fn update_progress(&self, id: &Uuid, processed: usize) {
        if let Some(mut campaign) = self.campaigns.get_mut(id) {
            campaign.processed = processed;
        }
    }

    /// Guarda el resultado una sola vez; una campaña terminal no se reescribe.
    pub fn mark_completed(&self, id: &Uuid, result: CampaignResult) {
        if let Some(mut campaign) = self.campaigns.get_mut(id) {
            if campaign.status.is_terminal() {
                log::warn!(
                    "(mark_completed) Campaña {} ya estaba en estado {:?}",
                    id,
                    campaign.status
                );
                return;
            }
            campaign.processed = result.total_recipients;
            campaign.status = CampaignStatus::Completed;
            campaign.result = Some(result);
        }
    }

    pub fn mark_failed(&self, id: &Uuid, error: &str) {
        self.finish(id, CampaignStatus::Failed, Some(error));
    }

    pub fn mark_cancelled(&self, id: &Uuid) {
        self.finish(id, CampaignStatus::Cancelled, None);
    }

    fn finish(&self, id: &Uuid, status: CampaignStatus, error: Option<&str>) {
        if let Some(mut campaign) = self.campaigns.get_mut(id) {
            if campaign.status.is_terminal() {
                return;
            }
            campaign.status = status;
            campaign.error = error.map(str::to_string);
        }
    }

    /// Ids de campañas Scheduled o Running.
    pub fn active_ids(&self) -> Vec<Uuid> {
        self.campaigns
            .iter()
            .filter(|entry| entry.status.is_active())
            .map(|entry| *entry.key())
            .collect()
    }

    /// Todas las campañas, más recientes primero.
    pub fn list(&self) -> Vec<CampaignSummary> {
        let mut items: Vec<CampaignSummary> = self
            .campaigns
            .iter()
            .map(|entry| CampaignSummary::from(entry.value()))
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}
