//! handlers/campaign_handler.rs
//! Endpoints JSON para enviar, programar, consultar y cancelar campañas.

use actix_web::{http::StatusCode, web, HttpResponse};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::CampaignError,
    models::campaign_model::{CampaignRequest, CampaignSummary, CreateCampaignRequest},
    services::{attachment_service::AttachmentService, scheduler_service::SchedulerService},
};

fn error_response(campaign_id: Option<Uuid>, e: &CampaignError) -> HttpResponse {
    let status_code = if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(e, CampaignError::NotFound(_)) {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };

    HttpResponse::build(status_code).json(json!({
        "success": false,
        "campaign_id": campaign_id,
        "error": e.to_string()
    }))
}

/// POST /api/campaigns
pub async fn create_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    attachment_service: web::Data<AttachmentService>,
    body: web::Json<CreateCampaignRequest>,
) -> HttpResponse {
    let req_data = body.into_inner();
    let campaign_id = req_data.campaign_id.unwrap_or_else(Uuid::new_v4);

    let stored = match attachment_service.store(req_data.attachments).await {
        Ok(stored) => stored,
        Err(e) => {
            log::error!("(create_campaign_endpoint) Error guardando adjuntos: {}", e);
            return error_response(None, &e);
        }
    };

    let request = CampaignRequest {
        subject: req_data.subject,
        body: req_data.body,
        recipients: req_data.recipients,
        attachments: stored.clone(),
        scheduled_at: req_data.scheduled_at,
    };

    // 1) Programada
    if let Some(scheduled_at) = req_data.scheduled_at {
        return match scheduler.schedule_at_with_id(campaign_id, request, scheduled_at) {
            Ok(id) => HttpResponse::Ok().json(json!({
                "success": true,
                "campaign_id": id,
                "status": "scheduled",
                "scheduled_at": scheduled_at
            })),
            Err(e) => {
                attachment_service.cleanup(&stored).await;
                error_response(None, &e)
            }
        };
    }

    // 2) Inmediata en segundo plano
    if req_data.async_send {
        return match scheduler.spawn_now(campaign_id, request) {
            Ok(id) => HttpResponse::Ok().json(json!({
                "success": true,
                "campaign_id": id,
                "status": "pending",
                "message": "Campaign queued for async processing"
            })),
            Err(e) => {
                attachment_service.cleanup(&stored).await;
                error_response(None, &e)
            }
        };
    }

    // 3) Inmediata: se espera el resultado
    match scheduler.run_now_with_id(campaign_id, request).await {
        Ok(result) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_id": campaign_id,
            "status": "completed",
            "result": result
        })),
        Err(e) => {
            // Si no llegó a correr, los adjuntos siguen en disco
            if e.is_validation() {
                attachment_service.cleanup(&stored).await;
                return error_response(None, &e);
            }
            log::error!("(create_campaign_endpoint) Campaña {} fallida: {}", campaign_id, e);
            error_response(Some(campaign_id), &e)
        }
    }
}

/// GET /api/campaigns
pub async fn list_campaigns_endpoint(scheduler: web::Data<SchedulerService>) -> HttpResponse {
    HttpResponse::Ok().json(scheduler.campaigns().list())
}

/// GET /api/campaigns/active
pub async fn list_active_endpoint(scheduler: web::Data<SchedulerService>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "active": scheduler.list_active() }))
}

/// GET /api/campaigns/{id}
pub async fn get_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    match scheduler.campaign(&id) {
        Some(campaign) => HttpResponse::Ok().json(CampaignSummary::from(&campaign)),
        None => error_response(Some(id), &CampaignError::NotFound(id)),
    }
}

/// DELETE /api/campaigns/{id}
pub async fn cancel_campaign_endpoint(
    scheduler: web::Data<SchedulerService>,
    path: web::Path<Uuid>,
) -> HttpResponse {
    let id = path.into_inner();
    match scheduler.cancel(id).await {
        Ok(()) => HttpResponse::Ok().json(json!({
            "success": true,
            "campaign_id": id,
            "status": "cancelled"
        })),
        Err(e) => error_response(Some(id), &e),
    }
}
