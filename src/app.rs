//! app.rs
use crate::handlers::campaign_handler;
use actix_web::web;

pub fn init_app(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api").service(
            web::scope("/campaigns")
                .route(
                    "",
                    web::post().to(campaign_handler::create_campaign_endpoint),
                )
                .route(
                    "",
                    web::get().to(campaign_handler::list_campaigns_endpoint),
                )
                .route(
                    "/active",
                    web::get().to(campaign_handler::list_active_endpoint),
                )
                .route(
                    "/{id}",
                    web::get().to(campaign_handler::get_campaign_endpoint),
                )
                .route(
                    "/{id}",
                    web::delete().to(campaign_handler::cancel_campaign_endpoint),
                ),
        ),
    );
}
