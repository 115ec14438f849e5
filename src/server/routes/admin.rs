//! Diagnostic admin routes: `/state`, `/active-requests` (spec §4.8, §6)

use crate::server::state::AppState;
use crate::utils::error::{ProxyError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct ActiveRequestsQuery {
    node_id: Option<String>,
}

pub async fn state(state: web::Data<AppState>) -> Result<HttpResponse> {
    let snapshot = state.manager.get_state().await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn active_requests(
    state: web::Data<AppState>,
    query: web::Query<ActiveRequestsQuery>,
) -> Result<HttpResponse> {
    let node_id = match &query.node_id {
        Some(raw) => Some(
            raw.parse::<i32>()
                .map_err(|_| ProxyError::invalid_request("node_id must be an integer"))?,
        ),
        None => None,
    };

    let snapshot = state.manager.get_active_requests(node_id).await?;
    Ok(HttpResponse::Ok().json(snapshot))
}

pub async fn metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(state.manager.metrics().render())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/state", web::get().to(state))
        .route("/active-requests", web::get().to(active_requests))
        .route("/metrics", web::get().to(metrics));
}
