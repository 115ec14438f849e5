//! `GET/PUT/PATCH /config` — the single `ProxyConfig` row (spec §4.8, §6)

use crate::config::Strategy;
use crate::server::state::AppState;
use crate::utils::error::{ProxyError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use std::str::FromStr;

#[derive(Deserialize)]
pub struct ConfigUpdate {
    strategy: Option<String>,
    weight: Option<f64>,
}

pub async fn get_config(state: web::Data<AppState>) -> Result<HttpResponse> {
    let config = state.manager.get_config().await?;
    Ok(HttpResponse::Ok().json(config))
}

pub async fn update_config(state: web::Data<AppState>, body: web::Json<ConfigUpdate>) -> Result<HttpResponse> {
    let body = body.into_inner();
    if let Some(strategy) = &body.strategy {
        Strategy::from_str(strategy)
            .map_err(|_| ProxyError::validation(format!("unknown strategy '{strategy}'")))?;
    }
    let config = state.manager.update_config(body.strategy, body.weight).await?;
    Ok(HttpResponse::Ok().json(config))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/config")
            .route(web::get().to(get_config))
            .route(web::put().to(update_config))
            .route(web::patch().to(update_config)),
    );
}
