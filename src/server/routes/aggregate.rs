//! Cross-node routes: `/tags`, `/ps`, `/pull` (spec §4.7, §6)

use crate::server::state::AppState;
use crate::utils::error::{ProxyError, Result};
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
pub struct TagsQuery {
    node_id: Option<i32>,
}

/// `GET /tags`: aggregates across every node; `node_id` is not a valid
/// scoping parameter here since node selection is the proxy's responsibility.
pub async fn tags(state: web::Data<AppState>, query: web::Query<TagsQuery>) -> Result<HttpResponse> {
    if query.node_id.is_some() {
        return Err(ProxyError::invalid_request("node_id is not allowed on /tags"));
    }
    let models = state.manager.tags().await?;
    Ok(HttpResponse::Ok().json(json!({ "models": models })))
}

pub async fn ps(state: web::Data<AppState>) -> Result<HttpResponse> {
    let models = state.manager.ps().await?;
    Ok(HttpResponse::Ok().json(json!({ "models": models })))
}

#[derive(Deserialize)]
pub struct PullRequest {
    model: String,
    node_id: Option<i32>,
    #[serde(default)]
    stream: bool,
    #[serde(default)]
    insecure: bool,
}

pub async fn pull(state: web::Data<AppState>, body: web::Json<PullRequest>) -> Result<HttpResponse> {
    let body = body.into_inner();
    let results = state
        .manager
        .pull(&body.model, body.node_id, body.stream, body.insecure)
        .await?;
    let total_nodes = results.len();
    Ok(HttpResponse::Ok().json(json!({
        "results": results,
        "model": body.model,
        "total_nodes": total_nodes,
    })))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/tags", web::get().to(tags))
        .route("/ps", web::get().to(ps))
        .route("/pull", web::post().to(pull));
}
