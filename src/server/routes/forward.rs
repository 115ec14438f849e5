//! Forwarding routes: `/generate`, `/chat`, `/embed`, `/embeddings` (spec §6)

use crate::server::state::AppState;
use crate::utils::error::Result;
use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::Value;

pub async fn generate(state: web::Data<AppState>, req: HttpRequest, body: web::Json<Value>) -> Result<HttpResponse> {
    state.manager.generate(&req, body.into_inner()).await
}

pub async fn chat(state: web::Data<AppState>, req: HttpRequest, body: web::Json<Value>) -> Result<HttpResponse> {
    state.manager.chat(&req, body.into_inner()).await
}

pub async fn embed(state: web::Data<AppState>, req: HttpRequest, body: web::Json<Value>) -> Result<HttpResponse> {
    state.manager.embed(&req, body.into_inner()).await
}

pub async fn embeddings(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Json<Value>,
) -> Result<HttpResponse> {
    state.manager.embeddings(&req, body.into_inner()).await
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/generate", web::post().to(generate))
        .route("/chat", web::post().to(chat))
        .route("/embed", web::post().to(embed))
        .route("/embeddings", web::post().to(embeddings));
}
