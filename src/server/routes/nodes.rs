//! Node CRUD routes (spec §4.8): create/update preflight-probe the node and
//! publish a refresh request so the leader reloads the pool promptly.

use crate::server::state::AppState;
use crate::utils::error::Result;
use actix_web::{web, HttpResponse};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct CreateNodeRequest {
    name: String,
    host: String,
    port: i32,
    active: Option<bool>,
}

#[derive(Deserialize)]
pub struct UpdateNodeRequest {
    name: Option<String>,
    host: Option<String>,
    port: Option<i32>,
    active: Option<bool>,
}

pub async fn list_nodes(state: web::Data<AppState>) -> Result<HttpResponse> {
    let nodes = state.manager.list_nodes().await?;
    Ok(HttpResponse::Ok().json(nodes))
}

pub async fn get_node(state: web::Data<AppState>, path: web::Path<i32>) -> Result<HttpResponse> {
    let node = state.manager.get_node(path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(node))
}

pub async fn create_node(state: web::Data<AppState>, body: web::Json<CreateNodeRequest>) -> Result<HttpResponse> {
    let body = body.into_inner();
    let node = state
        .manager
        .create_node(&body.name, &body.host, body.port, body.active)
        .await?;
    Ok(HttpResponse::Created().json(node))
}

pub async fn update_node(
    state: web::Data<AppState>,
    path: web::Path<i32>,
    body: web::Json<UpdateNodeRequest>,
) -> Result<HttpResponse> {
    let body = body.into_inner();
    let node = state
        .manager
        .update_node(path.into_inner(), body.name, body.host, body.port, body.active)
        .await?;
    Ok(HttpResponse::Ok().json(node))
}

pub async fn delete_node(state: web::Data<AppState>, path: web::Path<i32>) -> Result<HttpResponse> {
    state.manager.delete_node(path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/nodes")
            .route(web::get().to(list_nodes))
            .route(web::post().to(create_node)),
    )
    .service(
        web::resource("/nodes/{id}")
            .route(web::get().to(get_node))
            .route(web::put().to(update_node))
            .route(web::patch().to(update_node))
            .route(web::delete().to(delete_node)),
    );
}
