use actix_web::web;
use std::sync::Arc;

pub mod config;
pub mod token;
pub mod resources;
pub mod auth;
pub mod users;
pub mod posts;
pub mod comments;
pub mod handlers;
pub mod templates;
pub mod static_server;

pub mod core {
    pub mod db;
    pub mod errors;
    pub mod graph_memory;
    pub mod graph_neo4j;
    pub mod helpers;
}

pub mod models {
    pub mod models;
}

use crate::config::Config;
use crate::core::errors::ApiError;
use crate::core::db::Repository;
use crate::resources::Links;
use crate::token::TokenCodec;

/// Shared by every worker; built once at startup.
pub struct AppState {
    pub repo: Arc<dyn Repository>,
    pub tokens: TokenCodec,
    pub links: Links,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config, repo: Arc<dyn Repository>) -> Self {
        Self {
            tokens: TokenCodec::new(&config.secret_key, config.auth_token_duration_seconds),
            links: Links::new(&config.api_url_prefix),
            repo,
            config,
        }
    }
}

/// Malformed or mistyped JSON bodies answer with the usual `{"error": ..}` body.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid request body: {}", err)).into()
    })
}

/// Registers the frontend pages and the API scope. Pages go first so that an
/// empty API prefix cannot shadow them.
pub fn configure(cfg: &mut web::ServiceConfig, api_prefix: &str) {
    cfg.app_data(json_config())
        .service(templates::index_page)
        .service(templates::login_page)
        .service(templates::register_page)
        .service(static_server::serve_static)
        .service(handlers::api_scope(api_prefix));
}
