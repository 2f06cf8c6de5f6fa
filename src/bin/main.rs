use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use trellis::config::Config;
use trellis::core::db::{connect, seed_demo_data};
use trellis::AppState;

fn init_logging() {
    // `init` also installs the log bridge, so actix's Logger lines land here too
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .init();
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    init_logging();

    let config = Config::from_env();
    if config.uses_default_secret() {
        warn!("TRELLIS_SECRET_KEY is not set, using the built-in development secret");
    }
    let repo = connect(&config).await?;
    if config.seed_demo {
        seed_demo_data(repo.as_ref()).await?;
    }

    let bind_address = config.bind_address.clone();
    let api_prefix = config.api_url_prefix.clone();
    let state = web::Data::new(AppState::new(config, repo));

    info!("Server listening on http://{}", bind_address);

    HttpServer::new(move || {
        let api_prefix = api_prefix.clone();
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default())
            .configure(move |cfg| trellis::configure(cfg, &api_prefix))
    })
    .bind(&bind_address)?
    .run()
    .await?;

    Ok(())
}
