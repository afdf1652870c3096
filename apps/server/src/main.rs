#![warn(clippy::all, clippy::pedantic)]

use std::env::var;
use std::net::SocketAddr;
use std::path::Path;

use actix_web::{App, HttpServer, web};
use tracing::info;
use trustmesh::Config;

mod error;
mod identity;
mod routes;
mod state;

use error::AppError;
use state::AppState;

const DEFAULT_BIND: &str = "0.0.0.0:8080";

/// Runtime environment first, then values baked in from `.env` at build time.
fn setting(key: &str, baked: Option<&'static str>) -> Option<String> {
    var(key).ok().or_else(|| baked.map(str::to_owned))
}

#[actix_web::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    logger::init();

    let config = match setting("TRUSTMESH_CONFIG", option_env!("TRUSTMESH_CONFIG")) {
        Some(path) => Config::load(Path::new(&path))?,
        None => Config::default(),
    };
    let addr: SocketAddr = setting("TRUSTMESH_BIND", option_env!("TRUSTMESH_BIND"))
        .as_deref()
        .unwrap_or(DEFAULT_BIND)
        .parse()?;

    run_server(addr, &config).await
}

async fn run_server(addr: SocketAddr, config: &Config) -> Result<(), AppError> {
    let state = AppState::new(config)?;
    let scheduler = state.matches.clone().spawn_scheduler(config.matching.batch_interval());

    info!(%addr, "Starting trustmesh server");
    let data = web::Data::new(state);
    let result = HttpServer::new(move || App::new().app_data(data.clone()).configure(routes::routes))
        .bind(addr)?
        .run()
        .await;

    scheduler.abort();
    result?;
    Ok(())
}
