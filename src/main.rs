use std::{process, sync::Arc};

use actix_web::{web, HttpServer};

mod app;
mod auth;
mod config;
mod db;
mod error;
mod routes;
mod schemas;
mod store;
mod summary;
mod views;

use crate::{app::AppState, auth::TokenKeys, config::Config, store::MongoStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => {
            log::error!("Invalid configuration: {}", err);
            process::exit(1);
        }
    };

    let db = match db::connect(&config).await {
        Ok(db) => db,
        Err(err) => {
            log::error!("App Listen Error: could not connect to MongoDB: {}", err);
            process::exit(1);
        }
    };
    log::info!("Connected to MongoDB database {}", config.database_name);

    let store = MongoStore::new(&db);
    if let Err(err) = store.init().await {
        log::error!("App Listen Error: could not prepare collections: {}", err);
        process::exit(1);
    }

    let state = web::Data::new(AppState {
        store: Arc::new(store),
        tokens: TokenKeys::new(&config.jwt_secret, config.token_ttl_hours),
        public_dir: config.public_dir.clone(),
    });

    let server = HttpServer::new(move || app::build(state.clone()))
        .bind((config.host.as_str(), config.port))?;
    log::info!("Server is running on port {}", config.port);
    server.run().await
}
