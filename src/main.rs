// src/main.rs

mod access_gate;
mod app_state;
mod config;
mod errors;
mod mapper;
mod models;
mod service;
mod store;
mod todo;
mod todo_db;

use std::io;
use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use log::{error, info, warn};

use crate::access_gate::{AccessGate, IpAllowlist};
use crate::app_state::AppState;
use crate::config::Config;
use crate::service::TodoService;
use crate::store::{InMemoryTodoStore, TodoStore};
use crate::todo_db::{MongoDB, MongoTodoStore};

fn cors_for(config: &Config) -> Cors {
    if config.is_development() {
        return Cors::permissive();
    }

    let mut cors = Cors::default();
    for origin in &config.cors_allowed_origins {
        cors = cors.allowed_origin(origin);
    }
    cors.allow_any_header()
        .allow_any_method()
        .supports_credentials()
        .max_age(3600)
}

async fn open_store(config: &Config) -> io::Result<Arc<dyn TodoStore>> {
    match &config.mongo_uri {
        Some(uri) => {
            let mongodb = MongoDB::init(uri, &config.database_name)
                .await
                .map_err(|e| {
                    error!("Could not connect to MongoDB: {}", e);
                    io::Error::other(e)
                })?;
            Ok(Arc::new(MongoTodoStore::new(&mongodb)))
        }
        None => {
            warn!("MONGO_URI not set, todos are kept in memory and lost on restart");
            Ok(Arc::new(InMemoryTodoStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // loads .env, so RUST_LOG from the file reaches the logger
    let config = Config::from_env();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config.map_err(|e| {
        error!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e)
    })?;

    let store = open_store(&config).await?;
    let state = web::Data::new(AppState {
        todos: TodoService::new(store),
    });

    // the allow-list only guards production
    let gate = if config.is_development() {
        Arc::new(AccessGate::default())
    } else {
        Arc::new(config.access_gate.clone())
    };

    info!("Server running at http://{}", config.bind_addr);
    info!("Environment: {:?}", config.environment);
    if gate.is_enabled() {
        info!("IP allow-list active");
    }
    if !config.is_development() {
        info!("Allowed CORS origins: {}", config.cors_allowed_origins.join(", "));
    }

    let bind_addr = config.bind_addr.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(IpAllowlist::new(gate.clone()))
            .wrap(cors_for(&config))
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(todo::configure)
    })
    .bind(bind_addr)?
    .run()
    .await
}
