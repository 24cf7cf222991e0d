use std::io;
use std::sync::Arc;

use actix_web::middleware::Condition;
use actix_web::{web, App, HttpServer};
use log::{error, info};
use tracing_actix_web::TracingLogger;

use pupil_registry::api::controller_context::StorageContext;
use pupil_registry::api::health_controller;
use pupil_registry::config::app::{
    config_health, config_services, cors, json_config, route_not_found,
};
use pupil_registry::config::db;
use pupil_registry::config::settings::{AppConfig, StorageBackend};
use pupil_registry::repository::{MemoryPupilStore, PgPupilStore, PupilStore};
use pupil_registry::utils::logger::init_logging;

fn startup_error(context: &str, err: impl std::fmt::Display) -> io::Error {
    error!("{}: {}", context, err);
    io::Error::new(io::ErrorKind::Other, format!("{}: {}", context, err))
}

fn build_store(config: &AppConfig) -> io::Result<Arc<dyn PupilStore>> {
    match (config.storage_backend, config.database_url.as_deref()) {
        (StorageBackend::Postgres, Some(url)) => {
            let pool = db::init_db_pool(
                url,
                config.db_pool_max_size,
                config.storage_timeout,
                config.db_retry,
            )
                .map_err(|e| startup_error("Database initialization failed", e))?;
            Ok(Arc::new(PgPupilStore::new(pool)))
        }
        (StorageBackend::Postgres, None) => Err(startup_error(
            "Invalid configuration",
            "DATABASE_URL is not set",
        )),
        (StorageBackend::Memory, _) => {
            info!("Using in-memory pupil storage; records are lost on restart");
            Ok(Arc::new(MemoryPupilStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::from_env().map_err(|e| {
        eprintln!("Invalid configuration: {}", e);
        io::Error::new(io::ErrorKind::InvalidInput, e.to_string())
    })?;

    init_logging(config.log_format)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    info!(
        "Starting {} ({}) with {} storage",
        config.app_name, config.environment, config.storage_backend
    );

    health_controller::start_clock();
    let store = build_store(&config)?;
    let context = StorageContext::new(store, config.storage_timeout);
    let app_config = config.clone();
    let (host, port) = config.bind_address();

    info!("Listening on {}:{}", host, port);
    HttpServer::new(move || {
        let health_enabled = app_config.health_check_enabled;
        App::new()
            .wrap(Condition::new(
                app_config.enable_request_logging,
                TracingLogger::default(),
            ))
            .wrap(cors(&app_config.cors_origins))
            .app_data(web::Data::new(context.clone()))
            .app_data(web::Data::new(app_config.clone()))
            .app_data(json_config(app_config.request_size_limit))
            .configure(move |cfg| {
                if health_enabled {
                    config_health(cfg);
                }
            })
            .configure(config_services)
            .default_service(web::to(route_not_found))
    })
    .bind((host.as_str(), port))?
    .run()
    .await
}
