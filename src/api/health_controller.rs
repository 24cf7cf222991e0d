use std::time::Instant;

use actix_web::{get, web, HttpResponse};
use chrono::Utc;
use log::{error, info};
use once_cell::sync::Lazy;
use serde::Serialize;
use serde_json::json;

use crate::api::controller_context::StorageContext;
use crate::config::settings::AppConfig;
use crate::constants;

static STARTED_AT: Lazy<Instant> = Lazy::new(Instant::now);

/// Pins the uptime clock. Call once at startup; otherwise the clock starts at
/// the first health request.
pub fn start_clock() {
    Lazy::force(&STARTED_AT);
}

#[derive(Serialize)]
struct ApplicationInfo {
    name: String,
    version: String,
    environment: String,
    /// Seconds since [`start_clock`].
    uptime: f64,
}

#[derive(Serialize)]
struct DatabaseInfo {
    status: &'static str,
}

#[derive(Serialize)]
struct HealthResponse {
    success: bool,
    message: &'static str,
    timestamp: String,
    application: ApplicationInfo,
    database: DatabaseInfo,
}

/// Reports the application identity and whether storage answers a ping
/// within the storage timeout.
///
/// Responds `200` when storage is connected and `503` otherwise, with the same
/// body shape in both cases.
#[get("/health")]
pub async fn health(
    context: web::Data<StorageContext>,
    config: web::Data<AppConfig>,
) -> HttpResponse {
    info!("Health check requested");

    let connected = match context.run(|store| store.ping()).await {
        Ok(()) => true,
        Err(e) => {
            error!("Storage health check failed: {}", e);
            false
        }
    };

    let response = HealthResponse {
        success: true,
        message: constants::MESSAGE_SERVER_RUNNING,
        timestamp: Utc::now().to_rfc3339(),
        application: ApplicationInfo {
            name: config.app_name.clone(),
            version: config.app_version.clone(),
            environment: config.environment.to_string(),
            uptime: STARTED_AT.elapsed().as_secs_f64(),
        },
        database: DatabaseInfo {
            status: if connected {
                constants::STORAGE_CONNECTED
            } else {
                constants::STORAGE_DISCONNECTED
            },
        },
    };

    if connected {
        HttpResponse::Ok().json(response)
    } else {
        HttpResponse::ServiceUnavailable().json(response)
    }
}

#[get("/ping")]
pub async fn ping() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "message": constants::MESSAGE_PONG,
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
