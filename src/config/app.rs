use actix_cors::Cors;
use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse};
use log::info;

use crate::api::{health_controller, pupil_controller};
use crate::config::settings::CorsOrigins;
use crate::constants;
use crate::error::ServiceError;

/// JSON extractor settings: body size limit and the error envelope for
/// unparseable bodies.
pub fn json_config(limit: usize) -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(limit)
        .error_handler(|err, _req| ServiceError::from(err).into())
}

pub fn config_services(cfg: &mut web::ServiceConfig) {
    info!("Configuring routes...");
    cfg.service(
            web::scope(constants::PUPILS_SCOPE)
                .service(
                    web::resource("")
                        .route(web::get().to(pupil_controller::find_all))
                        .route(web::post().to(pupil_controller::insert)),
                )
                .service(
                    web::resource("/{id}")
                        .route(web::get().to(pupil_controller::find_by_id))
                        .route(web::put().to(pupil_controller::update))
                        .route(web::delete().to(pupil_controller::delete)),
                ),
        );
}

/// `/health` and `/ping`, mounted unless health checks are switched off.
pub fn config_health(cfg: &mut web::ServiceConfig) {
    cfg.service(health_controller::health)
        .service(health_controller::ping);
}

/// Fallback for unmatched routes.
pub async fn route_not_found(req: HttpRequest) -> Result<HttpResponse, ServiceError> {
    Err(ServiceError::RouteNotFound {
        url: req.uri().to_string(),
    })
}

pub fn cors(origins: &CorsOrigins) -> Cors {
    let cors = match origins {
        CorsOrigins::Any => Cors::default().allow_any_origin(),
        CorsOrigins::List(list) => list
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(3600)
}
