use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::Value;

use crate::{
    api::controller_context::StorageContext,
    constants,
    error::ServiceError,
    models::{
        pupil::{projection, validators, PupilId},
        response::ResponseBody,
    },
    services::pupil_service,
};

// GET api/pupils
pub async fn find_all(context: web::Data<StorageContext>) -> Result<HttpResponse, ServiceError> {
    info!("Listing pupils");
    let pupils = context.run(|store| pupil_service::list(store)).await?;
    let count = pupils.len();

    Ok(HttpResponse::Ok().json(
        ResponseBody::new(
            &format!("Retrieved {} pupils", count),
            projection::project_all(pupils),
        )
        .with_count(count),
    ))
}

// GET api/pupils/{id}
pub async fn find_by_id(
    id: web::Path<String>,
    context: web::Data<StorageContext>,
) -> Result<HttpResponse, ServiceError> {
    let id = PupilId::parse(&id)?;
    info!("Fetching pupil {}", id);

    let pupil = context
        .run(move |store| pupil_service::get(store, &id))
        .await?;

    Ok(HttpResponse::Ok().json(ResponseBody::new(
        constants::MESSAGE_PUPIL_RETRIEVED,
        projection::project(pupil),
    )))
}

/// Validates and stores a new pupil.
///
/// Responds `201 Created` with the stored record, password removed.
///
/// # Examples
///
/// ```no_run
/// // POST /api/pupils
/// // {"forename":"John","surname":"Smith","dob":"1995-03-15","gender":"Male"}
/// ```
pub async fn insert(
    payload: web::Json<Value>,
    context: web::Data<StorageContext>,
) -> Result<HttpResponse, ServiceError> {
    info!("Creating pupil");
    let fields = validators::validate_create(&payload, Utc::now().date_naive())?;

    let pupil = context
        .run(move |store| pupil_service::create(store, fields))
        .await?;

    Ok(HttpResponse::Created().json(ResponseBody::new(
        constants::MESSAGE_PUPIL_CREATED,
        projection::project(pupil),
    )))
}

/// Applies a partial update. The id is checked before the body so a malformed
/// id never costs a validation pass.
pub async fn update(
    id: web::Path<String>,
    payload: web::Json<Value>,
    context: web::Data<StorageContext>,
) -> Result<HttpResponse, ServiceError> {
    let id = PupilId::parse(&id)?;
    info!("Updating pupil {}", id);
    let patch = validators::validate_update(&payload, Utc::now().date_naive())?;

    let pupil = context
        .run(move |store| pupil_service::update(store, &id, &patch))
        .await?;

    Ok(HttpResponse::Ok().json(ResponseBody::new(
        constants::MESSAGE_PUPIL_UPDATED,
        projection::project(pupil),
    )))
}

// DELETE api/pupils/{id}
pub async fn delete(
    id: web::Path<String>,
    context: web::Data<StorageContext>,
) -> Result<HttpResponse, ServiceError> {
    let id = PupilId::parse(&id)?;
    info!("Deleting pupil {}", id);

    let summary = context
        .run(move |store| pupil_service::delete(store, &id))
        .await?;

    Ok(HttpResponse::Ok().json(ResponseBody::new(constants::MESSAGE_PUPIL_DELETED, summary)))
}
