use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{admin_validator, Principal},
    directory::AgentRequest,
    error::AppError,
    models::{NewService, UserStatus, Verdict},
    state::AppState,
};

#[derive(Deserialize)]
struct UserStatusPayload {
    status: UserStatus,
}

#[derive(Deserialize)]
struct VerdictPayload {
    status: Verdict,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/admin")
            .wrap(HttpAuthentication::with_fn(admin_validator))
            .service(
                web::resource("/users")
                    .route(web::get().to(list_users))
                    .route(web::post().to(create_user)),
            )
            .service(web::resource("/users/{id}").route(web::delete().to(delete_user)))
            .service(web::resource("/users/{id}/status").route(web::patch().to(update_user_status)))
            .service(web::resource("/users/{id}/wipe").route(web::post().to(wipe_user)))
            .service(web::resource("/services").route(web::post().to(create_service)))
            .service(
                web::resource("/services/{id}")
                    .route(web::put().to(update_service))
                    .route(web::delete().to(delete_service)),
            )
            .service(web::resource("/operations/pending").route(web::get().to(list_pending)))
            .service(
                web::resource("/operations/{id}/validate")
                    .route(web::patch().to(validate_operation)),
            ),
    );
}

async fn list_users(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
) -> Result<HttpResponse, AppError> {
    let users = state.directory.list_users(&auth).await?;
    Ok(HttpResponse::Ok().json(users))
}

async fn create_user(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    payload: web::Json<AgentRequest>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .directory
        .create_agent(&auth, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(user))
}

async fn update_user_status(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    path: web::Path<i64>,
    payload: web::Json<UserStatusPayload>,
) -> Result<HttpResponse, AppError> {
    let user = state
        .directory
        .set_user_status(&auth, path.into_inner(), payload.status)
        .await?;
    Ok(HttpResponse::Ok().json(user))
}

async fn delete_user(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state.ledger.delete_user(&auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn wipe_user(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    let removed = state.ledger.block_and_wipe(&auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true, "removed_operations": removed })))
}

async fn create_service(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    payload: web::Json<NewService>,
) -> Result<HttpResponse, AppError> {
    let service = state
        .directory
        .create_service(&auth, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(service))
}

async fn update_service(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    path: web::Path<i64>,
    payload: web::Json<NewService>,
) -> Result<HttpResponse, AppError> {
    let service = state
        .directory
        .update_service(&auth, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(service))
}

async fn delete_service(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    path: web::Path<i64>,
) -> Result<HttpResponse, AppError> {
    state
        .directory
        .delete_service(&auth, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "ok": true })))
}

async fn list_pending(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
) -> Result<HttpResponse, AppError> {
    let operations = state.ledger.list_pending(&auth).await?;
    Ok(HttpResponse::Ok().json(operations))
}

async fn validate_operation(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    path: web::Path<i64>,
    payload: web::Json<VerdictPayload>,
) -> Result<HttpResponse, AppError> {
    let operation = state
        .ledger
        .transition(&auth, path.into_inner(), payload.status)
        .await?;
    Ok(HttpResponse::Ok().json(operation))
}
