use actix_web::{http::header, web, HttpResponse};
use serde::Deserialize;

use crate::{error::AppError, state::AppState};

#[derive(Deserialize)]
struct LoginPayload {
    identifier: String,
    password: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/api/auth/login").route(web::post().to(login)))
        .service(web::resource("/health").route(web::get().to(health)));
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().body("ok")
}

async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let session = state
        .guard
        .authenticate(&payload.identifier, &payload.password)
        .await?;

    Ok(HttpResponse::Ok()
        .insert_header((header::CACHE_CONTROL, "no-store"))
        .json(session))
}
