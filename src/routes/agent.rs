use actix_web::{web, HttpResponse};
use actix_web_httpauth::middleware::HttpAuthentication;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{bearer_validator, Principal},
    directory::ClientRequest,
    error::AppError,
    ledger::OperationRequest,
    report::{parse_bound, parse_range, Bound, ReportQuery},
    state::AppState,
};

#[derive(Deserialize)]
struct OperationPayload {
    service_id: i64,
    client_id: Option<i64>,
    price_charged: f64,
    notes: Option<String>,
    service_date: Option<String>,
}

#[derive(Deserialize)]
struct ReportParams {
    start_date: Option<String>,
    end_date: Option<String>,
    agent_id: Option<i64>,
}

#[derive(Deserialize)]
struct HistoryParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .wrap(HttpAuthentication::with_fn(bearer_validator))
            .service(web::resource("/services").route(web::get().to(list_services)))
            .service(
                web::resource("/clients")
                    .route(web::get().to(list_clients))
                    .route(web::post().to(create_client)),
            )
            .service(web::resource("/operations").route(web::post().to(create_operation)))
            .service(web::resource("/reports").route(web::get().to(build_report)))
            .service(web::resource("/agent/history").route(web::get().to(history))),
    );
}

async fn list_services(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
) -> Result<HttpResponse, AppError> {
    let services = state.scope.visible_services(&auth).await?;
    Ok(HttpResponse::Ok().json(services))
}

async fn list_clients(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
) -> Result<HttpResponse, AppError> {
    let clients = state.scope.visible_clients(&auth).await?;
    Ok(HttpResponse::Ok().json(clients))
}

async fn create_client(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    payload: web::Json<ClientRequest>,
) -> Result<HttpResponse, AppError> {
    let id = state
        .directory
        .create_client(&auth, payload.into_inner())
        .await?;
    Ok(HttpResponse::Created().json(json!({ "id": id })))
}

async fn create_operation(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    payload: web::Json<OperationPayload>,
) -> Result<HttpResponse, AppError> {
    let payload = payload.into_inner();
    let service_date = payload
        .service_date
        .as_deref()
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(|raw| parse_bound(raw, Bound::Start))
        .transpose()?;

    let request = OperationRequest {
        service_id: payload.service_id,
        client_id: payload.client_id,
        price_charged: payload.price_charged,
        notes: payload.notes,
        service_date,
    };
    let operation = state.ledger.record_operation(&auth, request).await?;
    Ok(HttpResponse::Created().json(operation))
}

async fn build_report(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    query: web::Query<ReportParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let range = parse_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let report = state
        .reports
        .build_report(
            &auth,
            ReportQuery {
                range,
                agent_id: params.agent_id,
            },
        )
        .await?;
    Ok(HttpResponse::Ok().json(report))
}

async fn history(
    state: web::Data<AppState>,
    auth: web::ReqData<Principal>,
    query: web::Query<HistoryParams>,
) -> Result<HttpResponse, AppError> {
    let params = query.into_inner();
    let range = parse_range(params.start_date.as_deref(), params.end_date.as_deref())?;
    let operations = state
        .scope
        .visible_operations_for_history(&auth, range)
        .await?;
    Ok(HttpResponse::Ok().json(operations))
}
