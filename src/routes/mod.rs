pub mod admin;
pub mod agent;
pub mod public;

use actix_web::web;

use crate::error::AppError;

/// Registers every route. Order matters: `/api/admin` and the login
/// resource must be matched before the catch-all authenticated `/api` scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()),
    )
    .configure(public::configure)
    .configure(admin::configure)
    .configure(agent::configure);
}
