use actix_web::web::{self, JsonConfig, ServiceConfig};

use crate::error::AppError;

pub mod health;
pub mod matches;
pub mod opportunities;
pub mod privacy;
pub mod profiles;

/// Register every route, with body parse failures reported as 400s in the
/// same JSON shape as other errors.
pub fn routes(cfg: &mut ServiceConfig) {
    cfg.app_data(JsonConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()))
        .app_data(web::PathConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()))
        .app_data(web::QueryConfig::default().error_handler(|err, _req| AppError::BadRequest(err.to_string()).into()))
        .configure(health::routes)
        .configure(privacy::routes)
        .configure(profiles::routes)
        .configure(opportunities::routes)
        .configure(matches::routes);
}
