use std::{io, path::PathBuf, sync::Arc};

use actix_cors::Cors;
use actix_web::{
    body::MessageBody,
    dev::{ServiceFactory, ServiceRequest, ServiceResponse},
    get,
    http::StatusCode,
    middleware::{ErrorHandlerResponse, ErrorHandlers, Logger, NormalizePath},
    web, App, HttpResponse,
};

use crate::auth::TokenKeys;
use crate::error::{AppError, ErrorBody, GENERIC_ERROR};
use crate::routes;
use crate::store::Store;

pub const LANDING_IMAGE: &str = "ahmetim.png";

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: TokenKeys,
    pub public_dir: PathBuf,
}

/// The whole application: middleware, body limits, the landing image and
/// the three API scopes.
pub fn build(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .app_data(state)
        .app_data(web::JsonConfig::default().error_handler(|err, _| {
            AppError::BadRequest(err.to_string()).into()
        }))
        .app_data(web::QueryConfig::default().error_handler(|err, _| {
            AppError::BadRequest(err.to_string()).into()
        }))
        .wrap(ErrorHandlers::new().handler(StatusCode::INTERNAL_SERVER_ERROR, mask_internal_error))
        .wrap(NormalizePath::trim())
        .wrap(Logger::default())
        .wrap(Cors::permissive())
        .service(index)
        .configure(routes::configure)
}

/// Logs the cause of a 500 and replaces whatever body it had.
pub fn mask_internal_error<B>(
    res: ServiceResponse<B>,
) -> actix_web::Result<ErrorHandlerResponse<B>> {
    let cause = match res.response().error() {
        Some(err) => err.to_string(),
        None => "no error attached".to_string(),
    };
    log::error!(
        "{} {} failed: {}",
        res.request().method(),
        res.request().path(),
        cause
    );

    let (req, _) = res.into_parts();
    let res = HttpResponse::InternalServerError().json(ErrorBody::new(GENERIC_ERROR));
    Ok(ErrorHandlerResponse::Response(
        ServiceResponse::new(req, res).map_into_right_body(),
    ))
}

#[get("/")]
async fn index(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let path = state.public_dir.join(LANDING_IMAGE);
    match tokio::fs::read(&path).await {
        Ok(image) => Ok(HttpResponse::Ok().content_type("image/png").body(image)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            Err(AppError::NotFound("Landing image not found"))
        }
        Err(err) => Err(AppError::Internal(format!(
            "failed to read {}: {}",
            path.display(),
            err
        ))),
    }
}
