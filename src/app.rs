use crate::auth::{authenticate_bearer, parse_bearer, TokenService};
use crate::db::SharedStore;
use crate::error::ApiError;
use crate::prediction::Predictor;
use crate::{predict_handlers, user_handlers};
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::{from_fn, Next};
use actix_web::http::header;
use actix_web::{web, Error, HttpMessage};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use std::sync::Arc;
use std::time::Duration;

/// Shared state handed to every handler through `web::Data`.
pub struct AppState {
    pub store: SharedStore,
    pub tokens: TokenService,
    pub predictor: Arc<dyn Predictor>,
    /// Lifetime of tokens issued by `/register` and `/login`.
    pub token_ttl: Duration,
}

/// Username of the caller, placed in request extensions once the bearer
/// token has been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject(pub String);

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .service(predict_handlers::index)
        .service(user_handlers::register)
        .service(user_handlers::login)
        .service(
            web::scope("/predict")
                .wrap(from_fn(require_bearer))
                .service(predict_handlers::predict_auth),
        );
}

/// Malformed or incomplete bodies are a validation failure, not a 400.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::Payload(err.to_string()).into())
}

/// Runs before any extractor of the wrapped handlers, so a missing or bad
/// token wins over a bad body. Rejections are rendered here rather than
/// returned as `Err`.
async fn require_bearer(
    mut req: ServiceRequest,
    next: Next<impl MessageBody + 'static>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    match bearer_subject(&mut req).await {
        Ok(subject) => {
            req.extensions_mut().insert(Subject(subject));
            next.call(req).await.map(ServiceResponse::map_into_left_body)
        }
        Err(e) => Ok(req.error_response(e).map_into_right_body()),
    }
}

async fn bearer_subject(req: &mut ServiceRequest) -> Result<String, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .cloned()
        .ok_or_else(|| ApiError::Internal("application state missing".to_string()))?;

    // `BearerAuth` only accepts the exact `Bearer` spelling; schemes are
    // case-insensitive, so fall back to reading the header directly.
    let token = match req.extract::<Option<BearerAuth>>().await.ok().flatten() {
        Some(credentials) => Some(credentials.token().to_string()),
        None => req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_bearer),
    };
    authenticate_bearer(&state.tokens, token.as_deref())
}
