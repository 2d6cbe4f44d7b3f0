use crate::app::{AppState, Subject};
use crate::customer::Customer;
use crate::error::ApiError;
use crate::models::{Greeting, PredictRequest};
use actix_web::{get, post, web, HttpResponse, Responder};
use tracing::{error, info};
use uuid::Uuid;

/// Unauthenticated liveness probe.
#[get("/")]
pub async fn index() -> impl Responder {
    HttpResponse::Ok().json(Greeting {
        message: "Churn prediction API is up".to_string(),
    })
}

/// Mounted under `/predict` behind the bearer check.
#[post("/auth")]
pub async fn predict_auth(
    state: web::Data<AppState>,
    subject: web::ReqData<Subject>,
    data: web::Json<PredictRequest>,
) -> Result<HttpResponse, ApiError> {
    let customer = Customer::try_from(data.into_inner().customer)?;

    info!(
        target: "audit",
        audit_id = %Uuid::new_v4(),
        subject = %subject.0,
        endpoint = "/predict/auth",
        "prediction endpoint accessed"
    );

    // The model call is CPU work; keep it off the request workers.
    let predictor = state.predictor.clone();
    let prediction = web::block(move || predictor.predict(&customer))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            error!(subject = %subject.0, error = %e, "prediction failed");
            ApiError::Prediction(e)
        })?;

    Ok(HttpResponse::Ok().json(prediction))
}
