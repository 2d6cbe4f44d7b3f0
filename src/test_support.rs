//! Fixtures shared by the handler tests.

use crate::app::AppState;
use crate::auth::TokenService;
use crate::customer::Customer;
use crate::db::{InMemoryStore, PasswordScheme, SharedStore};
use crate::prediction::{Prediction, PredictionError, Predictor};
use actix_web::web;
use jsonwebtoken::Algorithm;
use std::sync::Arc;
use std::time::Duration;

const TEST_SECRET: &[u8] = b"handler-test-secret";

pub struct FixedPredictor(pub bool, pub Option<f64>);

impl Predictor for FixedPredictor {
    fn predict(&self, _customer: &Customer) -> Result<Prediction, PredictionError> {
        Prediction::from_class(self.0, self.1)
    }
}

pub struct FailingPredictor;

impl Predictor for FailingPredictor {
    fn predict(&self, _customer: &Customer) -> Result<Prediction, PredictionError> {
        Err(PredictionError::Failed("model exploded".to_string()))
    }
}

pub fn build_state(store: SharedStore, predictor: Arc<dyn Predictor>) -> web::Data<AppState> {
    web::Data::new(AppState {
        store,
        tokens: TokenService::new(TEST_SECRET, Algorithm::HS256),
        predictor,
        token_ttl: Duration::from_secs(38 * 60),
    })
}

pub fn state_with_store(store: SharedStore) -> web::Data<AppState> {
    build_state(store, Arc::new(FixedPredictor(true, Some(0.81))))
}

pub fn test_state() -> web::Data<AppState> {
    state_with_store(Arc::new(InMemoryStore::new(PasswordScheme::Plain)))
}
