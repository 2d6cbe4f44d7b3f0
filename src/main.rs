use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use churn_gate::app::{self, AppState};
use churn_gate::auth::TokenService;
use churn_gate::config::Config;
use churn_gate::db::{InMemoryStore, PasswordScheme};
use churn_gate::logging;
use churn_gate::prediction::LogisticModel;
use std::sync::Arc;
use tracing::{info, warn};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init("churn_gate=info,actix_web=info");

    let config = Config::from_env().context("invalid configuration")?;
    let model = LogisticModel::load(&config.model_path).context("cannot start without a model")?;

    if config.password_scheme == PasswordScheme::Plain {
        warn!("PASSWORD_SCHEME=plain: passwords are stored and compared as plaintext");
    }

    let store = InMemoryStore::new(config.password_scheme);
    store
        .seed(&config.seed_users)
        .await
        .context("failed to seed users")?;
    info!(users = store.len().await, "credential store ready");

    let state = web::Data::new(AppState {
        store: Arc::new(store),
        tokens: TokenService::new(config.jwt_secret.as_bytes(), config.jwt_algorithm),
        predictor: Arc::new(model),
        token_ttl: config.token_ttl,
    });

    let addr = config.bind_addr();
    info!(
        addr = %addr,
        algorithm = ?config.jwt_algorithm,
        token_ttl_secs = config.token_ttl.as_secs(),
        "listening"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(app::routes)
    })
    .bind(&addr)
    .with_context(|| format!("failed to bind {addr}"))?
    .run()
    .await?;

    Ok(())
}
