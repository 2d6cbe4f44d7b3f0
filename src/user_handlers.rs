use crate::app::AppState;
use crate::db::StoreError;
use crate::error::ApiError;
use crate::models::{Credentials, TokenResponse};
use actix_web::{post, web, HttpResponse};
use tracing::{error, info, warn};

#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    data: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let Credentials { username, password } = data.into_inner();

    state
        .store
        .register(&username, &password)
        .await
        .map_err(|e| match e {
            StoreError::DuplicateUser(_) => {
                warn!(username = %username, "registration rejected: username taken");
                ApiError::DuplicateUser
            }
            other => {
                error!(username = %username, error = %other, "registration failed");
                ApiError::Internal(other.to_string())
            }
        })?;

    info!(username = %username, "registered user");
    Ok(HttpResponse::Ok().json(token_response(&state, &username)?))
}

#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    data: web::Json<Credentials>,
) -> Result<HttpResponse, ApiError> {
    let user = match state.store.authenticate(&data.username, &data.password).await {
        Some(user) if !user.disabled => user,
        Some(_) => {
            warn!(username = %data.username, "login rejected: account disabled");
            return Err(ApiError::InvalidCredentials);
        }
        None => {
            warn!(username = %data.username, "login rejected: bad credentials");
            return Err(ApiError::InvalidCredentials);
        }
    };

    info!(username = %user.username, "login succeeded");
    Ok(HttpResponse::Ok().json(token_response(&state, &user.username)?))
}

fn token_response(state: &AppState, username: &str) -> Result<TokenResponse, ApiError> {
    let token = state
        .tokens
        .issue(username, state.token_ttl)
        .map_err(|e| ApiError::Internal(e.to_string()))?;
    Ok(TokenResponse::bearer(token, state.token_ttl.as_secs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::routes;
    use crate::auth::TokenError;
    use crate::db::{CredentialStore, InMemoryStore, PasswordScheme};
    use crate::models::{ErrorBody, User};
    use crate::test_support::{state_with_store, test_state};
    use actix_web::http::StatusCode;
    use actix_web::{test, App};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Arc;

    #[actix_web::test]
    async fn test_register_twice() {
        let app = test::init_service(App::new().app_data(test_state()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"username": "alice", "password": "pw1"}))
            .to_request();
        let body: TokenResponse = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.token_type, "Bearer");
        assert_eq!(body.expires_in, 38 * 60);
        assert!(!body.access_token.is_empty());

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"username": "alice", "password": "pw2"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ErrorBody = test::read_body_json(resp).await;
        assert_eq!(body.detail, "Username already exists");
    }

    #[actix_web::test]
    async fn test_login_issues_token_for_subject() {
        let state = test_state();
        state.store.register("admin", "0202").await.unwrap();
        let app = test::init_service(App::new().app_data(state.clone()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"username": "admin", "password": "0202"}))
            .to_request();
        let body: TokenResponse = test::call_and_read_body_json(&app, req).await;
        let now = chrono::Utc::now().timestamp();
        assert_eq!(
            state.tokens.validate_at(&body.access_token, now).unwrap(),
            "admin"
        );
        assert_eq!(
            state.tokens.validate_at(&body.access_token, now + 38 * 60),
            Err(TokenError::Expired)
        );
    }

    #[actix_web::test]
    async fn test_login_wrong_password() {
        let state = test_state();
        state.store.register("admin", "0202").await.unwrap();
        let app = test::init_service(App::new().app_data(state).configure(routes)).await;

        for (username, password) in [("admin", "nope"), ("ghost", "0202")] {
            let req = test::TestRequest::post()
                .uri("/login")
                .set_json(json!({"username": username, "password": password}))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
            let body: ErrorBody = test::read_body_json(resp).await;
            assert_eq!(body.detail, "Incorrect username or password");
        }
    }

    #[actix_web::test]
    async fn test_login_with_bcrypt_store() {
        let store = Arc::new(InMemoryStore::new(PasswordScheme::Bcrypt));
        let app = test::init_service(
            App::new()
                .app_data(state_with_store(store))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"username": "dave", "password": "pw"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"username": "dave", "password": "pw"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    struct DisabledStore;

    #[async_trait]
    impl CredentialStore for DisabledStore {
        async fn register(&self, _username: &str, _password: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn authenticate(&self, username: &str, password: &str) -> Option<User> {
            Some(User {
                username: username.to_string(),
                password: password.to_string(),
                disabled: true,
            })
        }
    }

    #[actix_web::test]
    async fn test_disabled_user_cannot_login() {
        let app = test::init_service(
            App::new()
                .app_data(state_with_store(Arc::new(DisabledStore)))
                .configure(routes),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/login")
            .set_json(json!({"username": "frozen", "password": "pw"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_missing_field_is_unprocessable() {
        let app = test::init_service(App::new().app_data(test_state()).configure(routes)).await;

        let req = test::TestRequest::post()
            .uri("/register")
            .set_json(json!({"username": "alice"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
