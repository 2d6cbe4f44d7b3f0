//! HTTP client for the gateway, plus the locally persisted login session.

use crate::customer::CustomerInput;
use crate::models::{Credentials, ErrorBody, PredictRequest, TokenResponse};
use crate::prediction::Prediction;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{detail} (HTTP {status})")]
    Api { status: StatusCode, detail: String },
    #[error("Session expired. Please login again.")]
    SessionExpired,
    #[error("not logged in")]
    NotLoggedIn,
    #[error("session file error: {0}")]
    Io(#[from] io::Error),
    #[error("session file is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Who is logged in on this machine, if anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub token: Option<String>,
    pub username: Option<String>,
}

impl Session {
    /// A missing file is an empty session.
    pub fn load(path: &Path) -> Result<Self, ClientError> {
        match fs::read_to_string(path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ClientError> {
        fs::write(path, serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    pub fn is_logged_in(&self) -> bool {
        self.token.is_some()
    }

    pub fn clear(&mut self) {
        self.token = None;
        self.username = None;
    }
}

pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<String, ClientError> {
        #[derive(Deserialize)]
        struct Greeting {
            message: String,
        }

        let resp = self.http.get(self.url("/")).send().await?;
        let greeting: Greeting = read_json(resp).await?;
        Ok(greeting.message)
    }

    /// Creates an account. The returned token is not stored; log in afterwards.
    pub async fn register(&self, username: &str, password: &str) -> Result<TokenResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/register"))
            .json(&credentials(username, password))
            .send()
            .await?;
        read_json(resp).await
    }

    pub async fn login(
        &self,
        session: &mut Session,
        username: &str,
        password: &str,
    ) -> Result<TokenResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/login"))
            .json(&credentials(username, password))
            .send()
            .await?;
        let token: TokenResponse = read_json(resp).await?;

        session.token = Some(token.access_token.clone());
        session.username = Some(username.to_string());
        debug!(username, expires_in = token.expires_in, "logged in");
        Ok(token)
    }

    /// Any 401 drops the local session so the user is sent back to login.
    pub async fn predict(
        &self,
        session: &mut Session,
        customer: CustomerInput,
    ) -> Result<Prediction, ClientError> {
        let token = session.token.as_deref().ok_or(ClientError::NotLoggedIn)?;
        let resp = self
            .http
            .post(self.url("/predict/auth"))
            .bearer_auth(token)
            .json(&PredictRequest { customer })
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            session.clear();
            return Err(ClientError::SessionExpired);
        }
        read_json(resp).await
    }
}

fn credentials(username: &str, password: &str) -> Credentials {
    Credentials {
        username: username.to_string(),
        password: password.to_string(),
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp.json().await?);
    }
    let text = resp.text().await?;
    let detail = serde_json::from_str::<ErrorBody>(&text)
        .map(|body| body.detail)
        .unwrap_or(text);
    Err(ClientError::Api { status, detail })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::routes;
    use crate::customer::sample_input;
    use crate::test_support::test_state;
    use actix_web::{App, HttpServer};

    #[test]
    fn test_session_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        assert_eq!(Session::load(&path).unwrap(), Session::default());

        let session = Session {
            token: Some("abc".to_string()),
            username: Some("alice".to_string()),
        };
        session.save(&path).unwrap();
        assert_eq!(Session::load(&path).unwrap(), session);
    }

    #[test]
    fn test_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert!(matches!(Session::load(&path), Err(ClientError::Corrupt(_))));
    }

    #[test]
    fn test_clear_logs_out() {
        let mut session = Session {
            token: Some("abc".to_string()),
            username: Some("alice".to_string()),
        };
        assert!(session.is_logged_in());
        session.clear();
        assert!(!session.is_logged_in());
        assert_eq!(session.username, None);
    }

    #[actix_web::test]
    async fn test_client_against_live_server() {
        let state = test_state();
        let server = HttpServer::new(move || App::new().app_data(state.clone()).configure(routes))
            .workers(1)
            .bind(("127.0.0.1", 0))
            .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        let client = ApiClient::new(format!("http://{addr}/"));
        assert!(!client.health().await.unwrap().is_empty());

        let mut session = Session::default();
        assert!(matches!(
            client.predict(&mut session, sample_input()).await,
            Err(ClientError::NotLoggedIn)
        ));

        client.register("alice", "pw1").await.unwrap();
        match client.register("alice", "pw1").await {
            Err(ClientError::Api { status, detail }) => {
                assert_eq!(status, StatusCode::BAD_REQUEST);
                assert_eq!(detail, "Username already exists");
            }
            other => panic!("expected duplicate error, got {other:?}"),
        }

        client.login(&mut session, "alice", "pw1").await.unwrap();
        assert_eq!(session.username.as_deref(), Some("alice"));

        let prediction = client.predict(&mut session, sample_input()).await.unwrap();
        assert_eq!(prediction.churn_label, "Churn");

        session.token = Some("stale.token.value".to_string());
        assert!(matches!(
            client.predict(&mut session, sample_input()).await,
            Err(ClientError::SessionExpired)
        ));
        assert!(!session.is_logged_in());

        handle.stop(false).await;
    }
}
