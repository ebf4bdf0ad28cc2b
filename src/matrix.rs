use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;

/// Why a delivery failed. Join failures are swallowed inside [`MatrixClient::deliver`]
/// and never show up here.
#[derive(Debug)]
pub enum DeliveryError {
    Login(anyhow::Error),
    Send(anyhow::Error),
}

impl std::fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryError::Login(e) => write!(f, "matrix login failed: {e:#}"),
            DeliveryError::Send(e) => write!(f, "matrix send failed: {e:#}"),
        }
    }
}

impl std::error::Error for DeliveryError {}

#[derive(Serialize)]
struct LoginRequest<'a> {
    #[serde(rename = "type")]
    login_type: &'a str,
    identifier: UserIdentifier<'a>,
    password: &'a str,
}

#[derive(Serialize)]
struct UserIdentifier<'a> {
    #[serde(rename = "type")]
    id_type: &'a str,
    user: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    access_token: String,
}

#[derive(Serialize)]
struct TextMessage<'a> {
    msgtype: &'a str,
    body: &'a str,
}

#[derive(Deserialize)]
struct SendResponse {
    #[serde(default)]
    event_id: String,
}

/// Delivers one text message per call over the Matrix client-server API (v3).
/// No session is kept between calls; every delivery logs in and out again.
pub struct MatrixClient {
    http: reqwest::Client,
    homeserver: String,
    user: String,
    password: String,
}

impl MatrixClient {
    pub fn new(config: &Config) -> Self {
        Self {
            http: reqwest::Client::new(),
            homeserver: config.homeserver.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
        }
    }

    /// Runs the full login → join → send → logout sequence for one message
    /// and returns the remote event ID on success.
    pub async fn deliver(&self, room_id: &str, body: &str) -> Result<String, DeliveryError> {
        let token = self.login().await.map_err(DeliveryError::Login)?;

        // Joining a room the account already belongs to can fail harmlessly;
        // either way the send decides the outcome.
        if let Err(e) = self.join(&token, room_id).await {
            debug!("Room join skipped: {e:#}");
        }

        let sent = self.send(&token, room_id, body).await;

        // Best-effort cleanup, must not mask the send outcome
        if let Err(e) = self.logout(&token).await {
            warn!("Matrix logout failed: {e:#}");
        }

        sent.map_err(DeliveryError::Send)
    }

    async fn login(&self) -> Result<String> {
        let url = format!("{}/_matrix/client/v3/login", self.homeserver);
        let request = LoginRequest {
            login_type: "m.login.password",
            identifier: UserIdentifier {
                id_type: "m.id.user",
                user: &self.user,
            },
            password: &self.password,
        };

        debug!("Logging in to {url} as {}", self.user);

        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .context("Failed to reach homeserver for login")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Login rejected ({status}): {error_body}");
        }

        let login: LoginResponse = response
            .json()
            .await
            .context("Failed to parse login response")?;
        Ok(login.access_token)
    }

    async fn join(&self, token: &str, room_id: &str) -> Result<()> {
        let url = format!(
            "{}/_matrix/client/v3/join/{}",
            self.homeserver,
            urlencoding::encode(room_id)
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Failed to reach homeserver for join")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Join rejected ({status}): {error_body}");
        }
        Ok(())
    }

    async fn send(&self, token: &str, room_id: &str, body: &str) -> Result<String> {
        // Fresh transaction ID per event, as the spec requires for idempotency
        let url = format!(
            "{}/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            self.homeserver,
            urlencoding::encode(room_id),
            Uuid::new_v4()
        );

        debug!("Sending message event to {url}");

        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .json(&TextMessage {
                msgtype: "m.text",
                body,
            })
            .send()
            .await
            .context("Failed to reach homeserver for send")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            anyhow::bail!("Send rejected ({status}): {error_body}");
        }

        let sent: SendResponse = response
            .json()
            .await
            .context("Failed to parse send response")?;
        if sent.event_id.is_empty() {
            anyhow::bail!("Homeserver returned an empty event_id");
        }
        Ok(sent.event_id)
    }

    async fn logout(&self, token: &str) -> Result<()> {
        let url = format!("{}/_matrix/client/v3/logout", self.homeserver);

        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Failed to reach homeserver for logout")?;

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("Logout rejected ({status})");
        }
        Ok(())
    }
}
