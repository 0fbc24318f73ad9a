use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::Response;
use tracing::debug;

use super::AgentStatusUpdate;
use super::RemoteError;
use super::RemoteService;
use crate::engine::Appliance;

/// Longest slice of an error body kept in a [`RemoteError::Status`].
const BODY_PREVIEW_CHARS: usize = 160;

/// Status service client backed by reqwest.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
}

impl HttpRemote {
    /// Create a client for the service at `base_url`.
    ///
    /// Every request is bounded by `timeout`, so a hung service cannot stall
    /// a poll past the next tick.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn get_json(&self, path: &str) -> Result<serde_json::Value, RemoteError> {
        let url = self.endpoint(path);
        debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_transport_error)?;
        let response = check_status(response).await?;

        let body = response.bytes().await.map_err(map_transport_error)?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Decode(e.to_string()))
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn agent_status(&self, appliance: Appliance) -> Result<serde_json::Value, RemoteError> {
        self.get_json(&format!("{}/getAgentStatus", appliance)).await
    }

    async fn set_agent_status(
        &self,
        appliance: Appliance,
        update: &AgentStatusUpdate,
    ) -> Result<(), RemoteError> {
        let url = self.endpoint(&format!("{}/setAgentStatus", appliance));
        debug!("POST {} {:?}", url, update);

        let response = self
            .client
            .post(&url)
            .json(update)
            .send()
            .await
            .map_err(map_transport_error)?;
        check_status(response).await?;

        Ok(())
    }

    async fn user_names(&self) -> Result<serde_json::Value, RemoteError> {
        self.get_json("users/names").await
    }
}

async fn check_status(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        status: status.as_u16(),
        body: body.chars().take(BODY_PREVIEW_CHARS).collect(),
    })
}

fn map_transport_error(error: reqwest::Error) -> RemoteError {
    if error.is_timeout() {
        RemoteError::Timeout(error.to_string())
    } else {
        RemoteError::Transport(error.to_string())
    }
}
