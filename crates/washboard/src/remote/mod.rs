//! Client side of the laundry status service.
//!
//! The service tracks which user is monitoring each appliance. washboard only
//! reads status, writes status, and reads user display names; all three go
//! through [`RemoteService`] so the engine can be driven by a mock in tests.

mod http;
#[cfg(test)]
pub(crate) mod mock;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::engine::Appliance;
use crate::engine::UserSlot;
pub use http::HttpRemote;

/// Agent status values understood by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    /// Someone is using the appliance and wants to be told when it finishes.
    Monitor,
    Idle,
}

/// Body of `POST /{appliance}/setAgentStatus`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentStatusUpdate {
    pub status: AgentStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSlot>,
}

impl AgentStatusUpdate {
    pub fn monitor(user: UserSlot) -> Self {
        Self {
            status: AgentStatus::Monitor,
            user: Some(user),
        }
    }

    pub fn idle() -> Self {
        Self {
            status: AgentStatus::Idle,
            user: None,
        }
    }
}

/// Failure talking to the status service.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RemoteError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("service responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

/// Operations washboard needs from the status service.
#[async_trait]
pub trait RemoteService: Send + Sync {
    /// `GET /{appliance}/getAgentStatus`, returned undecoded so the caller
    /// decides how lenient to be.
    async fn agent_status(&self, appliance: Appliance) -> Result<serde_json::Value, RemoteError>;

    /// `POST /{appliance}/setAgentStatus`. The response body is ignored.
    async fn set_agent_status(
        &self,
        appliance: Appliance,
        update: &AgentStatusUpdate,
    ) -> Result<(), RemoteError>;

    /// `GET /users/names`.
    async fn user_names(&self) -> Result<serde_json::Value, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_bodies() {
        let claim = serde_json::to_value(AgentStatusUpdate::monitor(UserSlot::User2)).unwrap();
        assert_eq!(claim, serde_json::json!({"status": "monitor", "user": "user2"}));

        let release = serde_json::to_value(AgentStatusUpdate::idle()).unwrap();
        assert_eq!(release, serde_json::json!({"status": "idle"}));
    }

    #[test]
    fn test_error_messages() {
        let err = RemoteError::Status {
            status: 500,
            body: "boom".to_string(),
        };
        insta::assert_snapshot!(err.to_string(), @"service responded with status 500: boom");
    }
}
