use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use super::AgentStatus;
use super::AgentStatusUpdate;
use super::RemoteError;
use super::RemoteService;
use crate::engine::Appliance;

#[derive(Debug, Default)]
struct MockState {
    statuses: BTreeMap<Appliance, Result<serde_json::Value, RemoteError>>,
    names: Option<Result<serde_json::Value, RemoteError>>,
    commands: Vec<(Appliance, AgentStatusUpdate)>,
    fail_commands: bool,
    status_calls: usize,
}

/// In-memory status service for testing.
///
/// Accepted commands are applied to the stored status the same way the real
/// service does, so a poll after a command observes its effect.
#[derive(Debug, Default)]
pub struct MockRemote {
    state: Mutex<MockState>,
    command_latency: Duration,
}

impl MockRemote {
    /// Every appliance idle, valid user names.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every command response by `latency`.
    pub fn with_command_latency(mut self, latency: Duration) -> Self {
        self.command_latency = latency;
        self
    }

    pub fn set_status(&self, appliance: Appliance, payload: serde_json::Value) {
        self.lock().statuses.insert(appliance, Ok(payload));
    }

    pub fn fail_status(&self, appliance: Appliance, error: RemoteError) {
        self.lock().statuses.insert(appliance, Err(error));
    }

    pub fn set_names(&self, response: Result<serde_json::Value, RemoteError>) {
        self.lock().names = Some(response);
    }

    /// Make commands fail without touching the stored status.
    pub fn fail_commands(&self, fail: bool) {
        self.lock().fail_commands = fail;
    }

    pub fn commands(&self) -> Vec<(Appliance, AgentStatusUpdate)> {
        self.lock().commands.clone()
    }

    pub fn status_calls(&self) -> usize {
        self.lock().status_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

pub fn valid_names() -> serde_json::Value {
    json!({
        "user1": {"name": "Mason", "color": "#ef4444"},
        "user2": {"name": "Bren", "color": "#a855f7"},
    })
}

#[async_trait]
impl RemoteService for MockRemote {
    async fn agent_status(&self, appliance: Appliance) -> Result<serde_json::Value, RemoteError> {
        let mut state = self.lock();
        state.status_calls += 1;
        state
            .statuses
            .get(&appliance)
            .cloned()
            .unwrap_or_else(|| Ok(json!({"status": "idle", "user": ""})))
    }

    async fn set_agent_status(
        &self,
        appliance: Appliance,
        update: &AgentStatusUpdate,
    ) -> Result<(), RemoteError> {
        if !self.command_latency.is_zero() {
            tokio::time::sleep(self.command_latency).await;
        }

        let mut state = self.lock();
        state.commands.push((appliance, update.clone()));
        if state.fail_commands {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }

        let stored = match (update.status, update.user) {
            (AgentStatus::Monitor, Some(user)) => json!({"status": "monitor", "user": user}),
            _ => json!({"status": "idle", "user": ""}),
        };
        state.statuses.insert(appliance, Ok(stored));
        Ok(())
    }

    async fn user_names(&self) -> Result<serde_json::Value, RemoteError> {
        self.lock()
            .names
            .clone()
            .unwrap_or_else(|| Ok(valid_names()))
    }
}
