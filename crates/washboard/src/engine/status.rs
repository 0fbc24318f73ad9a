//! Polling of remote appliance status.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;
use tracing::warn;

use super::state::Appliance;
use super::state::UserSlot;
use crate::remote::RemoteError;
use crate::remote::RemoteService;

/// Result of one poll, per appliance.
///
/// `Ok(None)` means the appliance is free; `Err` means the previous occupant
/// should be kept.
pub type PollReport = BTreeMap<Appliance, Result<Option<UserSlot>, RemoteError>>;

/// Read the occupant out of a `getAgentStatus` payload.
///
/// Only an explicit `monitor` status naming a known slot counts as occupied.
pub fn interpret_status(payload: &serde_json::Value) -> Option<UserSlot> {
    let status = payload.get("status").and_then(|v| v.as_str());
    if status != Some("monitor") {
        return None;
    }

    payload
        .get("user")
        .and_then(|v| v.as_str())
        .and_then(|user| user.parse().ok())
}

/// Fetch the status of every appliance concurrently.
///
/// Each appliance is requested on its own task, so one slow or failing
/// request does not hold up or affect the others.
pub async fn poll_all(remote: &Arc<dyn RemoteService>, appliances: &[Appliance]) -> PollReport {
    let handles: Vec<(Appliance, JoinHandle<_>)> = appliances
        .iter()
        .map(|&appliance| {
            let remote = Arc::clone(remote);
            let handle = tokio::spawn(async move {
                remote
                    .agent_status(appliance)
                    .await
                    .map(|payload| interpret_status(&payload))
            });
            (appliance, handle)
        })
        .collect();

    let mut report = PollReport::new();
    for (appliance, handle) in handles {
        match handle.await {
            Ok(result) => {
                match &result {
                    Ok(occupant) => debug!("Polled {}: occupant={:?}", appliance, occupant),
                    Err(e) => warn!("Failed to poll {} status: {}", appliance, e),
                }
                report.insert(appliance, result);
            }
            Err(e) => warn!("Status request task for {} failed: {}", appliance, e),
        }
    }
    report
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::remote::mock::MockRemote;

    #[test]
    fn test_interpret_monitor_with_known_user() {
        let payload = json!({"status": "monitor", "user": "user2"});
        assert_eq!(interpret_status(&payload), Some(UserSlot::User2));
    }

    #[test]
    fn test_interpret_unoccupied_payloads() {
        let payloads = [
            json!({"status": "idle", "user": ""}),
            json!({"status": "idle", "user": "user1"}),
            json!({"status": "monitor", "user": ""}),
            json!({"status": "monitor", "user": "mason"}),
            json!({"status": "monitor"}),
            json!({"status": "monitor", "user": 1}),
            json!({"user": "user1"}),
            json!({"status": "MONITOR", "user": "user1"}),
            json!({}),
            json!("monitor"),
        ];

        for payload in payloads {
            assert_eq!(interpret_status(&payload), None, "payload: {}", payload);
        }
    }

    #[tokio::test]
    async fn test_poll_all_reports_every_appliance() {
        let mock = Arc::new(MockRemote::new());
        mock.set_status(Appliance::Washer, json!({"status": "monitor", "user": "user1"}));
        let remote: Arc<dyn RemoteService> = mock.clone();

        let report = poll_all(&remote, &[Appliance::Washer, Appliance::Dryer]).await;

        assert_eq!(report.len(), 2);
        assert_eq!(report[&Appliance::Washer], Ok(Some(UserSlot::User1)));
        assert_eq!(report[&Appliance::Dryer], Ok(None));
        assert_eq!(mock.status_calls(), 2);
    }

    #[tokio::test]
    async fn test_poll_failure_is_isolated() {
        let mock = Arc::new(MockRemote::new());
        mock.set_status(Appliance::Washer, json!({"status": "monitor", "user": "user2"}));
        mock.fail_status(
            Appliance::Dryer,
            RemoteError::Status {
                status: 502,
                body: String::new(),
            },
        );
        let remote: Arc<dyn RemoteService> = mock;

        let report = poll_all(&remote, &[Appliance::Washer, Appliance::Dryer]).await;

        assert_eq!(report[&Appliance::Washer], Ok(Some(UserSlot::User2)));
        assert!(matches!(
            report[&Appliance::Dryer],
            Err(RemoteError::Status { status: 502, .. })
        ));
    }

    #[tokio::test]
    async fn test_poll_only_requested_appliances() {
        let mock = Arc::new(MockRemote::new());
        let remote: Arc<dyn RemoteService> = mock.clone();

        let report = poll_all(&remote, &[Appliance::Dryer]).await;

        assert_eq!(report.keys().copied().collect::<Vec<_>>(), vec![Appliance::Dryer]);
        assert_eq!(mock.status_calls(), 1);
    }
}
