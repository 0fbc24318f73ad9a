use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::directory::load_names;
use super::directory::UserDirectory;
use super::machine::Command;
use super::machine::ReservationMachine;
use super::message::EngineMessage;
use super::message::Gesture;
use super::state::Appliance;
use super::state::Snapshot;
use super::status::poll_all;
use crate::remote::AgentStatusUpdate;
use crate::remote::RemoteService;

/// Capacity of the channel feeding the engine loop
const ENGINE_CHANNEL_SIZE: usize = 64;

/// Timing and appliance set for one display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub appliances: Vec<Appliance>,
    pub poll_interval: Duration,

    /// Wait between a command completing and its local commit.
    pub settle_delay: Duration,

    /// Reload user names on this period. `None` loads them once at startup.
    pub names_refresh_interval: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            appliances: vec![Appliance::Washer, Appliance::Dryer],
            poll_interval: Duration::from_millis(5000),
            settle_delay: Duration::from_millis(300),
            names_refresh_interval: None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine is not running")]
    Stopped,
}

/// Cloneable access to a running engine for the presentation layer.
#[derive(Clone)]
pub struct EngineHandle {
    snapshot: Arc<ArcSwap<Snapshot>>,
    message_tx: mpsc::Sender<EngineMessage>,
}

impl EngineHandle {
    /// Latest published snapshot.
    ///
    /// Clones the `Arc`, so this never waits on the engine.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        self.snapshot.load_full()
    }

    /// Queue a gesture for the engine.
    pub async fn gesture(&self, gesture: Gesture) -> Result<(), EngineError> {
        self.message_tx
            .send(EngineMessage::Gesture(gesture))
            .await
            .map_err(|_| EngineError::Stopped)
    }
}

/// washboard engine
///
/// Owns the reservation machine and the user directory and is their only
/// writer. Network calls and settle delays run on spawned tasks that post
/// their results back over the message channel, so all state changes are
/// applied one at a time on the engine loop.
pub struct Engine {
    remote: Arc<dyn RemoteService>,
    settings: EngineSettings,
    machine: ReservationMachine,
    directory: UserDirectory,

    /// Published state (readers load the Arc, the engine stores a new one)
    snapshot: Arc<ArcSwap<Snapshot>>,

    message_tx: mpsc::Sender<EngineMessage>,
    message_rx: mpsc::Receiver<EngineMessage>,

    /// A poll is outstanding; ticks that land meanwhile are skipped.
    poll_in_flight: bool,
}

impl Engine {
    pub fn new(remote: Arc<dyn RemoteService>, settings: EngineSettings) -> Self {
        let (message_tx, message_rx) = mpsc::channel(ENGINE_CHANNEL_SIZE);
        let machine = ReservationMachine::new(&settings.appliances);
        let directory = UserDirectory::default();
        let snapshot = Arc::new(ArcSwap::from_pointee(build_snapshot(&machine, &directory)));

        Self {
            remote,
            settings,
            machine,
            directory,
            snapshot,
            message_tx,
            message_rx,
            poll_in_flight: false,
        }
    }

    pub fn handle(&self) -> EngineHandle {
        EngineHandle {
            snapshot: self.snapshot.clone(),
            message_tx: self.message_tx.clone(),
        }
    }

    /// Run the engine loop until `shutdown_rx` fires or its sender is dropped.
    ///
    /// Polls immediately, then every `poll_interval`. The poll timer is
    /// dropped on return; commands already in flight are left to finish.
    pub async fn run(mut self, mut shutdown_rx: oneshot::Receiver<()>) {
        info!(
            "Engine starting with appliances {:?} ({:?} mode)",
            self.settings.appliances,
            self.machine.mode()
        );

        self.spawn_names_load();

        let mut poll_timer = tokio::time::interval(self.settings.poll_interval);
        poll_timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut names_timer = self.settings.names_refresh_interval.map(|period| {
            let mut timer = tokio::time::interval_at(Instant::now() + period, period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            timer
        });

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = poll_timer.tick() => self.start_poll(),
                _ = tick_optional(&mut names_timer) => self.spawn_names_load(),
                Some(msg) = self.message_rx.recv() => self.handle_message(msg),
            }
        }

        info!("Engine shutting down");
    }

    fn handle_message(&mut self, msg: EngineMessage) {
        match msg {
            EngineMessage::Gesture(gesture) => self.handle_gesture(gesture),
            EngineMessage::Polled(report) => {
                self.poll_in_flight = false;
                let changed = self.machine.apply_poll(&report);
                if changed > 0 {
                    info!("Poll updated {} appliance(s)", changed);
                    self.publish();
                }
            }
            EngineMessage::NamesLoaded(directory) => {
                self.directory = directory;
                self.publish();
            }
            EngineMessage::CommandSettled { appliance } => {
                match self.machine.settle(appliance) {
                    Some(command) => {
                        info!("Committed {:?}", command);
                        self.publish();
                        // Reconcile with the service straight away rather than
                        // waiting for the next tick
                        self.start_poll();
                    }
                    None => debug!("No command in flight for {}, ignoring settle", appliance),
                }
            }
        }
    }

    fn handle_gesture(&mut self, gesture: Gesture) {
        if let Some(appliance) = self.machine.loading() {
            debug!(
                "Ignoring {:?} while a command for the {} is in flight",
                gesture, appliance
            );
            return;
        }

        let result = match gesture {
            Gesture::ClickAppliance(appliance) => self.machine.click_appliance(appliance),
            Gesture::ClickUser(slot) => self.machine.click_user(slot).map(Some),
            Gesture::CancelSelection => self.machine.cancel_selection().map(|()| None),
            Gesture::ToggleUser(slot) => self.machine.toggle_user(slot).map(Some),
        };

        match result {
            Ok(command) => {
                debug!("Applied {:?}, stage is now {:?}", gesture, self.machine.stage());
                if let Some(command) = command {
                    self.dispatch(command);
                }
                self.publish();
            }
            Err(e) => debug!("Rejected {:?}: {}", gesture, e),
        }
    }

    /// Send `command` and report back once it has settled.
    ///
    /// The outcome of the request does not matter: the settle message is sent
    /// after the delay either way, and the next poll corrects the display if
    /// the service did not apply the change.
    fn dispatch(&self, command: Command) {
        let remote = self.remote.clone();
        let message_tx = self.message_tx.clone();
        let settle_delay = self.settings.settle_delay;

        info!("Sending {:?}", command);
        tokio::spawn(async move {
            let appliance = command.appliance();
            let update = AgentStatusUpdate::from(command);
            match remote.set_agent_status(appliance, &update).await {
                Ok(()) => debug!("Service accepted {:?} for {}", update, appliance),
                Err(e) => warn!("Failed to set {} status: {}", appliance, e),
            }

            tokio::time::sleep(settle_delay).await;
            if message_tx
                .send(EngineMessage::CommandSettled { appliance })
                .await
                .is_err()
            {
                debug!("Engine stopped before the {} command settled", appliance);
            }
        });
    }

    fn start_poll(&mut self) {
        if self.poll_in_flight {
            debug!("Previous poll still running, skipping");
            return;
        }
        self.poll_in_flight = true;

        let remote = self.remote.clone();
        let message_tx = self.message_tx.clone();
        let appliances: Vec<Appliance> = self.machine.appliances().collect();
        tokio::spawn(async move {
            let report = poll_all(&remote, &appliances).await;
            if message_tx.send(EngineMessage::Polled(report)).await.is_err() {
                debug!("Engine stopped before poll results arrived");
            }
        });
    }

    fn spawn_names_load(&self) {
        let remote = self.remote.clone();
        let message_tx = self.message_tx.clone();
        tokio::spawn(async move {
            let directory = load_names(remote.as_ref()).await;
            if message_tx
                .send(EngineMessage::NamesLoaded(directory))
                .await
                .is_err()
            {
                debug!("Engine stopped before user names arrived");
            }
        });
    }

    fn publish(&self) {
        self.snapshot
            .store(Arc::new(build_snapshot(&self.machine, &self.directory)));
    }
}

fn build_snapshot(machine: &ReservationMachine, directory: &UserDirectory) -> Snapshot {
    Snapshot::new(
        machine.mode(),
        machine.stage(),
        machine.loading(),
        machine.views(),
        directory.clone(),
    )
}

async fn tick_optional(timer: &mut Option<Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}
