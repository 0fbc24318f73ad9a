//! The reservation state machine.
//!
//! The machine is synchronous and does no I/O. Gestures return the
//! [`Command`] that has to be sent to the status service; the caller sends it,
//! waits for the settle delay, and then calls [`ReservationMachine::settle`]
//! to commit the optimistic local change.

use std::collections::BTreeMap;

use super::state::Appliance;
use super::state::ApplianceView;
use super::state::InteractionMode;
use super::state::Stage;
use super::state::UserSlot;
use super::status::PollReport;
use crate::remote::AgentStatusUpdate;

/// A reservation change to send to the status service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Start monitoring `appliance` on behalf of `slot`.
    Claim { appliance: Appliance, slot: UserSlot },

    /// Mark `appliance` idle.
    Release { appliance: Appliance },
}

impl Command {
    pub fn appliance(&self) -> Appliance {
        match self {
            Command::Claim { appliance, .. } | Command::Release { appliance } => *appliance,
        }
    }
}

impl From<Command> for AgentStatusUpdate {
    fn from(command: Command) -> Self {
        match command {
            Command::Claim { slot, .. } => AgentStatusUpdate::monitor(slot),
            Command::Release { .. } => AgentStatusUpdate::idle(),
        }
    }
}

/// Why a gesture was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GestureError {
    #[error("the {0} is not part of this display")]
    UnknownAppliance(Appliance),

    #[error("a user picker is already open for the {0}")]
    SelectionOpen(Appliance),

    #[error("no appliance is selected")]
    NoSelection,

    #[error("toggling needs exactly one appliance, this display has {0}")]
    ToggleUnavailable(usize),
}

/// Interaction flow and occupancy for one display.
#[derive(Debug, Clone)]
pub struct ReservationMachine {
    occupancy: BTreeMap<Appliance, Option<UserSlot>>,
    stage: Stage,

    /// The command waiting to be settled. Its appliance is the one `loading`.
    in_flight: Option<Command>,
}

impl ReservationMachine {
    /// A machine for `appliances`, all free, in [`Stage::Main`].
    pub fn new(appliances: &[Appliance]) -> Self {
        Self {
            occupancy: appliances.iter().map(|&a| (a, None)).collect(),
            stage: Stage::Main,
            in_flight: None,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Appliance with an outstanding command.
    pub fn loading(&self) -> Option<Appliance> {
        self.in_flight.map(|command| command.appliance())
    }

    pub fn mode(&self) -> InteractionMode {
        InteractionMode::for_appliance_count(self.occupancy.len())
    }

    pub fn appliances(&self) -> impl Iterator<Item = Appliance> + '_ {
        self.occupancy.keys().copied()
    }

    pub fn occupant(&self, appliance: Appliance) -> Option<UserSlot> {
        self.occupancy.get(&appliance).copied().flatten()
    }

    pub fn views(&self) -> Vec<ApplianceView> {
        let loading = self.loading();
        self.occupancy
            .iter()
            .map(|(&appliance, &occupant)| ApplianceView {
                appliance,
                occupant,
                pending: loading == Some(appliance),
            })
            .collect()
    }

    /// An appliance tile was tapped.
    ///
    /// An occupied appliance is released regardless of who holds it and a
    /// [`Command::Release`] is returned. A free appliance opens the user
    /// picker and returns no command.
    pub fn click_appliance(&mut self, appliance: Appliance) -> Result<Option<Command>, GestureError> {
        let occupant = *self
            .occupancy
            .get(&appliance)
            .ok_or(GestureError::UnknownAppliance(appliance))?;
        if let Stage::SelectingUser { appliance: open } = self.stage {
            return Err(GestureError::SelectionOpen(open));
        }

        match occupant {
            Some(_) => Ok(Some(self.begin(Command::Release { appliance }))),
            None => {
                self.stage = Stage::SelectingUser { appliance };
                Ok(None)
            }
        }
    }

    /// A user was picked for the selected appliance.
    ///
    /// The picker stays open until the claim settles.
    pub fn click_user(&mut self, slot: UserSlot) -> Result<Command, GestureError> {
        let Stage::SelectingUser { appliance } = self.stage else {
            return Err(GestureError::NoSelection);
        };
        Ok(self.begin(Command::Claim { appliance, slot }))
    }

    /// The user picker was dismissed.
    pub fn cancel_selection(&mut self) -> Result<(), GestureError> {
        if self.stage.target().is_none() {
            return Err(GestureError::NoSelection);
        }
        self.stage = Stage::Main;
        Ok(())
    }

    /// A user tile was tapped on a single-appliance display.
    ///
    /// Releases the appliance if `slot` holds it, otherwise claims it for
    /// `slot`, which takes it away from the other user.
    pub fn toggle_user(&mut self, slot: UserSlot) -> Result<Command, GestureError> {
        let (&appliance, &occupant) = match self.occupancy.len() {
            1 => self
                .occupancy
                .iter()
                .next()
                .ok_or(GestureError::ToggleUnavailable(0))?,
            n => return Err(GestureError::ToggleUnavailable(n)),
        };
        if let Stage::SelectingUser { appliance: open } = self.stage {
            return Err(GestureError::SelectionOpen(open));
        }

        let command = if occupant == Some(slot) {
            Command::Release { appliance }
        } else {
            Command::Claim { appliance, slot }
        };
        Ok(self.begin(command))
    }

    /// Commit the in-flight command for `appliance`.
    ///
    /// Returns the committed command, or `None` if nothing was in flight for
    /// that appliance.
    pub fn settle(&mut self, appliance: Appliance) -> Option<Command> {
        let command = self.in_flight.filter(|c| c.appliance() == appliance)?;
        self.in_flight = None;

        match command {
            Command::Claim { appliance, slot } => {
                self.set_occupant(appliance, Some(slot));
                if self.stage.target() == Some(appliance) {
                    self.stage = Stage::Main;
                }
            }
            Command::Release { appliance } => self.set_occupant(appliance, None),
        }
        Some(command)
    }

    /// Fold a poll report into the occupancy map.
    ///
    /// Failed entries keep their previous occupant. Stage and loading are
    /// left alone. Returns the number of appliances whose occupant changed.
    pub fn apply_poll(&mut self, report: &PollReport) -> usize {
        let mut changed = 0;
        for (appliance, result) in report {
            let Ok(occupant) = result else {
                continue;
            };
            if let Some(current) = self.occupancy.get_mut(appliance) {
                if *current != *occupant {
                    *current = *occupant;
                    changed += 1;
                }
            }
        }
        changed
    }

    fn begin(&mut self, command: Command) -> Command {
        self.in_flight = Some(command);
        command
    }

    fn set_occupant(&mut self, appliance: Appliance, occupant: Option<UserSlot>) {
        if let Some(current) = self.occupancy.get_mut(&appliance) {
            *current = occupant;
        }
    }
}
