//! Messages consumed by the engine loop.
//!
//! Everything that changes display state arrives as an `EngineMessage`:
//! gestures from the presentation layer, and results posted back by the
//! engine's own poll, directory and command tasks.

use super::directory::UserDirectory;
use super::state::Appliance;
use super::state::UserSlot;
use super::status::PollReport;

/// User input from the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gesture {
    ClickAppliance(Appliance),
    ClickUser(UserSlot),
    CancelSelection,

    /// Single-appliance displays only.
    ToggleUser(UserSlot),
}

#[derive(Debug)]
pub(crate) enum EngineMessage {
    Gesture(Gesture),

    /// A status poll finished.
    Polled(PollReport),

    /// The user directory was (re)loaded.
    NamesLoaded(UserDirectory),

    /// The command for `appliance` completed and its settle delay elapsed.
    CommandSettled { appliance: Appliance },
}
