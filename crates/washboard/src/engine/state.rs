use serde::Deserialize;
use serde::Serialize;
use strum::Display;
use strum::EnumString;

use super::directory::UserDirectory;
use super::directory::DIRECTORY_ERROR_BANNER;

/// A shared appliance that can be held by at most one user at a time.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Appliance {
    Washer,
    Dryer,
}

/// One of the two user identities known to the display.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum UserSlot {
    User1,
    User2,
}

/// Where the interaction flow currently is.
///
/// The selected appliance lives inside the `SelectingUser` variant, so a user
/// picker without a target cannot be expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stage {
    /// No appliance is selected; appliance tiles are shown.
    #[default]
    Main,

    /// A user picker is open for `appliance`.
    SelectingUser { appliance: Appliance },
}

impl Stage {
    /// The appliance the user picker is open for, if any.
    pub fn target(&self) -> Option<Appliance> {
        match self {
            Stage::Main => None,
            Stage::SelectingUser { appliance } => Some(*appliance),
        }
    }
}

/// Which gestures the display offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Pick an appliance, then pick a user.
    TwoStage,

    /// A single appliance; each user tile toggles that user's hold directly.
    Toggle,
}

impl InteractionMode {
    pub fn for_appliance_count(count: usize) -> Self {
        if count == 1 {
            InteractionMode::Toggle
        } else {
            InteractionMode::TwoStage
        }
    }
}

/// Display state of a single appliance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApplianceView {
    pub appliance: Appliance,

    /// Who currently holds the appliance.
    pub occupant: Option<UserSlot>,

    /// A command for this appliance is in flight or inside its settle window.
    pub pending: bool,
}

/// Immutable snapshot of everything the presentation layer renders.
///
/// The engine publishes a fresh snapshot after every state change; readers
/// never observe a half-applied transition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub mode: InteractionMode,
    pub stage: Stage,

    /// Appliance with an outstanding command. Input is suppressed while set.
    pub loading: Option<Appliance>,

    pub appliances: Vec<ApplianceView>,
    pub users: UserDirectory,

    /// Sticky banner shown while the user directory is on its fallback.
    pub banner: Option<&'static str>,
}

impl Snapshot {
    pub fn new(
        mode: InteractionMode,
        stage: Stage,
        loading: Option<Appliance>,
        appliances: Vec<ApplianceView>,
        users: UserDirectory,
    ) -> Self {
        let banner = users.error.then_some(DIRECTORY_ERROR_BANNER);
        Self {
            mode,
            stage,
            loading,
            appliances,
            users,
            banner,
        }
    }

    /// Occupant of `appliance`, or `None` when it is free or not shown.
    pub fn occupant(&self, appliance: Appliance) -> Option<UserSlot> {
        self.appliances
            .iter()
            .find(|view| view.appliance == appliance)
            .and_then(|view| view.occupant)
    }
}
