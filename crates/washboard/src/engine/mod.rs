mod directory;
mod engine;
mod machine;
mod message;
pub mod state;
mod status;

pub use directory::load_names;
pub use directory::parse_names;
pub use directory::UserDirectory;
pub use directory::UserInfo;
pub use directory::DIRECTORY_ERROR_BANNER;
pub use engine::Engine;
pub use engine::EngineError;
pub use engine::EngineHandle;
pub use engine::EngineSettings;
pub use machine::Command;
pub use machine::GestureError;
pub use machine::ReservationMachine;
pub use message::Gesture;
pub use state::Appliance;
pub use state::ApplianceView;
pub use state::InteractionMode;
pub use state::Snapshot;
pub use state::Stage;
pub use state::UserSlot;
pub use status::interpret_status;
pub use status::poll_all;
pub use status::PollReport;
