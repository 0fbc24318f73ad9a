pub mod api;
pub mod config;
pub mod engine;
pub mod remote;

pub use config::Config;
pub use config::ConfigError;
pub use config::LogLevel;
pub use engine::Engine;
pub use engine::EngineHandle;
pub use engine::Snapshot;
pub use remote::HttpRemote;
pub use remote::RemoteService;
