//! CLI parsing and capability configuration

pub mod capability;
pub mod cli;

pub use capability::CapabilityConfig;
pub use cli::Cli;
