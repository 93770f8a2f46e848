pub mod config;
pub mod error;
pub mod types;

pub use self::config::{Selectors, TapConfig, Timing};
pub use self::error::BridgeError;
