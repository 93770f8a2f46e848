pub mod bridge;
pub mod browser;
pub mod core;
pub mod dom;
pub mod extract;
pub mod sink;

// --- Primary core exports ---
pub use crate::core::config;
pub use crate::core::types;
pub use crate::core::types::*;
pub use crate::core::{BridgeError, Selectors, TapConfig, Timing};

pub use crate::bridge::{CaptureBridge, CdpCaptureBridge};
pub use crate::dom::{CdpNavigator, LocatorStrategy, SourceNavigator, TextHeuristicLocator};
pub use crate::extract::Orchestrator;
pub use crate::sink::{TextFileSink, UrlSink};
