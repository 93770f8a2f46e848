pub mod locator;
pub mod navigator;

pub use locator::{LocatorStrategy, TextHeuristicLocator};
pub use navigator::{CdpNavigator, SourceNavigator};
