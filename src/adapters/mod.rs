// Adapters layer: concrete implementations for external systems.

pub mod pagerduty;
pub mod url_reader;
