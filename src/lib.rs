pub mod adapters;
pub mod api;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::cli::ServerArgs;

pub use crate::adapters::{pagerduty::PagerDutyClient, url_reader::ArchiveUrlReader};
pub use crate::config::AppConfig;
pub use crate::core::{
    doc_root::{resolve_doc_root, DocRef, TECHDOCS_REF_ANNOTATION},
    poller::{PollerHandle, ServicePoller},
    service_cache::ServiceCache,
};
pub use crate::utils::error::{PluginError, Result};
