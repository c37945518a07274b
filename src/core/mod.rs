pub mod doc_root;
pub mod poller;
pub mod service_cache;

pub use crate::domain::model::{CacheState, Entity, PollOutcome, ServiceRecord};
pub use crate::domain::ports::{ReadTreeResponse, ServiceSource, UrlReader};
pub use crate::utils::error::Result;
