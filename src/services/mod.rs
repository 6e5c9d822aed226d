//! Request-level operations composed from the queue, store and relay adapters.

mod history;
mod ingest;

pub use history::{HistoryService, resolve_limit};
pub use ingest::IngestService;
