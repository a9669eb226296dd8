pub mod scripted_llm;

use std::sync::Arc;

use inspect_store::{ReportService, SqliteStore};

pub use scripted_llm::ScriptedLlm;

/// Report service over a private in-memory database.
pub fn memory_service() -> ReportService {
    let store = SqliteStore::open_in_memory().expect("Failed to open in-memory store");
    ReportService::new(Arc::new(store))
}
