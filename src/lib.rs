//! A single-file storage engine demonstrating the machinery behind
//! transactional durability: a paged heap file, a pinned buffer pool,
//! before-image-isolated transactions, a write-ahead journal, and
//! ARIES-style UNDO/REDO recovery with checkpointing.
//!
//! The whole engine sits behind one coarse mutex (see [`Engine`]):
//! there is no fine-grained locking and no deadlock detection, because
//! at most one transaction is ever open at a time.

mod buffer_pool;
mod config;
mod engine;
mod error;
mod heap_file;
mod journal;
pub mod logging;
mod record;
mod recovery;
mod transaction;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use logging::init_log;
pub use record::{PAGE_SIZE, RECORDS_PER_PAGE, RECORD_SIZE};
