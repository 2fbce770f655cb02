//! Data model shared by every stage of the pipeline
//!
//! - [`EventRecord`]: one extracted event, keyed by its canonical `source_url`
//! - [`SourceDescriptor`]: caller intent, consumed once by the resolver
//! - [`BatchRun`]: the ordered, per-descriptor result of one orchestration call

mod batch;
mod descriptor;
mod record;

pub use batch::{dedup_records, BatchEntry, BatchRun, EntryError, ErrorKind};
pub use descriptor::{BatchRequest, PageShape, SourceDescriptor};
pub use record::{absent_name_value, absent_value, EventRecord, Origin, UNKNOWN_NAME};
