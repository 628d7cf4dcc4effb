//! Shared types for the solsplit pipeline.
//!
//! The pipeline stages communicate across process invocations through the
//! [`record::PartitionRecord`] persisted next to the generated contract
//! sources. Everything else in here is naming and version plumbing used by
//! more than one stage.

pub mod naming;
pub mod record;
pub mod version;

pub use record::{PartitionRecord, RecordError, SCHEMA_VERSION};
