//! ReelSync Metadata Loader
//!
//! The I/O shell around the pure processing core:
//! - **Sources:** the [`MetadataSource`] seam and its filesystem implementation
//! - **Loader:** concurrent loads with a session cache and in-flight deduplication
//! - **Export:** per clip, per chunk telemetry slices plus the frame layout
//!
//! This is the only crate in the engine that touches the disk or runs async code.

pub mod error;
pub mod export;
pub mod loader;
pub mod source;

pub use error::LoaderError;
pub use export::{plan_export, ExportPlan};
pub use loader::ParallelMetadataLoader;
pub use source::{Fingerprint, FsMetadataSource, MetadataSource, RecordingMetadata};
