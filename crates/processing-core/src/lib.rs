//! ReelSync Processing Core: the auto-editing intelligence
//!
//! Turns recorded telemetry into editing suggestions and export slices:
//! - **Motion clustering:** Detect dense pointer activity and generate zoom blocks
//! - **Typing detection:** Find typing bursts and suggest speed-ups
//! - **Range filtering:** Binary-search slicing of sorted telemetry for export chunks
//!
//! This crate is pure computation with no I/O and no global state.
//! All inputs are data; all outputs are data.

pub mod motion_cluster;
pub mod range_filter;
pub mod suggestions;
pub mod typing;

pub use motion_cluster::{MotionClusterConfig, MotionClusterDetector};
pub use range_filter::TimeWindow;
pub use suggestions::{SuggestionCache, SuggestionEngine};
pub use typing::TypingClusterDetector;
