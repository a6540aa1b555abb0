//! ReelSync Timeline Core
//!
//! Keeps the editable timeline consistent while the user edits:
//! - **Time conversion:** ms, pixels, frames, and clip-relative remapping
//! - **Frame layout:** gap-free frame ranges for the renderer
//! - **Positioning:** overlap checks, magnetic snapping, auto placement
//! - **Playhead:** active/next clip resolution and remapping across edits
//! - **Snapshots:** copy-on-write timeline state with explicit commits
//!
//! Everything except [`snapshot::TimelineStore`] is a pure function of its inputs.

pub mod frame_layout;
pub mod playhead;
pub mod positioning;
pub mod reorder;
pub mod snapshot;
pub mod time_convert;

pub use frame_layout::build_frame_layout;
pub use playhead::PlayheadResolver;
pub use positioning::{PositioningEngine, SnapConfig};
pub use snapshot::{CommitError, EditError, TimelineDraft, TimelineSnapshot, TimelineStore};
pub use time_convert::TimeScale;
