//! ReelSync Project Model
//!
//! Defines the core data contracts shared by the engine:
//! - **Events:** Timestamped telemetry (mouse, click, keyboard, scroll)
//! - **Project:** Recordings, tracks, and clip placements
//! - **Timeline:** Generated effects (zoom blocks, typing periods) and frame layout items
//!
//! Telemetry timestamps are integer milliseconds since recording start.
//! Timeline and source positions are fractional milliseconds.

pub mod event;
pub mod project;
pub mod timeline;

pub use event::*;
pub use project::*;
pub use timeline::*;
