//! Local camera capture abstraction.
//!
//! `MediaSource` owns the lifecycle of a device stream: asynchronous
//! acquisition against a `MediaDevice`, idempotent re-acquisition, and
//! release that stops every track exactly once.

pub mod source;
pub mod synthetic;
pub mod types;

pub use source::{FrameSource, MediaDevice, MediaSource, MediaStream, VideoTrack};
pub use types::{MediaConstraints, Resolution, VideoFrame};
