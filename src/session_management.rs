pub mod descriptor;
pub mod pipeline;
pub mod timer;

pub use descriptor::{format_clock, SessionDescriptor};
pub use pipeline::TrackingPipeline;
pub use timer::SessionTimer;
