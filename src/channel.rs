pub mod tracking_channel;
pub mod types;

pub use tracking_channel::TrackingChannel;
pub use types::{ChannelState, DetectionFrame, FaceBox, FrameEnvelope, FrameSink, GazePoint};
