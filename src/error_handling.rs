pub mod types;

pub use types::{ApiError, CaptureError, ChannelError, ConfigError, StateError};
