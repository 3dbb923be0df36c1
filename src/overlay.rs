pub mod renderer;
pub mod types;

pub use renderer::OverlayRenderer;
pub use types::{GazeBlob, OverlayFrame, Viewport};
