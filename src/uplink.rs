pub mod encoder;
pub mod sampler;

pub use encoder::encode_data_url;
pub use sampler::FrameUplink;
