use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::codecs::jpeg::JpegEncoder;

use crate::error_handling::types::CaptureError;
use crate::media_source::types::VideoFrame;

/// Encodes one frame as a JPEG data URL, the format the backend's
/// decoder expects (`data:image/jpeg;base64,...`).
pub fn encode_data_url(frame: &VideoFrame, quality: u8) -> Result<String, CaptureError> {
    let mut jpeg = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder
        .encode_image(&frame.image)
        .map_err(|e| CaptureError::EncodeFailed(e.to_string()))?;
    Ok(format!("data:image/jpeg;base64,{}", STANDARD.encode(&jpeg)))
}
