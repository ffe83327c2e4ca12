use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use thiserror::Error;

use crate::core::config::ImageSettings;

const START_QUALITY: u8 = 90;
const QUALITY_STEP: u8 = 10;
const MIN_QUALITY: u8 = 10;
const FALLBACK_SCALE: f32 = 0.7;
const FALLBACK_QUALITY: u8 = 70;

#[derive(Debug, Error)]
pub(crate) enum ImagePipelineError {
    #[error("failed to decode image: {0}")]
    Decode(image::ImageError),
    #[error("failed to encode image: {0}")]
    Encode(image::ImageError),
}

#[derive(Debug)]
pub(crate) struct CompressedImage {
    pub(crate) bytes: Vec<u8>,
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) quality: u8,
}

/// Re-encodes an uploaded image under the configured byte budget: bound the
/// dimensions, then walk the JPEG quality ladder down, then take one final
/// fixed-ratio downscale. The budget is best-effort: at the quality floor
/// the result may still exceed it. Undecodable input is an error, never
/// passed through.
pub(crate) fn compress_to_budget(
    input: &[u8],
    settings: &ImageSettings,
) -> Result<CompressedImage, ImagePipelineError> {
    let decoded = image::load_from_memory(input).map_err(ImagePipelineError::Decode)?;

    let max_dimension = settings.max_dimension;
    let mut working = if decoded.width() > max_dimension || decoded.height() > max_dimension {
        decoded.resize(max_dimension, max_dimension, FilterType::Triangle)
    } else {
        decoded
    };

    let budget = settings.max_encoded_bytes as usize;
    let mut quality = START_QUALITY;
    let mut bytes = encode_jpeg(&working, quality)?;

    while bytes.len() > budget && quality > MIN_QUALITY {
        quality -= QUALITY_STEP;
        bytes = encode_jpeg(&working, quality)?;
    }

    if bytes.len() > budget {
        let width = ((working.width() as f32 * FALLBACK_SCALE).round() as u32).max(1);
        let height = ((working.height() as f32 * FALLBACK_SCALE).round() as u32).max(1);
        working = working.resize_exact(width, height, FilterType::Triangle);
        quality = FALLBACK_QUALITY;
        bytes = encode_jpeg(&working, quality)?;
    }

    Ok(CompressedImage { width: working.width(), height: working.height(), quality, bytes })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, ImagePipelineError> {
    let mut buffer = Vec::new();
    let rgb = image.to_rgb8();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&rgb)
        .map_err(ImagePipelineError::Encode)?;
    Ok(buffer)
}
