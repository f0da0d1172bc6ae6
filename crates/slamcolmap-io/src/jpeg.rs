use crate::error::IoError;
use jpeg_encoder::{ColorType, Encoder};
use slamcolmap_3d::rgbd::ColorImage;
use std::path::Path;

/// Default JPEG quality used for exported frames.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;

/// Writes the given JPEG _(rgb8)_ data to the given file path.
///
/// # Arguments
///
/// - `file_path` - The path to the JPEG image.
/// - `image` - The color image to encode.
/// - `quality` - The quality of the JPEG encoding, range from 0 (lowest) to 100 (highest)
pub fn write_image_jpeg_rgb8(
    file_path: impl AsRef<Path>,
    image: &ColorImage,
    quality: u8,
) -> Result<(), IoError> {
    let encoder = Encoder::new_file(file_path, quality)?;
    encoder.encode(
        image.as_bytes(),
        image.width() as u16,
        image.height() as u16,
        ColorType::Rgb,
    )?;
    Ok(())
}
