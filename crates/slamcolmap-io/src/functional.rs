use std::path::Path;

use slamcolmap_3d::rgbd::ColorImage;

use crate::{
    error::IoError,
    jpeg::{write_image_jpeg_rgb8, DEFAULT_JPEG_QUALITY},
    png::write_image_png_rgb8,
};

/// Writes a frame to disk, choosing the encoder from the file extension.
///
/// `jpg` and `jpeg` are written as JPEG at [`DEFAULT_JPEG_QUALITY`], `png` as
/// PNG. The comparison is case-insensitive.
///
/// # Errors
///
/// Returns [`IoError::InvalidFileExtension`] for any other extension.
pub fn write_frame_image(file_path: impl AsRef<Path>, image: &ColorImage) -> Result<(), IoError> {
    let file_path = file_path.as_ref();
    let extension = file_path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);

    match extension.as_deref() {
        Some("jpg") | Some("jpeg") => write_image_jpeg_rgb8(file_path, image, DEFAULT_JPEG_QUALITY),
        Some("png") => write_image_png_rgb8(file_path, image),
        _ => Err(IoError::InvalidFileExtension(file_path.to_path_buf())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_by_extension() -> Result<(), Box<dyn std::error::Error>> {
        let tmp_dir = tempfile::tempdir()?;
        let image = ColorImage::new(4, 4, vec![[9, 9, 9]; 16])?;

        write_frame_image(tmp_dir.path().join("00000.JPG"), &image)?;
        write_frame_image(tmp_dir.path().join("00001.png"), &image)?;
        assert!(tmp_dir.path().join("00000.JPG").is_file());
        assert!(tmp_dir.path().join("00001.png").is_file());

        let result = write_frame_image(tmp_dir.path().join("00002.bmp"), &image);
        assert!(matches!(result, Err(IoError::InvalidFileExtension(_))));
        Ok(())
    }
}
