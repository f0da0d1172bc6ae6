mod binary;
mod repair;
mod text;
mod types;

pub use binary::*;
pub use repair::*;
pub use text::*;
pub use types::*;

use std::path::{Path, PathBuf};

use crate::{
    projector::{self, FallbackConfig, ProjectorError},
    reconstruction::{Reconstruction, ReconstructionError},
};

/// Subdirectory searched for the text model when the sparse directory has none.
pub const TEXT_BACKUP_DIR: &str = "text_backup";

/// Error types for the COLMAP module.
#[derive(Debug, thiserror::Error)]
pub enum ColmapError {
    /// Error reading or writing file
    #[error("error reading or writing file")]
    IoError(#[from] std::io::Error),

    /// A required input file is missing
    #[error("Missing file {0}")]
    MissingFile(PathBuf),

    /// Invalid number of camera parameters
    #[error("Invalid number of camera parameters: {0}")]
    InvalidNumCameraParams(usize),

    /// The camera model is not the pinhole model
    #[error("Unsupported camera model {0}")]
    UnsupportedCameraModel(String),

    /// Parse error
    #[error("Parse error {0}")]
    ParseError(String),

    /// Failed to encode a binary record
    #[error("Failed to encode binary record")]
    Encode(#[from] bincode::error::EncodeError),

    /// Failed to decode a binary record
    #[error("Failed to decode binary record")]
    Decode(#[from] bincode::error::DecodeError),

    /// The decoded model breaks an invariant of the reconstruction
    #[error("Invalid reconstruction: {0}")]
    InvalidReconstruction(#[from] ReconstructionError),

    /// The fallback point cloud could not be generated
    #[error(transparent)]
    Fallback(#[from] ProjectorError),
}

/// Write a reconstruction to `dir` in the given format.
///
/// The directory is created if needed. Files of the other format are removed
/// first so that readers never see a mix of stale and fresh files. Each file is
/// written sequentially from the finalized model.
pub fn write_sparse_model(
    dir: impl AsRef<Path>,
    reconstruction: &Reconstruction,
    format: SparseFormat,
) -> Result<(), ColmapError> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;
    remove_sparse_files(dir, format.other())?;

    match format {
        SparseFormat::Text => write_model_text(dir, reconstruction),
        SparseFormat::Binary => write_model_binary(dir, reconstruction),
    }
}

/// Read a reconstruction from `dir`, detecting the format when `format` is `None`.
pub fn read_sparse_model(
    dir: impl AsRef<Path>,
    format: Option<SparseFormat>,
) -> Result<Reconstruction, ColmapError> {
    let dir = dir.as_ref();
    let format = match format.or_else(|| SparseFormat::detect(dir)) {
        Some(format) => format,
        None => return Err(ColmapError::MissingFile(dir.join(IMAGES_BIN))),
    };
    match format {
        SparseFormat::Text => read_model_text(dir),
        SparseFormat::Binary => read_model_binary(dir),
    }
}

/// Convert the text model in `sparse_dir` into binary files in `output_dir`.
///
/// When `sparse_dir` holds no `images.txt` the model is read from its
/// [`TEXT_BACKUP_DIR`] subdirectory. A model without points gets a random cloud
/// generated from `fallback`. Binary files already in `output_dir` are replaced;
/// the text files are left untouched.
///
/// # Errors
///
/// Fails with [`ColmapError::MissingFile`] when neither directory holds both
/// `cameras.txt` and `images.txt`.
pub fn convert_text_to_binary(
    sparse_dir: impl AsRef<Path>,
    output_dir: impl AsRef<Path>,
    fallback: &FallbackConfig,
) -> Result<Reconstruction, ColmapError> {
    let sparse_dir = sparse_dir.as_ref();
    let output_dir = output_dir.as_ref();

    let text_dir = if sparse_dir.join(IMAGES_TXT).is_file() {
        sparse_dir.to_path_buf()
    } else {
        let backup = sparse_dir.join(TEXT_BACKUP_DIR);
        log::info!("looking for text files in {}", backup.display());
        backup
    };

    let mut reconstruction = read_model_text(&text_dir)?;
    log::info!(
        "read {} cameras and {} images from {}",
        reconstruction.num_cameras(),
        reconstruction.num_images(),
        text_dir.display()
    );

    if reconstruction.num_points() == 0 {
        log::warn!(
            "no 3D points in the text model, generating {} random points",
            fallback.num_points
        );
        let cloud = projector::random_point_cloud(fallback)?;
        reconstruction = reconstruction.with_point_cloud(&cloud)?;
    }

    std::fs::create_dir_all(output_dir)?;
    remove_sparse_files(output_dir, SparseFormat::Binary)?;
    write_model_binary(output_dir, &reconstruction)?;

    Ok(reconstruction)
}

/// Delete the cameras, images and points files of `format` from `dir` if present.
pub fn remove_sparse_files(dir: impl AsRef<Path>, format: SparseFormat) -> Result<(), ColmapError> {
    for name in format.file_names() {
        let path = dir.as_ref().join(name);
        if path.is_file() {
            log::debug!("removing stale {}", path.display());
            std::fs::remove_file(&path)?;
        }
    }
    Ok(())
}

/// Fail with [`ColmapError::MissingFile`] unless `path` is a file.
pub(crate) fn require_file(path: &Path) -> Result<(), ColmapError> {
    if path.is_file() {
        Ok(())
    } else {
        Err(ColmapError::MissingFile(path.to_path_buf()))
    }
}
