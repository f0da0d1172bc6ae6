use slamcolmap_3d::{camera::CameraError, rgbd::RgbdError};

/// An error type for the io module.
#[derive(thiserror::Error, Debug)]
pub enum IoError {
    /// Error when the file does not exist.
    #[error("File does not exist: {0}")]
    FileDoesNotExist(std::path::PathBuf),

    /// Invalid file extension.
    #[error("File does not have a valid extension: {0}")]
    InvalidFileExtension(std::path::PathBuf),

    /// Error to open the file.
    #[error("Failed to manipulate the file. {0}")]
    FileError(#[from] std::io::Error),

    /// Error to read an array from the archive.
    #[error("Failed to read the npz archive. {0}")]
    NpzError(#[from] ndarray_npy::ReadNpzError),

    /// A required array is missing from the archive.
    #[error("Missing field {0:?} in the archive (also tried {1:?})")]
    MissingField(&'static str, &'static [&'static str]),

    /// An array of the archive does not have the expected shape.
    #[error("Field {field:?} has shape {shape:?}, expected {expected}")]
    InvalidShape {
        /// Name of the array
        field: String,
        /// Shape found in the archive
        shape: Vec<usize>,
        /// Description of the expected shape
        expected: &'static str,
    },

    /// The camera matrix does not describe a valid pinhole camera.
    #[error("Invalid intrinsics. {0}")]
    InvalidIntrinsics(#[from] CameraError),

    /// Error to build a frame from its buffers.
    #[error("Failed to create frame. {0}")]
    FrameCreationError(#[from] RgbdError),

    /// Error to encode the JPEG image.
    #[error("Error with Jpeg encoding. {0}")]
    JpegEncodingError(#[from] jpeg_encoder::EncodingError),

    /// Error to encode the PNG image.
    #[error("Failed to encode the png image. {0}")]
    PngEncodingError(String),

    /// Error to run or parse the output of ffprobe.
    #[error("Failed to probe the video. {0}")]
    ProbeError(String),

    /// Error to parse JSON.
    #[error("Failed to parse JSON. {0}")]
    JsonError(#[from] serde_json::Error),
}
