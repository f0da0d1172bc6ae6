#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Loading of SLAM recordings stored as `.npz` archives.
///
/// See [`archive::read_slam_archive`] for the accepted field names and shapes.
pub mod archive;

/// Error types for I/O operations.
///
/// Defines [`error::IoError`] variants for file access, archive decoding and
/// encoding failures.
pub mod error;

/// High-level frame writing functions.
///
/// Picks the encoder from the file extension.
/// See [`functional::write_frame_image`].
pub mod functional;

/// JPEG image encoding.
pub mod jpeg;

/// Directory layout of a conversion output.
pub mod layout;

/// Video metadata extraction and field of view estimation.
pub mod metadata;

/// PNG image encoding.
pub mod png;
