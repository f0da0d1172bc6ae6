#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Pinhole camera intrinsics.
pub mod camera;

/// I/O utilities for reading and writing sparse models.
pub mod io;

/// Linear algebra utilities.
pub mod linalg;

/// SLAM sequence to sparse reconstruction conversion.
pub mod pipeline;

/// Point cloud container.
pub mod pointcloud;

/// Camera pose conversion.
pub mod pose;

/// Depth back-projection into world space.
pub mod projector;

/// Validated sparse reconstruction model.
pub mod reconstruction;

/// Color and depth images.
pub mod rgbd;

/// 3D transforms algorithms.
pub mod transforms;

/// Conversions between arrays and faer views.
pub mod utils;
