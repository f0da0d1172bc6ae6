use std::collections::{BTreeMap, HashSet};

use crate::{
    camera::CameraIntrinsics,
    pointcloud::PointCloud,
    pose::{Pose, PoseError},
};

/// File extensions accepted for image names, compared case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

/// Id of the single camera shared by every image.
pub const CANONICAL_CAMERA_ID: u32 = 1;

/// Error types for the reconstruction module.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructionError {
    /// Ids must start at 1
    #[error("{0} id must be at least 1")]
    ZeroId(&'static str),

    /// An id appears twice
    #[error("Duplicate {0} id {1}")]
    DuplicateId(&'static str, u64),

    /// Ids do not form the range 1..=N
    #[error("{0} ids are not dense: expected {1}, found {2}")]
    NonDenseIds(&'static str, u64, u64),

    /// An image references a camera that does not exist
    #[error("Image {image_id} references unknown camera {camera_id}")]
    UnknownCamera {
        /// Image id
        image_id: u32,
        /// Referenced camera id
        camera_id: u32,
    },

    /// Two images share a name
    #[error("Duplicate image name {0:?}")]
    DuplicateName(String),

    /// An image name does not end in a known image extension
    #[error("Image name {0:?} does not have an image extension")]
    InvalidImageName(String),

    /// An image pose is not valid
    #[error("Invalid pose for image {0}: {1}")]
    InvalidPose(u32, PoseError),

    /// A point has a non-finite position or a negative error
    #[error("Invalid point {0}: {1}")]
    InvalidPoint(u64, &'static str),
}

/// A camera of the reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera id, at least 1
    pub id: u32,
    /// Pinhole intrinsics
    pub intrinsics: CameraIntrinsics,
}

/// A posed frame of the reconstruction. It references its pixels by file name only.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    /// Image id, at least 1
    pub id: u32,
    /// File name of the frame, relative to the images directory
    pub name: String,
    /// Id of the camera that captured the frame
    pub camera_id: u32,
    /// World-to-camera pose
    pub pose: Pose,
}

/// A 3D point of the reconstruction.
#[derive(Debug, Clone, PartialEq)]
pub struct Point3D {
    /// Point id, at least 1
    pub id: u64,
    /// Position in world coordinates
    pub position: [f64; 3],
    /// RGB color
    pub color: [u8; 3],
    /// Mean reprojection error, non-negative
    pub error: f64,
    /// Observations as `(image_id, point2d_index)` pairs
    pub track: Vec<(u32, u32)>,
}

/// A validated sparse reconstruction: cameras, posed images and a point cloud.
///
/// The aggregate is immutable; regenerate it to change anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Reconstruction {
    cameras: BTreeMap<u32, Camera>,
    images: BTreeMap<u32, Image>,
    points: Vec<Point3D>,
}

/// Check that ids start at 1, are unique, and in the given order form `1..=N`.
fn check_dense_ids(
    kind: &'static str,
    ids: impl Iterator<Item = u64>,
) -> Result<(), ReconstructionError> {
    for (expected, id) in (1u64..).zip(ids) {
        if id == 0 {
            return Err(ReconstructionError::ZeroId(kind));
        }
        if id < expected {
            return Err(ReconstructionError::DuplicateId(kind, id));
        }
        if id != expected {
            return Err(ReconstructionError::NonDenseIds(kind, expected, id));
        }
    }
    Ok(())
}

/// Returns true when the name ends in one of [`IMAGE_EXTENSIONS`].
pub fn has_image_extension(name: &str) -> bool {
    name.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty()
            && IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

impl Reconstruction {
    /// Build a reconstruction, enforcing all of its invariants.
    ///
    /// Images are sorted by id and points are kept in the given order. Camera ids
    /// must be unique and at least 1; image and point ids must form `1..=N`.
    /// Image names must be unique.
    pub fn new(
        cameras: Vec<Camera>,
        images: Vec<Image>,
        points: Vec<Point3D>,
    ) -> Result<Self, ReconstructionError> {
        let mut camera_map = BTreeMap::new();
        for camera in cameras {
            if camera.id == 0 {
                return Err(ReconstructionError::ZeroId("camera"));
            }
            let id = camera.id;
            if camera_map.insert(id, camera).is_some() {
                return Err(ReconstructionError::DuplicateId("camera", id as u64));
            }
        }

        let mut image_map = BTreeMap::new();
        for image in images {
            if image.id == 0 {
                return Err(ReconstructionError::ZeroId("image"));
            }
            if !camera_map.contains_key(&image.camera_id) {
                return Err(ReconstructionError::UnknownCamera {
                    image_id: image.id,
                    camera_id: image.camera_id,
                });
            }
            if !has_image_extension(&image.name) {
                return Err(ReconstructionError::InvalidImageName(image.name));
            }
            // re-run the pose checks, the pose may come from a decoded file
            Pose::new(*image.pose.rotation(), *image.pose.translation())
                .map_err(|e| ReconstructionError::InvalidPose(image.id, e))?;
            let id = image.id;
            if image_map.insert(id, image).is_some() {
                return Err(ReconstructionError::DuplicateId("image", id as u64));
            }
        }
        check_dense_ids("image", image_map.keys().map(|&id| id as u64))?;
        let mut names = HashSet::with_capacity(image_map.len());
        for image in image_map.values() {
            if !names.insert(image.name.as_str()) {
                return Err(ReconstructionError::DuplicateName(image.name.clone()));
            }
        }

        for point in &points {
            if point.position.iter().any(|v| !v.is_finite()) {
                return Err(ReconstructionError::InvalidPoint(point.id, "non-finite position"));
            }
            if !(point.error.is_finite() && point.error >= 0.0) {
                return Err(ReconstructionError::InvalidPoint(
                    point.id,
                    "negative or non-finite error",
                ));
            }
        }
        check_dense_ids("point", points.iter().map(|p| p.id))?;

        Ok(Self {
            cameras: camera_map,
            images: image_map,
            points,
        })
    }

    /// Build a reconstruction from converted frames and a point cloud.
    ///
    /// A single camera with id [`CANONICAL_CAMERA_ID`] is created. Frames receive
    /// image ids `1..=N` in the order given, which must be temporal order, and
    /// points receive ids `1..=M` in cloud order with zero error and an empty track.
    pub fn from_frames(
        intrinsics: CameraIntrinsics,
        frames: impl IntoIterator<Item = (String, Pose)>,
        cloud: &PointCloud,
    ) -> Result<Self, ReconstructionError> {
        let camera = Camera {
            id: CANONICAL_CAMERA_ID,
            intrinsics,
        };
        let images = (1u32..)
            .zip(frames)
            .map(|(id, (name, pose))| Image {
                id,
                name,
                camera_id: CANONICAL_CAMERA_ID,
                pose,
            })
            .collect();
        let points = (1u64..)
            .zip(cloud.iter())
            .map(|(id, (position, color))| Point3D {
                id,
                position: *position,
                color: *color,
                error: 0.0,
                track: Vec::new(),
            })
            .collect();
        Self::new(vec![camera], images, points)
    }

    /// Replace the point cloud, keeping cameras and images.
    ///
    /// Consumes the reconstruction and returns a new, re-validated one.
    pub fn with_point_cloud(self, cloud: &PointCloud) -> Result<Self, ReconstructionError> {
        let points = (1u64..)
            .zip(cloud.iter())
            .map(|(id, (position, color))| Point3D {
                id,
                position: *position,
                color: *color,
                error: 0.0,
                track: Vec::new(),
            })
            .collect();
        let (cameras, images, _) = self.into_parts();
        Self::new(cameras, images, points)
    }

    /// The cameras ordered by id.
    pub fn cameras(&self) -> impl ExactSizeIterator<Item = &Camera> {
        self.cameras.values()
    }

    /// Look up a camera by id.
    pub fn camera(&self, id: u32) -> Option<&Camera> {
        self.cameras.get(&id)
    }

    /// The images ordered by id.
    pub fn images(&self) -> impl ExactSizeIterator<Item = &Image> {
        self.images.values()
    }

    /// Look up an image by id.
    pub fn image(&self, id: u32) -> Option<&Image> {
        self.images.get(&id)
    }

    /// The points in id order.
    pub fn points(&self) -> &[Point3D] {
        &self.points
    }

    /// Number of cameras.
    pub fn num_cameras(&self) -> usize {
        self.cameras.len()
    }

    /// Number of images.
    pub fn num_images(&self) -> usize {
        self.images.len()
    }

    /// Number of points.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    /// Decompose into cameras, images and points, all in id order.
    pub fn into_parts(self) -> (Vec<Camera>, Vec<Image>, Vec<Point3D>) {
        (
            self.cameras.into_values().collect(),
            self.images.into_values().collect(),
            self.points,
        )
    }
}
