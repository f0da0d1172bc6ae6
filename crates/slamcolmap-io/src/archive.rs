use std::{
    fs::File,
    path::{Path, PathBuf},
};

use ndarray::{ArrayD, Axis};
use ndarray_npy::NpzReader;
use slamcolmap_3d::{
    camera::CameraIntrinsics,
    pipeline::{SlamFrame, SlamSequence},
    rgbd::{ColorImage, DepthMap},
};

use crate::error::IoError;

/// Accepted names of the `N x H x W x 3` uint8 image array.
pub const IMAGES_FIELDS: &[&str] = &["images"];
/// Accepted names of the `N x 4 x 4` or `N x 3 x 4` camera-to-world array.
pub const POSES_FIELDS: &[&str] = &["cam_c2w", "poses"];
/// Accepted names of the `3 x 3` or `N x 3 x 3` intrinsics array.
pub const INTRINSICS_FIELDS: &[&str] = &["intrinsic", "intrinsics"];
/// Accepted names of the optional `N x H x W` depth array.
pub const DEPTHS_FIELDS: &[&str] = &["depths", "depth"];

/// An opened `.npz` archive with name resolution over its entries.
pub struct NpzArchive {
    path: PathBuf,
    reader: NpzReader<File>,
    names: Vec<String>,
}

impl NpzArchive {
    /// Open an archive and list its entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IoError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(IoError::FileDoesNotExist(path.to_path_buf()));
        }
        let mut reader = NpzReader::new(File::open(path)?)?;
        let names = reader.names()?;
        log::debug!("{} holds {:?}", path.display(), names);
        Ok(Self {
            path: path.to_path_buf(),
            reader,
            names,
        })
    }

    /// Path of the archive.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Find the entry for the first of `fields` present, with or without the `.npy` suffix.
    pub fn resolve(&self, fields: &[&str]) -> Option<String> {
        fields.iter().find_map(|field| {
            self.names
                .iter()
                .find(|name| name.as_str() == *field || name.strip_suffix(".npy") == Some(*field))
                .cloned()
        })
    }

    fn require(&self, fields: &'static [&'static str]) -> Result<String, IoError> {
        self.resolve(fields)
            .ok_or(IoError::MissingField(fields[0], &fields[1..]))
    }

    /// Read a uint8 array.
    pub fn read_u8(&mut self, name: &str) -> Result<ArrayD<u8>, IoError> {
        Ok(self.reader.by_name(name)?)
    }

    /// Read a float array stored as float64 or float32.
    pub fn read_f64(&mut self, name: &str) -> Result<ArrayD<f64>, IoError> {
        if let Ok(array) = self.reader.by_name::<_, ndarray::IxDyn>(name) {
            return Ok(array);
        }
        let array: ArrayD<f32> = self.reader.by_name(name)?;
        Ok(array.mapv(f64::from))
    }
}

fn invalid_shape(field: &str, array_shape: &[usize], expected: &'static str) -> IoError {
    IoError::InvalidShape {
        field: field.to_string(),
        shape: array_shape.to_vec(),
        expected,
    }
}

/// Read the color frames, returning `(frames, width, height)`.
fn read_images(archive: &mut NpzArchive) -> Result<(Vec<ColorImage>, usize, usize), IoError> {
    let field = archive.require(IMAGES_FIELDS)?;
    let images = archive.read_u8(&field)?;
    let &[num_frames, height, width, 3] = images.shape() else {
        return Err(invalid_shape(&field, images.shape(), "N x H x W x 3"));
    };
    if height == 0 || width == 0 {
        return Err(invalid_shape(&field, images.shape(), "non-empty frames"));
    }

    let images = images.as_standard_layout();
    let data = images
        .as_slice()
        .ok_or_else(|| invalid_shape(&field, images.shape(), "a contiguous array"))?;
    let frames = data
        .chunks_exact(height * width * 3)
        .take(num_frames)
        .map(|chunk| ColorImage::from_interleaved(width, height, chunk))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((frames, width, height))
}

/// Read the camera-to-world transforms, keeping the top `3 x 4` block.
fn read_poses(archive: &mut NpzArchive, num_frames: usize) -> Result<Vec<[[f64; 4]; 3]>, IoError> {
    let field = archive.require(POSES_FIELDS)?;
    let poses = archive.read_f64(&field)?;
    let num_poses = match poses.shape() {
        &[n, 3, 4] | &[n, 4, 4] => n,
        shape => return Err(invalid_shape(&field, shape, "N x 4 x 4 or N x 3 x 4")),
    };
    if num_poses < num_frames {
        return Err(invalid_shape(&field, poses.shape(), "one pose per image"));
    }
    if num_poses > num_frames {
        log::warn!("ignoring {} poses without an image", num_poses - num_frames);
    }

    Ok(poses
        .axis_iter(Axis(0))
        .take(num_frames)
        .map(|pose| {
            let mut cam_to_world = [[0.0; 4]; 3];
            for (i, row) in cam_to_world.iter_mut().enumerate() {
                for (j, value) in row.iter_mut().enumerate() {
                    *value = pose[&[i, j][..]];
                }
            }
            cam_to_world
        })
        .collect())
}

/// Read the camera matrix; when one matrix per frame is stored the first is used.
fn read_camera_matrix(archive: &mut NpzArchive) -> Result<[[f64; 3]; 3], IoError> {
    let field = archive.require(INTRINSICS_FIELDS)?;
    let intrinsics = archive.read_f64(&field)?;
    let k = match intrinsics.shape() {
        &[3, 3] => intrinsics.view(),
        &[n, 3, 3] if n > 0 => intrinsics.index_axis(Axis(0), 0),
        shape => return Err(invalid_shape(&field, shape, "3 x 3 or N x 3 x 3")),
    };

    let mut camera_matrix = [[0.0; 3]; 3];
    for (i, row) in camera_matrix.iter_mut().enumerate() {
        for (j, value) in row.iter_mut().enumerate() {
            *value = k[&[i, j][..]];
        }
    }
    Ok(camera_matrix)
}

/// Read the optional depth maps; frames past the end of the array get none.
fn read_depths(
    archive: &mut NpzArchive,
    num_frames: usize,
) -> Result<Vec<Option<DepthMap>>, IoError> {
    let Some(field) = archive.resolve(DEPTHS_FIELDS) else {
        log::warn!("no depth maps in {}", archive.path().display());
        return Ok(vec![None; num_frames]);
    };
    let depths = archive.read_f64(&field)?;
    let (num_depths, height, width) = match depths.shape() {
        &[n, h, w] | &[n, h, w, 1] => (n, h, w),
        shape => return Err(invalid_shape(&field, shape, "N x H x W")),
    };
    if height == 0 || width == 0 {
        return Err(invalid_shape(&field, depths.shape(), "non-empty frames"));
    }
    if num_depths < num_frames {
        log::warn!("only {} of {} frames have a depth map", num_depths, num_frames);
    }

    let depths = depths.as_standard_layout();
    let data = depths
        .as_slice()
        .ok_or_else(|| invalid_shape(&field, depths.shape(), "a contiguous array"))?;
    let mut maps = data
        .chunks_exact(height * width)
        .take(num_frames)
        .map(|chunk| DepthMap::new(width, height, chunk.to_vec()).map(Some))
        .collect::<Result<Vec<_>, _>>()?;
    maps.resize(num_frames, None);
    Ok(maps)
}

/// Load a SLAM recording from an `.npz` archive.
///
/// Images, poses and intrinsics are required; depths are optional. Field names
/// are resolved with [`IMAGES_FIELDS`], [`POSES_FIELDS`], [`INTRINSICS_FIELDS`]
/// and [`DEPTHS_FIELDS`], first match wins. Float arrays may be float32 or float64.
///
/// # Errors
///
/// Any missing required field or unexpected shape is an error.
pub fn read_slam_archive(path: impl AsRef<Path>) -> Result<SlamSequence, IoError> {
    let mut archive = NpzArchive::open(path)?;

    let (images, width, height) = read_images(&mut archive)?;
    let num_frames = images.len();
    let poses = read_poses(&mut archive, num_frames)?;
    let camera_matrix = read_camera_matrix(&mut archive)?;
    let depths = read_depths(&mut archive, num_frames)?;

    let intrinsics =
        CameraIntrinsics::from_camera_matrix(&camera_matrix, width as u64, height as u64)?;
    log::info!(
        "loaded {} frames of {}x{} from {}",
        num_frames,
        width,
        height,
        archive.path().display()
    );

    let frames = images
        .into_iter()
        .zip(poses)
        .zip(depths)
        .map(|((color, cam_to_world), depth)| SlamFrame {
            color,
            depth,
            cam_to_world,
        })
        .collect();

    Ok(SlamSequence { frames, intrinsics })
}
