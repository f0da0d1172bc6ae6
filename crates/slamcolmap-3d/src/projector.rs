use rand::{rngs::StdRng, Rng, SeedableRng};
use rayon::prelude::*;

use crate::{
    camera::CameraIntrinsics,
    linalg,
    pointcloud::PointCloud,
    rgbd::{ColorImage, DepthMap, RgbdImage},
    utils,
};

/// Error types for the projector module.
#[derive(Debug, thiserror::Error)]
pub enum ProjectorError {
    /// No selected frame produced a valid point
    #[error("No points available from {frames_selected} selected frames")]
    NoPoints {
        /// Number of frames selected by `frame_step`
        frames_selected: usize,
        /// Original indices of selected frames skipped for missing or mismatched depth
        frames_skipped: Vec<usize>,
    },

    /// A configuration value is out of range
    #[error("Invalid projector configuration: {0}")]
    InvalidConfig(String),
}

/// Parameters of the depth back-projection.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ProjectorConfig {
    /// Use every `frame_step`-th frame, counted on the original frame index
    pub frame_step: usize,
    /// Sample every `pixel_step`-th pixel along each axis
    pub pixel_step: usize,
    /// Smallest accepted depth
    pub depth_min: f64,
    /// Largest accepted depth
    pub depth_max: f64,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            frame_step: 5,
            pixel_step: 8,
            depth_min: 0.1,
            depth_max: 100.0,
        }
    }
}

impl ProjectorConfig {
    /// Check that the steps are positive and the depth window is well formed.
    pub fn validate(&self) -> Result<(), ProjectorError> {
        if self.frame_step == 0 || self.pixel_step == 0 {
            return Err(ProjectorError::InvalidConfig(format!(
                "frame_step ({}) and pixel_step ({}) must be positive",
                self.frame_step, self.pixel_step
            )));
        }
        if !(self.depth_min.is_finite() && self.depth_max.is_finite())
            || self.depth_min > self.depth_max
        {
            return Err(ProjectorError::InvalidConfig(format!(
                "invalid depth window [{}, {}]",
                self.depth_min, self.depth_max
            )));
        }
        Ok(())
    }

    #[inline]
    fn accepts_depth(&self, depth: f64) -> bool {
        depth.is_finite() && depth >= self.depth_min && depth <= self.depth_max
    }
}

/// Parameters of the synthetic point cloud used when back-projection yields nothing.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Number of points to generate
    pub num_points: usize,
    /// Coordinates are drawn uniformly from `[-bound, bound]` on each axis
    pub bound: f64,
    /// Seed for reproducible output, drawn from the OS when `None`
    pub seed: Option<u64>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            num_points: 500,
            bound: 2.0,
            seed: None,
        }
    }
}

/// One frame handed to the projector.
#[derive(Debug, Clone, Copy)]
pub struct ProjectionInput<'a> {
    /// Index of the frame in the original sequence
    pub frame_index: usize,
    /// Color image of the frame
    pub color: &'a ColorImage,
    /// Depth map of the frame, if the recording has one
    pub depth: Option<&'a DepthMap>,
    /// Camera-to-world transform `[R | t]`
    pub cam_to_world: &'a [[f64; 4]; 3],
}

/// The result of projecting a set of frames.
#[derive(Debug, Clone)]
pub struct Projection {
    /// Concatenated points of all the contributing frames, in frame order
    pub cloud: PointCloud,
    /// Number of frames selected by `frame_step`
    pub frames_selected: usize,
    /// Original indices of selected frames skipped for missing or mismatched depth
    pub frames_skipped: Vec<usize>,
}

/// Back-project one RGB-D frame into world space.
///
/// The depth map is sampled on a regular grid of `pixel_step` pixels; samples
/// outside `[depth_min, depth_max]` are dropped. Surviving pixels are lifted with
/// the pinhole model and moved to the world frame with `P_world = R * P_cam + t`.
pub fn backproject_frame(
    rgbd: &RgbdImage,
    intrinsics: &CameraIntrinsics,
    cam_to_world: &[[f64; 4]; 3],
    config: &ProjectorConfig,
) -> PointCloud {
    let (width, height) = rgbd.dimensions();
    let step = config.pixel_step.max(1);

    let mut points_in_cam = Vec::new();
    let mut colors = Vec::new();
    for v in (0..height).step_by(step) {
        for u in (0..width).step_by(step) {
            let depth = rgbd.get_depth(u, v);
            if !config.accepts_depth(depth) {
                continue;
            }
            points_in_cam.push(intrinsics.unproject(u as f64, v as f64, depth));
            colors.push(rgbd.get_color(u, v));
        }
    }

    let (world_r_cam, world_t_cam) = utils::split_rigid_transform(cam_to_world);
    let mut points_in_world = vec![[0.0; 3]; points_in_cam.len()];
    linalg::transform_points(&points_in_cam, &world_r_cam, &world_t_cam, &mut points_in_world);

    PointCloud::new(points_in_world, colors)
}

/// Back-project every `frame_step`-th frame and concatenate the results.
///
/// Frames are processed in parallel and merged in their original order, so the
/// output does not depend on scheduling. Frames without a depth map, or whose
/// depth map does not match the color image, are skipped and reported.
///
/// # Errors
///
/// Returns [`ProjectorError::NoPoints`] when no selected frame yields a point;
/// the caller is expected to fall back to [`random_point_cloud`].
pub fn project_frames(
    inputs: &[ProjectionInput],
    intrinsics: &CameraIntrinsics,
    config: &ProjectorConfig,
) -> Result<Projection, ProjectorError> {
    config.validate()?;

    let selected = inputs
        .iter()
        .filter(|input| input.frame_index % config.frame_step == 0)
        .collect::<Vec<_>>();

    let per_frame = selected
        .par_iter()
        .map(|input| {
            let depth = input.depth.ok_or("no depth map")?;
            let rgbd = RgbdImage::new(input.color, depth).map_err(|_| "depth size mismatch")?;
            let cloud = backproject_frame(&rgbd, intrinsics, input.cam_to_world, config);
            log::debug!(
                "frame {}: {} points back-projected",
                input.frame_index,
                cloud.len()
            );
            Ok::<_, &'static str>(cloud)
        })
        .collect::<Vec<_>>();

    let mut cloud = PointCloud::default();
    let mut frames_skipped = Vec::new();
    for (input, result) in selected.iter().zip(per_frame) {
        match result {
            Ok(frame_cloud) => cloud.extend(frame_cloud),
            Err(reason) => {
                log::warn!("skipping frame {} for projection: {}", input.frame_index, reason);
                frames_skipped.push(input.frame_index);
            }
        }
    }

    if cloud.is_empty() {
        return Err(ProjectorError::NoPoints {
            frames_selected: selected.len(),
            frames_skipped,
        });
    }

    Ok(Projection {
        cloud,
        frames_selected: selected.len(),
        frames_skipped,
    })
}

/// Generate a cloud of uniformly distributed random points with random colors.
pub fn random_point_cloud(config: &FallbackConfig) -> Result<PointCloud, ProjectorError> {
    if config.num_points == 0 || !config.bound.is_finite() || config.bound <= 0.0 {
        return Err(ProjectorError::InvalidConfig(format!(
            "fallback needs a positive point count and bound, got {} and {}",
            config.num_points, config.bound
        )));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let bound = config.bound;
    let mut cloud = PointCloud::with_capacity(config.num_points);
    for _ in 0..config.num_points {
        let point = [
            rng.random_range(-bound..=bound),
            rng.random_range(-bound..=bound),
            rng.random_range(-bound..=bound),
        ];
        let color = [rng.random::<u8>(), rng.random::<u8>(), rng.random::<u8>()];
        cloud.push(point, color);
    }

    Ok(cloud)
}
