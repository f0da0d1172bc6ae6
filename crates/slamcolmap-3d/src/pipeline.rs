use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::{
    camera::CameraIntrinsics,
    io::colmap::SparseFormat,
    pose::{pose_from_cam_to_world, Pose},
    projector::{self, FallbackConfig, ProjectionInput, ProjectorConfig, ProjectorError},
    reconstruction::{Reconstruction, ReconstructionError, IMAGE_EXTENSIONS},
    rgbd::{ColorImage, DepthMap},
};

/// Log a progress line every this many converted poses.
const PROGRESS_EVERY: usize = 100;

/// Error types for the conversion pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The configured image extension is not one of [`IMAGE_EXTENSIONS`]
    #[error("Unsupported image extension {0:?}")]
    InvalidImageExtension(String),

    /// The projector configuration is invalid
    #[error(transparent)]
    Projector(#[from] ProjectorError),

    /// The assembled model breaks an invariant
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),
}

/// One frame of SLAM output.
#[derive(Debug, Clone)]
pub struct SlamFrame {
    /// Color image
    pub color: ColorImage,
    /// Depth map aligned with the color image, when recorded
    pub depth: Option<DepthMap>,
    /// Camera-to-world transform `[R | t]`
    pub cam_to_world: [[f64; 4]; 3],
}

/// A full SLAM recording: frames in temporal order sharing one camera.
#[derive(Debug, Clone)]
pub struct SlamSequence {
    /// The frames in temporal order
    pub frames: Vec<SlamFrame>,
    /// Intrinsics of the camera that captured every frame
    pub intrinsics: CameraIntrinsics,
}

/// Options of a conversion run.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Back-projection parameters
    pub projector: ProjectorConfig,
    /// Synthetic cloud parameters, used when back-projection yields no point
    pub fallback: FallbackConfig,
    /// Extension of the frame files, without the dot
    pub image_extension: String,
    /// On-disk format of the sparse model
    pub format: SparseFormat,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            projector: ProjectorConfig::default(),
            fallback: FallbackConfig::default(),
            image_extension: "jpg".to_string(),
            format: SparseFormat::Binary,
        }
    }
}

/// Summary of a conversion run.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ConversionReport {
    /// Frames in the input sequence
    pub frames_total: usize,
    /// Images in the reconstruction
    pub images: usize,
    /// Original indices of frames dropped for a degenerate pose
    pub skipped_pose_frames: Vec<usize>,
    /// Frames selected for back-projection
    pub frames_projected: usize,
    /// Original indices of selected frames skipped for missing or mismatched depth
    pub skipped_depth_frames: Vec<usize>,
    /// Whether the synthetic point cloud replaced the back-projected one
    pub used_fallback: bool,
    /// Points in the reconstruction
    pub num_points: usize,
}

/// File name of the frame at `index` in the original sequence, e.g. `00042.jpg`.
pub fn frame_image_name(index: usize, extension: &str) -> String {
    format!("{index:05}.{extension}")
}

/// Convert a SLAM recording into a sparse reconstruction.
///
/// Frames with a degenerate pose are left out; the survivors receive image ids
/// `1..=N` in temporal order and keep their original index in their file name.
/// When back-projection yields no point at all, a synthetic cloud is generated
/// from `config.fallback`.
pub fn convert(
    sequence: &SlamSequence,
    config: &ConversionConfig,
) -> Result<(Reconstruction, ConversionReport), ConvertError> {
    let extension = config.image_extension.as_str();
    if !IMAGE_EXTENSIONS
        .iter()
        .any(|known| extension.eq_ignore_ascii_case(known))
    {
        return Err(ConvertError::InvalidImageExtension(extension.to_string()));
    }
    config.projector.validate()?;

    let frames = &sequence.frames;
    let total = frames.len();
    log::info!("converting {} frames", total);

    let done = AtomicUsize::new(0);
    let poses = frames
        .par_iter()
        .map(|frame| {
            let pose = pose_from_cam_to_world(&frame.cam_to_world);
            let n = done.fetch_add(1, Ordering::Relaxed) + 1;
            if n % PROGRESS_EVERY == 0 {
                log::info!("converted {}/{} poses", n, total);
            }
            pose
        })
        .collect::<Vec<_>>();

    let mut report = ConversionReport {
        frames_total: total,
        ..Default::default()
    };
    let mut survivors: Vec<(usize, Pose)> = Vec::with_capacity(total);
    for (index, pose) in poses.into_iter().enumerate() {
        match pose {
            Ok(pose) => survivors.push((index, pose)),
            Err(e) => {
                log::warn!("skipping frame {}: {}", index, e);
                report.skipped_pose_frames.push(index);
            }
        }
    }

    let inputs = survivors
        .iter()
        .map(|&(index, _)| ProjectionInput {
            frame_index: index,
            color: &frames[index].color,
            depth: frames[index].depth.as_ref(),
            cam_to_world: &frames[index].cam_to_world,
        })
        .collect::<Vec<_>>();

    let cloud = match projector::project_frames(&inputs, &sequence.intrinsics, &config.projector) {
        Ok(projection) => {
            report.frames_projected = projection.frames_selected;
            report.skipped_depth_frames = projection.frames_skipped;
            projection.cloud
        }
        Err(ProjectorError::NoPoints {
            frames_selected,
            frames_skipped,
        }) => {
            report.frames_projected = frames_selected;
            report.skipped_depth_frames = frames_skipped;
            log::warn!(
                "no valid points from depth, generating {} random points",
                config.fallback.num_points
            );
            report.used_fallback = true;
            projector::random_point_cloud(&config.fallback)?
        }
        Err(e) => return Err(e.into()),
    };
    if let Some((lo, hi)) = cloud.bounds() {
        log::debug!("point cloud bounds: {:?} to {:?}", lo, hi);
    }

    let reconstruction = Reconstruction::from_frames(
        sequence.intrinsics,
        survivors
            .into_iter()
            .map(|(index, pose)| (frame_image_name(index, extension), pose)),
        &cloud,
    )?;

    report.images = reconstruction.num_images();
    report.num_points = reconstruction.num_points();
    if !report.skipped_pose_frames.is_empty() {
        log::warn!(
            "{} of {} frames skipped for degenerate poses",
            report.skipped_pose_frames.len(),
            total
        );
    }
    log::info!(
        "reconstruction ready: {} images, {} points",
        report.images,
        report.num_points
    );

    Ok((reconstruction, report))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(cam_to_world: [[f64; 4]; 3], depth: Option<f64>) -> SlamFrame {
        SlamFrame {
            color: ColorImage::new(4, 4, vec![[10, 20, 30]; 16]).unwrap(),
            depth: depth.map(|d| DepthMap::from_constant(4, 4, d)),
            cam_to_world,
        }
    }

    fn translation(x: f64) -> [[f64; 4]; 3] {
        [[1.0, 0.0, 0.0, x], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]]
    }

    fn sequence(frames: Vec<SlamFrame>) -> SlamSequence {
        SlamSequence {
            frames,
            intrinsics: CameraIntrinsics::new(4, 4, 2.0, 2.0, 2.0, 2.0).unwrap(),
        }
    }

    fn config() -> ConversionConfig {
        ConversionConfig {
            projector: ProjectorConfig {
                frame_step: 1,
                pixel_step: 2,
                ..Default::default()
            },
            fallback: FallbackConfig {
                seed: Some(42),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_degenerate_pose_is_dropped() -> Result<(), ConvertError> {
        let seq = sequence(vec![
            frame(translation(1.0), Some(1.0)),
            frame([[0.0; 4]; 3], Some(1.0)),
            frame(translation(3.0), Some(1.0)),
        ]);
        let (rec, report) = convert(&seq, &config())?;

        let images = rec
            .images()
            .map(|i| (i.id, i.name.as_str(), i.pose.translation()[0]))
            .collect::<Vec<_>>();
        assert_eq!(images, vec![(1, "00000.jpg", -1.0), (2, "00002.jpg", -3.0)]);
        assert_eq!(report.skipped_pose_frames, vec![1]);
        assert_eq!(report.frames_projected, 2);
        // 4 samples from each of the two surviving frames
        assert_eq!(rec.num_points(), 8);
        assert!(!report.used_fallback);
        Ok(())
    }

    #[test]
    fn test_fallback_without_depth() -> Result<(), ConvertError> {
        let seq = sequence(vec![frame(translation(0.0), None), frame(translation(1.0), None)]);
        let (rec, report) = convert(&seq, &config())?;
        assert!(report.used_fallback);
        assert_eq!(report.skipped_depth_frames, vec![0, 1]);
        assert_eq!(report.frames_projected, 2);
        assert_eq!(rec.num_points(), 500);
        assert!(rec
            .points()
            .iter()
            .all(|p| p.position.iter().all(|v| (-2.0..=2.0).contains(v))));

        // same seed, same cloud
        let (again, _) = convert(&seq, &config())?;
        assert_eq!(rec.points(), again.points());
        Ok(())
    }

    #[test]
    fn test_image_extension() {
        let seq = sequence(vec![frame(translation(0.0), Some(1.0))]);
        let mut cfg = config();
        cfg.image_extension = "bmp".to_string();
        assert!(matches!(
            convert(&seq, &cfg),
            Err(ConvertError::InvalidImageExtension(_))
        ));
        cfg.image_extension = "png".to_string();
        let (rec, _) = convert(&seq, &cfg).unwrap();
        assert_eq!(rec.image(1).map(|i| i.name.as_str()), Some("00000.png"));
        assert_eq!(frame_image_name(12345, "jpg"), "12345.jpg");
    }

    #[test]
    fn test_config_from_json() {
        let cfg: ConversionConfig =
            serde_json::from_str(r#"{"projector": {"pixel_step": 4}, "format": "text"}"#).unwrap();
        assert_eq!(cfg.projector.pixel_step, 4);
        assert_eq!(cfg.projector.frame_step, 5);
        assert_eq!(cfg.format, SparseFormat::Text);
        assert_eq!(cfg.image_extension, "jpg");
        assert_eq!(cfg.fallback.num_points, 500);
    }
}
