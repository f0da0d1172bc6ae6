use std::{path::Path, process::Command};

use serde_json::Value;

use crate::error::IoError;

/// Horizontal field of view, in degrees, assumed when the camera is unknown.
pub const DEFAULT_HORIZONTAL_FOV: f64 = 73.0;

/// Width of the 35 mm film frame, in millimeters.
const FILM_WIDTH_35MM: f64 = 36.0;

/// Run `ffprobe` on a video and return its JSON description.
///
/// # Errors
///
/// Returns [`IoError::ProbeError`] when `ffprobe` cannot be started or exits with
/// a failure status.
pub fn probe_video(path: impl AsRef<Path>) -> Result<Value, IoError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(IoError::FileDoesNotExist(path.to_path_buf()));
    }
    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .output()
        .map_err(|e| IoError::ProbeError(format!("failed to run ffprobe: {e}")))?;
    if !output.status.success() {
        return Err(IoError::ProbeError(format!(
            "ffprobe exited with {} on {}",
            output.status,
            path.display()
        )));
    }
    Ok(serde_json::from_slice(&output.stdout)?)
}

/// Camera make and model read from the container tags, lowercased.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraTags {
    /// Manufacturer, e.g. `apple`
    pub make: String,
    /// Model, e.g. `iphone 15 pro`
    pub model: String,
}

impl CameraTags {
    /// Read the tags from ffprobe output.
    ///
    /// The QuickTime keys are preferred; plain `make` and `model` are the fallback.
    pub fn from_metadata(metadata: &Value) -> Self {
        let tags = &metadata["format"]["tags"];
        let tag = |keys: [&str; 2]| {
            keys.iter()
                .filter_map(|key| tags[*key].as_str())
                .find(|value| !value.is_empty())
                .unwrap_or_default()
                .to_lowercase()
        };
        Self {
            make: tag(["com.apple.quicktime.make", "make"]),
            model: tag(["com.apple.quicktime.model", "model"]),
        }
    }

    /// 35 mm equivalent focal length of the main camera, when the model is known.
    pub fn focal_length_35mm(&self) -> Option<f64> {
        if !self.model.contains("iphone") {
            return None;
        }
        if ["14 pro", "15 pro", "16 pro"]
            .iter()
            .any(|pro| self.model.contains(pro))
        {
            Some(24.0)
        } else {
            Some(26.0)
        }
    }
}

/// Horizontal field of view of a 35 mm equivalent focal length, in degrees rounded to 2 decimals.
pub fn fov_from_focal_length_35mm(focal_length: f64) -> f64 {
    let fov = 2.0 * (FILM_WIDTH_35MM / (2.0 * focal_length)).atan();
    (fov.to_degrees() * 100.0).round() / 100.0
}

/// Estimate the horizontal field of view of the camera that recorded a video.
///
/// Falls back to [`DEFAULT_HORIZONTAL_FOV`] for unknown cameras.
pub fn estimate_fov(metadata: &Value) -> f64 {
    let tags = CameraTags::from_metadata(metadata);
    log::info!("detected camera: {} {}", tags.make, tags.model);
    match tags.focal_length_35mm() {
        Some(focal_length) => fov_from_focal_length_35mm(focal_length),
        None => DEFAULT_HORIZONTAL_FOV,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    #[test]
    fn estimate_fov_from_tags() {
        let metadata = json!({
            "format": {"tags": {
                "com.apple.quicktime.make": "Apple",
                "com.apple.quicktime.model": "iPhone 15 Pro",
            }}
        });
        assert_relative_eq!(estimate_fov(&metadata), 73.74);

        let metadata = json!({"format": {"tags": {"make": "Apple", "model": "iPhone 12"}}});
        assert_eq!(
            CameraTags::from_metadata(&metadata),
            CameraTags {
                make: "apple".to_string(),
                model: "iphone 12".to_string()
            }
        );
        assert_relative_eq!(estimate_fov(&metadata), 69.39);

        let metadata = json!({"format": {"tags": {"make": "GoPro", "model": "HERO9"}}});
        assert_eq!(estimate_fov(&metadata), DEFAULT_HORIZONTAL_FOV);
        assert_eq!(estimate_fov(&json!({})), DEFAULT_HORIZONTAL_FOV);
    }

    #[test]
    fn probe_missing_file() {
        let result = probe_video("/definitely/not/a/video.mov");
        assert!(matches!(result, Err(IoError::FileDoesNotExist(_))));
    }
}
