/// Error types for the camera module.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// The intrinsic matrix has a non-finite or non-positive focal length
    #[error("Invalid focal length ({0}, {1})")]
    InvalidFocalLength(f64, f64),

    /// The principal point is not finite
    #[error("Invalid principal point ({0}, {1})")]
    InvalidPrincipalPoint(f64, f64),

    /// The image has no pixels
    #[error("Invalid image size {0}x{1}")]
    InvalidImageSize(u64, u64),
}

/// The intrinsic parameters of a pinhole camera.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraIntrinsics {
    /// Image width in pixels
    pub width: u64,
    /// Image height in pixels
    pub height: u64,
    /// Focal length along x in pixels
    pub fx: f64,
    /// Focal length along y in pixels
    pub fy: f64,
    /// Principal point x coordinate in pixels
    pub cx: f64,
    /// Principal point y coordinate in pixels
    pub cy: f64,
}

impl CameraIntrinsics {
    /// Create new intrinsics after checking that all the values are usable.
    pub fn new(
        width: u64,
        height: u64,
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
    ) -> Result<Self, CameraError> {
        if width == 0 || height == 0 {
            return Err(CameraError::InvalidImageSize(width, height));
        }
        if !(fx.is_finite() && fy.is_finite() && fx > 0.0 && fy > 0.0) {
            return Err(CameraError::InvalidFocalLength(fx, fy));
        }
        if !(cx.is_finite() && cy.is_finite()) {
            return Err(CameraError::InvalidPrincipalPoint(cx, cy));
        }
        Ok(Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        })
    }

    /// Create the intrinsics from a 3x3 camera matrix `K` and the image size.
    ///
    /// Only `K[0][0]`, `K[1][1]`, `K[0][2]` and `K[1][2]` are read; skew is ignored.
    pub fn from_camera_matrix(
        k: &[[f64; 3]; 3],
        width: u64,
        height: u64,
    ) -> Result<Self, CameraError> {
        Self::new(width, height, k[0][0], k[1][1], k[0][2], k[1][2])
    }

    /// Create the intrinsics of a camera with the given horizontal field of view.
    ///
    /// The focal length is shared by both axes and the principal point sits at
    /// the image center.
    pub fn from_horizontal_fov(fov_deg: f64, width: u64, height: u64) -> Result<Self, CameraError> {
        let focal = (width as f64 / 2.0) / (fov_deg.to_radians() / 2.0).tan();
        Self::new(
            width,
            height,
            focal,
            focal,
            width as f64 / 2.0,
            height as f64 / 2.0,
        )
    }

    /// The pinhole parameters in COLMAP order `[fx, fy, cx, cy]`.
    pub fn params(&self) -> [f64; 4] {
        [self.fx, self.fy, self.cx, self.cy]
    }

    /// Returns the camera matrix as a 3x3 array.
    pub fn camera_matrix(&self) -> [[f64; 3]; 3] {
        [
            [self.fx, 0.0, self.cx],
            [0.0, self.fy, self.cy],
            [0.0, 0.0, 1.0],
        ]
    }

    /// Back-project a pixel with a known depth into the camera frame.
    #[inline]
    pub fn unproject(&self, u: f64, v: f64, depth: f64) -> [f64; 3] {
        [
            (u - self.cx) * depth / self.fx,
            (v - self.cy) * depth / self.fy,
            depth,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_from_camera_matrix() -> Result<(), CameraError> {
        let k = [[1000.0, 0.0, 960.0], [0.0, 1000.0, 540.0], [0.0, 0.0, 1.0]];
        let intrinsics = CameraIntrinsics::from_camera_matrix(&k, 1920, 1080)?;
        assert_eq!(intrinsics.params(), [1000.0, 1000.0, 960.0, 540.0]);
        assert_eq!(intrinsics.camera_matrix(), k);
        Ok(())
    }

    #[test]
    fn test_invalid_intrinsics() {
        assert!(CameraIntrinsics::new(0, 10, 1.0, 1.0, 0.0, 0.0).is_err());
        assert!(CameraIntrinsics::new(10, 10, 0.0, 1.0, 0.0, 0.0).is_err());
        assert!(CameraIntrinsics::new(10, 10, 1.0, f64::NAN, 0.0, 0.0).is_err());
        assert!(CameraIntrinsics::new(10, 10, 1.0, 1.0, f64::INFINITY, 0.0).is_err());
    }

    #[test]
    fn test_from_horizontal_fov() -> Result<(), CameraError> {
        let intrinsics = CameraIntrinsics::from_horizontal_fov(90.0, 640, 480)?;
        assert_relative_eq!(intrinsics.fx, 320.0, epsilon = 1e-9);
        assert_relative_eq!(intrinsics.fy, 320.0, epsilon = 1e-9);
        assert_eq!((intrinsics.cx, intrinsics.cy), (320.0, 240.0));
        Ok(())
    }

    #[test]
    fn test_unproject() -> Result<(), CameraError> {
        let intrinsics = CameraIntrinsics::new(640, 480, 500.0, 400.0, 320.0, 240.0)?;
        assert_eq!(intrinsics.unproject(320.0, 240.0, 2.0), [0.0, 0.0, 2.0]);
        assert_eq!(intrinsics.unproject(820.0, 640.0, 2.0), [2.0, 2.0, 2.0]);
        Ok(())
    }
}
