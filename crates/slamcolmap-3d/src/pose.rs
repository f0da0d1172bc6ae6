use crate::{linalg, transforms, utils};

/// Tolerance on the quaternion norm accepted by [`Pose::new`].
pub const QUATERNION_NORM_TOL: f64 = 1e-6;

/// Largest deviation of `R * R^T` from the identity accepted for a rotation block.
pub const ROTATION_ORTHONORMAL_TOL: f64 = 1e-4;

/// Error types for the pose module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    /// The input transform contains NaN/Inf values, is not invertible or its
    /// upper-left block is not a rotation
    #[error("Degenerate camera pose: {0}")]
    DegeneratePose(&'static str),

    /// The input transform is neither 3x4 nor 4x4
    #[error("Invalid transform with {0} rows, expected 3 or 4")]
    InvalidShape(usize),

    /// The quaternion is not unit-norm within tolerance
    #[error("Quaternion norm {0} is not 1")]
    NonUnitQuaternion(f64),

    /// The quaternion or translation contains non-finite values
    #[error("Pose contains non-finite values")]
    NonFinite,
}

/// A rigid transform in the world-to-camera convention.
///
/// Maps a point from the world frame into the camera frame:
/// `p_cam = R(rotation) * p_world + translation`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    rotation: [f64; 4],
    translation: [f64; 3],
}

impl Pose {
    /// Create a pose from a unit quaternion `[qw, qx, qy, qz]` and a translation.
    pub fn new(rotation: [f64; 4], translation: [f64; 3]) -> Result<Self, PoseError> {
        if rotation.iter().chain(translation.iter()).any(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }
        let norm = transforms::quaternion_norm(&rotation);
        if (norm - 1.0).abs() > QUATERNION_NORM_TOL {
            return Err(PoseError::NonUnitQuaternion(norm));
        }
        Ok(Self {
            rotation,
            translation,
        })
    }

    /// The identity pose.
    pub fn identity() -> Self {
        Self {
            rotation: [1.0, 0.0, 0.0, 0.0],
            translation: [0.0, 0.0, 0.0],
        }
    }

    /// The rotation as a quaternion ordered `[qw, qx, qy, qz]`.
    #[inline]
    pub fn rotation(&self) -> &[f64; 4] {
        &self.rotation
    }

    /// The translation `[tx, ty, tz]`.
    #[inline]
    pub fn translation(&self) -> &[f64; 3] {
        &self.translation
    }

    /// The rotation as a 3x3 matrix.
    pub fn rotation_matrix(&self) -> [[f64; 3]; 3] {
        transforms::quaternion_to_rotation_matrix(&self.rotation)
    }

    /// The camera center expressed in world coordinates, `-R^T * t`.
    pub fn camera_center(&self) -> [f64; 3] {
        let r = self.rotation_matrix();
        let t = &self.translation;
        [
            -(r[0][0] * t[0] + r[1][0] * t[1] + r[2][0] * t[2]),
            -(r[0][1] * t[0] + r[1][1] * t[1] + r[2][1] * t[2]),
            -(r[0][2] * t[0] + r[1][2] * t[1] + r[2][2] * t[2]),
        ]
    }
}

/// Check that `R * R^T` is the identity within `tol`, element-wise.
fn is_orthonormal(r: &[[f64; 3]; 3], tol: f64) -> bool {
    (0..3).all(|i| {
        (0..3).all(|j| {
            let dot = r[i][0] * r[j][0] + r[i][1] * r[j][1] + r[i][2] * r[j][2];
            let expected = if i == j { 1.0 } else { 0.0 };
            (dot - expected).abs() <= tol
        })
    })
}

/// Convert a camera-to-world transform into a world-to-camera [`Pose`].
///
/// The input is either the 3x4 affine block `[R | t]` or a full 4x4 matrix given
/// as rows; the bottom row is always taken as `[0, 0, 0, 1]`. The transform is
/// inverted and the rotation block of the inverse is converted to a quaternion.
///
/// # Errors
///
/// Returns [`PoseError::DegeneratePose`] when an element of the input is NaN or
/// infinite, when the transform is singular, or when its upper-left block is not
/// a proper rotation (scaled, sheared or reflected). Callers skip such frames.
///
/// Example:
///
/// ```
/// use slamcolmap_3d::pose::pose_from_cam_to_world;
///
/// let c2w = [
///     [1.0, 0.0, 0.0, 1.0],
///     [0.0, 1.0, 0.0, 2.0],
///     [0.0, 0.0, 1.0, 3.0],
/// ];
/// let pose = pose_from_cam_to_world(&c2w).unwrap();
/// assert_eq!(pose.translation(), &[-1.0, -2.0, -3.0]);
/// ```
pub fn pose_from_cam_to_world(cam_to_world: &[[f64; 4]]) -> Result<Pose, PoseError> {
    if cam_to_world.len() != 3 && cam_to_world.len() != 4 {
        return Err(PoseError::InvalidShape(cam_to_world.len()));
    }
    if cam_to_world.iter().flatten().any(|v| !v.is_finite()) {
        return Err(PoseError::DegeneratePose("non-finite value in transform"));
    }

    let affine = [cam_to_world[0], cam_to_world[1], cam_to_world[2]];
    let (world_r_cam, world_t_cam) = utils::split_rigid_transform(&affine);

    // with the bottom row fixed to [0, 0, 0, 1] the inverse is [R^-1 | -R^-1 t]
    let cam_r_world = linalg::invert33(&world_r_cam)
        .ok_or(PoseError::DegeneratePose("singular transform"))?;
    if linalg::determinant33(&world_r_cam) <= 0.0 {
        return Err(PoseError::DegeneratePose("rotation block is a reflection"));
    }
    if !is_orthonormal(&world_r_cam, ROTATION_ORTHONORMAL_TOL) {
        return Err(PoseError::DegeneratePose("rotation block is not orthonormal"));
    }
    let rt = linalg::mat33_mul_vec3(&cam_r_world, &world_t_cam);
    let cam_t_world = [-rt[0], -rt[1], -rt[2]];

    let rotation = transforms::rotation_matrix_to_quaternion(&cam_r_world);
    if rotation.iter().chain(cam_t_world.iter()).any(|v| !v.is_finite()) {
        return Err(PoseError::DegeneratePose("inverse is not finite"));
    }

    Ok(Pose {
        rotation,
        translation: cam_t_world,
    })
}
