/// Compute the rotation matrix from an axis and angle.
///
/// # Arguments
///
/// * `axis` - The axis of rotation.
/// * `angle` - The angle of rotation in radians.
///
/// # Returns
///
/// The rotation matrix.
///
/// Example:
///
/// ```no_run
/// use slamcolmap_3d::transforms::axis_angle_to_rotation_matrix;
///
/// let axis = [1.0, 0.0, 0.0];
/// let angle = std::f64::consts::PI / 2.0;
/// let rotation = axis_angle_to_rotation_matrix(&axis, angle).unwrap();
/// ```
pub fn axis_angle_to_rotation_matrix(
    axis: &[f64; 3],
    angle: f64,
) -> Result<[[f64; 3]; 3], &'static str> {
    let axis_norm = {
        let magnitude = (axis[0].powi(2) + axis[1].powi(2) + axis[2].powi(2)).sqrt();
        match magnitude < 1e-10 {
            true => return Err("cannot compute rotation matrix from a zero vector"),
            false => [
                axis[0] / magnitude,
                axis[1] / magnitude,
                axis[2] / magnitude,
            ],
        }
    };

    let [x, y, z] = axis_norm;

    let c = angle.cos();
    let s = angle.sin();
    let t = 1.0 - c;

    Ok([
        [c + x * x * t, x * y * t - z * s, x * z * t + y * s],
        [x * y * t + z * s, c + y * y * t, y * z * t - x * s],
        [x * z * t - y * s, y * z * t + x * s, c + z * z * t],
    ])
}

/// Convert a rotation matrix into a unit quaternion ordered as `[qw, qx, qy, qz]`.
///
/// Uses Shepherd's method: the largest of the four squared components is
/// recovered from the diagonal first and the remaining ones are derived from it,
/// which keeps the division well conditioned for every rotation. The result is
/// normalized and its sign is chosen so that `qw >= 0`.
///
/// PRECONDITION: `rotation` is (close to) orthonormal with determinant +1.
pub fn rotation_matrix_to_quaternion(rotation: &[[f64; 3]; 3]) -> [f64; 4] {
    let r = rotation;
    let trace = r[0][0] + r[1][1] + r[2][2];

    let q = if trace >= r[0][0] && trace >= r[1][1] && trace >= r[2][2] {
        let s = (1.0 + trace).max(0.0).sqrt() * 2.0; // s = 4 * qw
        [
            0.25 * s,
            (r[2][1] - r[1][2]) / s,
            (r[0][2] - r[2][0]) / s,
            (r[1][0] - r[0][1]) / s,
        ]
    } else if r[0][0] >= r[1][1] && r[0][0] >= r[2][2] {
        let s = (1.0 + r[0][0] - r[1][1] - r[2][2]).max(0.0).sqrt() * 2.0; // s = 4 * qx
        [
            (r[2][1] - r[1][2]) / s,
            0.25 * s,
            (r[0][1] + r[1][0]) / s,
            (r[0][2] + r[2][0]) / s,
        ]
    } else if r[1][1] >= r[2][2] {
        let s = (1.0 + r[1][1] - r[0][0] - r[2][2]).max(0.0).sqrt() * 2.0; // s = 4 * qy
        [
            (r[0][2] - r[2][0]) / s,
            (r[0][1] + r[1][0]) / s,
            0.25 * s,
            (r[1][2] + r[2][1]) / s,
        ]
    } else {
        let s = (1.0 + r[2][2] - r[0][0] - r[1][1]).max(0.0).sqrt() * 2.0; // s = 4 * qz
        [
            (r[1][0] - r[0][1]) / s,
            (r[0][2] + r[2][0]) / s,
            (r[1][2] + r[2][1]) / s,
            0.25 * s,
        ]
    };

    let norm = quaternion_norm(&q);
    let sign = if q[0] < 0.0 { -1.0 } else { 1.0 };
    q.map(|v| sign * v / norm)
}

/// Convert a quaternion `[qw, qx, qy, qz]` into a rotation matrix.
///
/// The quaternion is normalized before conversion.
pub fn quaternion_to_rotation_matrix(q: &[f64; 4]) -> [[f64; 3]; 3] {
    let norm = quaternion_norm(q);
    let [w, x, y, z] = q.map(|v| v / norm);

    [
        [
            1.0 - 2.0 * (y * y + z * z),
            2.0 * (x * y - z * w),
            2.0 * (x * z + y * w),
        ],
        [
            2.0 * (x * y + z * w),
            1.0 - 2.0 * (x * x + z * z),
            2.0 * (y * z - x * w),
        ],
        [
            2.0 * (x * z - y * w),
            2.0 * (y * z + x * w),
            1.0 - 2.0 * (x * x + y * y),
        ],
    ]
}

/// Euclidean norm of a quaternion.
#[inline]
pub fn quaternion_norm(q: &[f64; 4]) -> f64 {
    (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn assert_mat_eq(a: &[[f64; 3]; 3], b: &[[f64; 3]; 3]) {
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a[i][j], b[i][j], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_axis_angle_to_rotation_matrix() -> Result<(), Box<dyn std::error::Error>> {
        let axis = [1.0, 0.0, 0.0];
        let angle = std::f64::consts::PI / 2.0;
        let rotation = axis_angle_to_rotation_matrix(&axis, angle)?;
        let expected = [[1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]];
        assert_mat_eq(&rotation, &expected);
        assert!(axis_angle_to_rotation_matrix(&[0.0, 0.0, 0.0], 1.0).is_err());
        Ok(())
    }

    #[test]
    fn test_identity_to_quaternion() {
        let identity = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
        assert_eq!(rotation_matrix_to_quaternion(&identity), [1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_half_turn_branches() -> Result<(), Box<dyn std::error::Error>> {
        // 180 degree rotations have qw = 0 and exercise the non-trace branches
        for (axis, expected) in [
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, 1.0, 0.0]),
            ([0.0, 0.0, 1.0], [0.0, 0.0, 0.0, 1.0]),
        ] {
            let rotation = axis_angle_to_rotation_matrix(&axis, std::f64::consts::PI)?;
            let q = rotation_matrix_to_quaternion(&rotation);
            for k in 0..4 {
                assert_relative_eq!(q[k].abs(), expected[k], epsilon = 1e-9);
            }
        }
        Ok(())
    }

    #[test]
    fn test_quaternion_roundtrip_random() -> Result<(), Box<dyn std::error::Error>> {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let axis = [
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
                rng.random_range(-1.0..1.0),
            ];
            let angle = rng.random_range(-std::f64::consts::PI..std::f64::consts::PI);
            let Ok(rotation) = axis_angle_to_rotation_matrix(&axis, angle) else {
                continue;
            };
            let q = rotation_matrix_to_quaternion(&rotation);
            assert_relative_eq!(quaternion_norm(&q), 1.0, epsilon = 1e-12);
            assert!(q[0] >= 0.0);
            assert_mat_eq(&quaternion_to_rotation_matrix(&q), &rotation);
        }
        Ok(())
    }
}
