use std::{fs::File, path::Path};

use approx::assert_relative_eq;
use ndarray::{Array2, Array3, Array4};
use ndarray_npy::NpzWriter;
use slamcolmap_io::{archive::read_slam_archive, error::IoError};

const NUM_FRAMES: usize = 3;
const HEIGHT: usize = 4;
const WIDTH: usize = 6;

fn images() -> Array4<u8> {
    Array4::from_shape_fn((NUM_FRAMES, HEIGHT, WIDTH, 3), |(n, v, u, c)| {
        (n * 50 + v * 10 + u + c) as u8
    })
}

fn poses_f32(rows: usize) -> Array3<f32> {
    Array3::from_shape_fn((NUM_FRAMES, rows, 4), |(n, i, j)| {
        if i == j {
            1.0
        } else if j == 3 && i < 3 {
            n as f32 + i as f32 * 0.5
        } else {
            0.0
        }
    })
}

fn camera_matrix() -> Array2<f64> {
    ndarray::arr2(&[[500.0, 0.0, 3.0], [0.0, 510.0, 2.0], [0.0, 0.0, 1.0]])
}

fn write_npz(path: &Path, write: impl FnOnce(&mut NpzWriter<File>)) {
    let mut npz = NpzWriter::new(File::create(path).unwrap());
    write(&mut npz);
    npz.finish().unwrap();
}

#[test]
fn read_archive_with_primary_names() -> Result<(), IoError> {
    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("droid.npz");
    write_npz(&path, |npz| {
        npz.add_array("images", &images()).unwrap();
        npz.add_array("cam_c2w", &poses_f32(4)).unwrap();
        npz.add_array("intrinsic", &camera_matrix()).unwrap();
        npz.add_array("depths", &Array3::<f32>::from_elem((NUM_FRAMES, HEIGHT, WIDTH), 1.5))
            .unwrap();
    });

    let sequence = read_slam_archive(&path)?;
    assert_eq!(sequence.frames.len(), NUM_FRAMES);
    assert_eq!(sequence.intrinsics.width, WIDTH as u64);
    assert_eq!(sequence.intrinsics.height, HEIGHT as u64);
    assert_eq!(sequence.intrinsics.params(), [500.0, 510.0, 3.0, 2.0]);

    let frame = &sequence.frames[2];
    assert_eq!(frame.color.get(1, 3), [100 + 30 + 1, 100 + 30 + 2, 100 + 30 + 3]);
    assert_relative_eq!(frame.cam_to_world[1][3], 2.5);
    assert_relative_eq!(frame.cam_to_world[2][2], 1.0);
    let depth = frame.depth.as_ref().unwrap();
    assert_relative_eq!(depth.get(5, 3), 1.5);
    Ok(())
}

#[test]
fn read_archive_with_fallback_names() -> Result<(), IoError> {
    let tmp_dir = tempfile::tempdir()?;
    let path = tmp_dir.path().join("slam.npz");
    write_npz(&path, |npz| {
        npz.add_array("images", &images()).unwrap();
        npz.add_array("poses", &poses_f32(3).mapv(f64::from)).unwrap();
        npz.add_array(
            "intrinsics",
            &camera_matrix()
                .broadcast((NUM_FRAMES, 3, 3))
                .unwrap()
                .to_owned(),
        )
        .unwrap();
    });

    let sequence = read_slam_archive(&path)?;
    assert_eq!(sequence.frames.len(), NUM_FRAMES);
    assert!(sequence.frames.iter().all(|frame| frame.depth.is_none()));
    assert_relative_eq!(sequence.frames[1].cam_to_world[0][3], 1.0);
    assert_relative_eq!(sequence.intrinsics.fx, 500.0);
    Ok(())
}

#[test]
fn missing_required_field() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("broken.npz");
    write_npz(&path, |npz| {
        npz.add_array("images", &images()).unwrap();
        npz.add_array("cam_c2w", &poses_f32(4)).unwrap();
    });

    let result = read_slam_archive(&path);
    assert!(matches!(result, Err(IoError::MissingField("intrinsic", _))));
}

#[test]
fn invalid_pose_shape() {
    let tmp_dir = tempfile::tempdir().unwrap();
    let path = tmp_dir.path().join("broken.npz");
    write_npz(&path, |npz| {
        npz.add_array("images", &images()).unwrap();
        npz.add_array("cam_c2w", &Array3::<f64>::zeros((NUM_FRAMES, 2, 4))).unwrap();
        npz.add_array("intrinsic", &camera_matrix()).unwrap();
    });

    let result = read_slam_archive(&path);
    assert!(matches!(result, Err(IoError::InvalidShape { .. })));
}

#[test]
fn missing_archive() {
    let result = read_slam_archive("/does/not/exist.npz");
    assert!(matches!(result, Err(IoError::FileDoesNotExist(_))));
}

#[test]
fn empty_frames_are_rejected() {
    let tmp_dir = tempfile::tempdir().unwrap();

    let path = tmp_dir.path().join("no_width.npz");
    write_npz(&path, |npz| {
        npz.add_array("images", &Array4::<u8>::zeros((2, HEIGHT, 0, 3))).unwrap();
        npz.add_array("cam_c2w", &poses_f32(4)).unwrap();
        npz.add_array("intrinsic", &camera_matrix()).unwrap();
    });
    assert!(matches!(
        read_slam_archive(&path),
        Err(IoError::InvalidShape { ref field, .. }) if field.starts_with("images")
    ));

    let path = tmp_dir.path().join("no_depth_rows.npz");
    write_npz(&path, |npz| {
        npz.add_array("images", &images()).unwrap();
        npz.add_array("cam_c2w", &poses_f32(4)).unwrap();
        npz.add_array("intrinsic", &camera_matrix()).unwrap();
        npz.add_array("depths", &Array3::<f32>::zeros((NUM_FRAMES, 0, WIDTH))).unwrap();
    });
    assert!(matches!(
        read_slam_archive(&path),
        Err(IoError::InvalidShape { ref field, .. }) if field.starts_with("depths")
    ));
}
