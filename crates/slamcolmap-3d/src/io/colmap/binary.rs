use std::{
    fs::File,
    io::{BufRead, BufReader, BufWriter, Read, Write},
    path::Path,
};

use super::{require_file, CameraModelId, ColmapError, CAMERAS_BIN, IMAGES_BIN, POINTS3D_BIN};
use crate::{
    camera::CameraIntrinsics,
    pose::Pose,
    reconstruction::{Camera, Image, Point3D, Reconstruction},
};

// Upper bound on pre-allocation driven by counts read from a file.
const MAX_PREALLOC: usize = 1 << 16;

/// Little-endian, fixed-width integers: the layout of the COLMAP `.bin` files.
fn config() -> impl bincode::config::Config {
    bincode::config::legacy()
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct CameraHeader {
    camera_id: i32,
    model_id: i32,
    width: u64,
    height: u64,
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct PinholeParams {
    fx: f64,
    fy: f64,
    cx: f64,
    cy: f64,
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct ImageHeader {
    image_id: u32,
    qw: f64,
    qx: f64,
    qy: f64,
    qz: f64,
    tx: f64,
    ty: f64,
    tz: f64,
    camera_id: u32,
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct Point2DRecord {
    x: f64,
    y: f64,
    point3d_id: i64,
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct Point3DRecord {
    point3d_id: u64,
    x: f64,
    y: f64,
    z: f64,
    r: u8,
    g: u8,
    b: u8,
    error: f64,
}

#[derive(Debug, bincode::Encode, bincode::Decode)]
struct TrackRecord {
    image_id: u32,
    point2d_idx: u32,
}

fn write_record<W: Write, T: bincode::Encode>(
    writer: &mut W,
    record: &T,
) -> Result<(), ColmapError> {
    bincode::encode_into_std_write(record, writer, config())?;
    Ok(())
}

fn read_record<R: Read, T: bincode::Decode<()>>(reader: &mut R) -> Result<T, ColmapError> {
    Ok(bincode::decode_from_std_read(reader, config())?)
}

fn read_count<R: Read>(reader: &mut R) -> Result<usize, ColmapError> {
    let count: u64 = read_record(reader)?;
    usize::try_from(count).map_err(|_| ColmapError::ParseError(format!("count {count} too large")))
}

/// Encode the cameras of a reconstruction in the cameras.bin layout.
///
/// `u64` count, then per camera `i32` id, `i32` model id, `u64` width, `u64`
/// height and the four pinhole parameters as `f64`.
pub fn encode_cameras_bin<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    write_record(writer, &(reconstruction.num_cameras() as u64))?;
    for camera in reconstruction.cameras() {
        let camera_id = i32::try_from(camera.id)
            .map_err(|_| ColmapError::ParseError(format!("camera id {} exceeds i32", camera.id)))?;
        let intrinsics = &camera.intrinsics;
        write_record(
            writer,
            &CameraHeader {
                camera_id,
                model_id: CameraModelId::Pinhole as i32,
                width: intrinsics.width,
                height: intrinsics.height,
            },
        )?;
        write_record(
            writer,
            &PinholeParams {
                fx: intrinsics.fx,
                fy: intrinsics.fy,
                cx: intrinsics.cx,
                cy: intrinsics.cy,
            },
        )?;
    }
    Ok(())
}

/// Encode the images of a reconstruction in the images.bin layout.
///
/// `u64` count, then per image the `u32` id, `f64` quaternion `(qw, qx, qy, qz)`,
/// `f64` translation, `u32` camera id, the NUL terminated name and a zero `u64`
/// 2D point count.
pub fn encode_images_bin<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    write_record(writer, &(reconstruction.num_images() as u64))?;
    for image in reconstruction.images() {
        let [qw, qx, qy, qz] = *image.pose.rotation();
        let [tx, ty, tz] = *image.pose.translation();
        write_record(
            writer,
            &ImageHeader {
                image_id: image.id,
                qw,
                qx,
                qy,
                qz,
                tx,
                ty,
                tz,
                camera_id: image.camera_id,
            },
        )?;
        if image.name.as_bytes().contains(&0) {
            return Err(ColmapError::ParseError(format!(
                "image name {:?} contains a NUL byte",
                image.name
            )));
        }
        writer.write_all(image.name.as_bytes())?;
        writer.write_all(&[0])?;
        write_record(writer, &0u64)?;
    }
    Ok(())
}

/// Encode the points of a reconstruction in the points3D.bin layout.
///
/// `u64` count, then per point the `u64` id, `f64` position, `u8` color, `f64`
/// error, `u64` track length and the track as `(u32, u32)` pairs.
pub fn encode_points3d_bin<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    write_record(writer, &(reconstruction.num_points() as u64))?;
    for point in reconstruction.points() {
        let [x, y, z] = point.position;
        let [r, g, b] = point.color;
        write_record(
            writer,
            &Point3DRecord {
                point3d_id: point.id,
                x,
                y,
                z,
                r,
                g,
                b,
                error: point.error,
            },
        )?;
        write_record(writer, &(point.track.len() as u64))?;
        for &(image_id, point2d_idx) in &point.track {
            write_record(writer, &TrackRecord { image_id, point2d_idx })?;
        }
    }
    Ok(())
}

/// Decode the cameras of a cameras.bin stream. Only the pinhole model is supported.
pub fn decode_cameras_bin<R: Read>(reader: &mut R) -> Result<Vec<Camera>, ColmapError> {
    let count = read_count(reader)?;
    let mut cameras = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let header: CameraHeader = read_record(reader)?;
        let model = CameraModelId::from_id(header.model_id)
            .ok_or_else(|| ColmapError::UnsupportedCameraModel(header.model_id.to_string()))?;
        if model != CameraModelId::Pinhole {
            return Err(ColmapError::UnsupportedCameraModel(model.name().to_string()));
        }
        let id = u32::try_from(header.camera_id).map_err(|_| {
            ColmapError::ParseError(format!("negative camera id {}", header.camera_id))
        })?;
        let params: PinholeParams = read_record(reader)?;
        let intrinsics = CameraIntrinsics::new(
            header.width,
            header.height,
            params.fx,
            params.fy,
            params.cx,
            params.cy,
        )
        .map_err(|e| ColmapError::ParseError(format!("camera {id}: {e}")))?;
        cameras.push(Camera { id, intrinsics });
    }
    Ok(cameras)
}

/// Decode the images of an images.bin stream. 2D points are read and dropped.
pub fn decode_images_bin<R: BufRead>(reader: &mut R) -> Result<Vec<Image>, ColmapError> {
    let count = read_count(reader)?;
    let mut images = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let header: ImageHeader = read_record(reader)?;

        let mut name = Vec::new();
        reader.read_until(0, &mut name)?;
        if name.pop() != Some(0) {
            return Err(ColmapError::ParseError(format!(
                "unterminated name for image {}",
                header.image_id
            )));
        }
        let name = String::from_utf8(name)
            .map_err(|e| ColmapError::ParseError(format!("image {}: {e}", header.image_id)))?;

        let num_points2d = read_count(reader)?;
        for _ in 0..num_points2d {
            let _: Point2DRecord = read_record(reader)?;
        }

        let pose = Pose::new(
            [header.qw, header.qx, header.qy, header.qz],
            [header.tx, header.ty, header.tz],
        )
        .map_err(|e| ColmapError::ParseError(format!("image {}: {e}", header.image_id)))?;

        images.push(Image {
            id: header.image_id,
            name,
            camera_id: header.camera_id,
            pose,
        });
    }
    Ok(images)
}

/// Decode the points of a points3D.bin stream.
pub fn decode_points3d_bin<R: Read>(reader: &mut R) -> Result<Vec<Point3D>, ColmapError> {
    let count = read_count(reader)?;
    let mut points = Vec::with_capacity(count.min(MAX_PREALLOC));
    for _ in 0..count {
        let record: Point3DRecord = read_record(reader)?;
        let track_length = read_count(reader)?;
        let track = (0..track_length)
            .map(|_| {
                let entry: TrackRecord = read_record(reader)?;
                Ok((entry.image_id, entry.point2d_idx))
            })
            .collect::<Result<Vec<_>, ColmapError>>()?;
        points.push(Point3D {
            id: record.point3d_id,
            position: [record.x, record.y, record.z],
            color: [record.r, record.g, record.b],
            error: record.error,
            track,
        });
    }
    Ok(points)
}

/// Read the cameras.bin file and return its cameras.
pub fn read_cameras_bin(path: impl AsRef<Path>) -> Result<Vec<Camera>, ColmapError> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_cameras_bin(&mut reader)
}

/// Read the images.bin file and return its images.
pub fn read_images_bin(path: impl AsRef<Path>) -> Result<Vec<Image>, ColmapError> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_images_bin(&mut reader)
}

/// Read the points3D.bin file and return its points.
pub fn read_points3d_bin(path: impl AsRef<Path>) -> Result<Vec<Point3D>, ColmapError> {
    let mut reader = BufReader::new(File::open(path)?);
    decode_points3d_bin(&mut reader)
}

fn write_file<F>(path: &Path, encode: F) -> Result<(), ColmapError>
where
    F: FnOnce(&mut BufWriter<File>) -> Result<(), ColmapError>,
{
    let mut writer = BufWriter::new(File::create(path)?);
    encode(&mut writer)?;
    writer.flush()?;
    log::debug!("wrote {}", path.display());
    Ok(())
}

/// Write cameras.bin, images.bin and points3D.bin into `dir`.
pub fn write_model_binary(
    dir: impl AsRef<Path>,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    let dir = dir.as_ref();
    write_file(&dir.join(CAMERAS_BIN), |w| encode_cameras_bin(w, reconstruction))?;
    write_file(&dir.join(IMAGES_BIN), |w| encode_images_bin(w, reconstruction))?;
    write_file(&dir.join(POINTS3D_BIN), |w| encode_points3d_bin(w, reconstruction))?;
    Ok(())
}

/// Read a binary model from `dir`. A missing points3D.bin yields an empty cloud.
pub fn read_model_binary(dir: impl AsRef<Path>) -> Result<Reconstruction, ColmapError> {
    let dir = dir.as_ref();
    let cameras_path = dir.join(CAMERAS_BIN);
    let images_path = dir.join(IMAGES_BIN);
    require_file(&cameras_path)?;
    require_file(&images_path)?;

    let cameras = read_cameras_bin(&cameras_path)?;
    let images = read_images_bin(&images_path)?;
    let points_path = dir.join(POINTS3D_BIN);
    let points = if points_path.is_file() {
        read_points3d_bin(&points_path)?
    } else {
        Vec::new()
    };

    Ok(Reconstruction::new(cameras, images, points)?)
}
