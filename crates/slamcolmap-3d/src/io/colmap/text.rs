use std::{
    fs::File,
    io::{BufWriter, Write},
    iter::{Enumerate, Peekable},
    path::Path,
    str::Lines,
};

use super::{require_file, CameraModelId, ColmapError, CAMERAS_TXT, IMAGES_TXT, POINTS3D_TXT};
use crate::{
    camera::CameraIntrinsics,
    pose::Pose,
    reconstruction::{Camera, Image, Point3D, Reconstruction},
};

/// Utility functions for parsing COLMAP text files
fn parse_part<T: std::str::FromStr>(s: &str) -> Result<T, ColmapError>
where
    T::Err: std::fmt::Display,
{
    s.parse::<T>()
        .map_err(|e| ColmapError::ParseError(format!("{}: {}", s, e)))
}

fn parse_array<T: std::str::FromStr + Default + Copy, const N: usize>(
    parts: &[&str],
) -> Result<[T; N], ColmapError>
where
    T::Err: std::fmt::Display,
{
    if parts.len() != N {
        return Err(ColmapError::ParseError(format!(
            "expected {} values, got {}",
            N,
            parts.len()
        )));
    }
    let mut out = [T::default(); N];
    for (dst, src) in out.iter_mut().zip(parts) {
        *dst = parse_part(src)?;
    }
    Ok(out)
}

/// Lines that carry data: not blank and not a `#` comment.
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Prefix parse errors with the line they come from.
fn at_line(line_no: usize) -> impl Fn(ColmapError) -> ColmapError {
    move |e| match e {
        ColmapError::ParseError(msg) => ColmapError::ParseError(format!("line {line_no}: {msg}")),
        other => other,
    }
}

/// Parse a camera line and return a Camera.
///       CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[0], PARAMS[1], ...
fn parse_camera_line(line: &str) -> Result<Camera, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 5 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    let model = CameraModelId::from_name(parts[1])
        .ok_or_else(|| ColmapError::ParseError(format!("Invalid camera model id: {}", parts[1])))?;
    if model != CameraModelId::Pinhole {
        return Err(ColmapError::UnsupportedCameraModel(parts[1].to_string()));
    }
    if parts.len() - 4 != model.num_params() {
        return Err(ColmapError::InvalidNumCameraParams(parts.len() - 4));
    }

    let id = parse_part(parts[0])?;
    let [fx, fy, cx, cy] = parse_array::<f64, 4>(&parts[4..])?;
    let (width, height) = (parse_part(parts[2])?, parse_part(parts[3])?);
    let intrinsics = CameraIntrinsics::new(width, height, fx, fy, cx, cy)
        .map_err(|e| ColmapError::ParseError(format!("camera {id}: {e}")))?;

    Ok(Camera { id, intrinsics })
}

/// The typed fields of an images.txt metadata line.
///       IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
#[derive(Debug, Clone, PartialEq)]
pub struct ImageMetadataLine<'a> {
    /// Image id
    pub image_id: u32,
    /// Quaternion `(qw, qx, qy, qz)`
    pub rotation: [f64; 4],
    /// Translation `(tx, ty, tz)`
    pub translation: [f64; 3],
    /// Camera id field, kept as text
    pub camera_id: &'a str,
    /// Image name
    pub name: &'a str,
    /// The whole line, trimmed
    pub raw: &'a str,
}

impl<'a> ImageMetadataLine<'a> {
    /// Parse a metadata line. The name must not be numeric.
    pub fn parse(line: &'a str) -> Result<Self, ColmapError> {
        let parts = line.split_whitespace().collect::<Vec<_>>();
        if parts.len() != 10 {
            return Err(ColmapError::ParseError(format!(
                "image line needs 10 fields, got {}",
                parts.len()
            )));
        }
        if parts[9].parse::<f64>().is_ok() {
            return Err(ColmapError::ParseError(format!(
                "image name {:?} is a number",
                parts[9]
            )));
        }
        Ok(Self {
            image_id: parse_part(parts[0])?,
            rotation: parse_array(&parts[1..5])?,
            translation: parse_array(&parts[5..8])?,
            camera_id: parts[8],
            name: parts[9],
            raw: line.trim(),
        })
    }

    /// Convert into an [`Image`], parsing the camera id and validating the pose.
    pub fn to_image(&self) -> Result<Image, ColmapError> {
        let pose = Pose::new(self.rotation, self.translation)
            .map_err(|e| ColmapError::ParseError(format!("image {}: {e}", self.image_id)))?;
        Ok(Image {
            id: self.image_id,
            name: self.name.to_string(),
            camera_id: parse_part(self.camera_id)?,
            pose,
        })
    }
}

/// Returns true for a valid 2D points line: `(X, Y, POINT3D_ID)` triples, possibly none.
pub fn is_points2d_line(line: &str) -> bool {
    let parts = line.split_whitespace().collect::<Vec<_>>();
    parts.len() % 3 == 0
        && parts.chunks_exact(3).all(|chunk| {
            chunk[0].parse::<f64>().is_ok()
                && chunk[1].parse::<f64>().is_ok()
                && chunk[2].parse::<i64>().is_ok()
        })
}

/// One logical entry of an images.txt file.
#[derive(Debug, Clone, PartialEq)]
pub enum ImagesTxtEntry<'a> {
    /// A `#` comment line
    Comment(&'a str),
    /// A metadata line with its 2D points line, `None` when the points line is missing
    Record {
        /// 1-based line number of the metadata line
        line_no: usize,
        /// The metadata line
        metadata: ImageMetadataLine<'a>,
        /// The points line that followed it
        points: Option<&'a str>,
    },
    /// A line in metadata position that is not a valid metadata line
    Unrecognized {
        /// 1-based line number
        line_no: usize,
        /// The offending line
        content: &'a str,
    },
}

/// Reads images.txt as a sequence of two-line records.
///
/// The reader alternates between expecting a metadata line and expecting its
/// points line. Comments are passed through in either state and do not advance
/// it. Blank lines are skipped while expecting metadata and are the (empty)
/// points line otherwise. When the line after a metadata line is not a valid
/// points line the record is closed without points and that line is read
/// again as metadata.
pub struct ImagesTxtReader<'a> {
    lines: Peekable<Enumerate<Lines<'a>>>,
    pending: Option<(usize, ImageMetadataLine<'a>)>,
}

impl<'a> ImagesTxtReader<'a> {
    /// Create a reader over the full content of an images.txt file.
    pub fn new(content: &'a str) -> Self {
        Self {
            lines: content.lines().enumerate().peekable(),
            pending: None,
        }
    }
}

impl<'a> Iterator for ImagesTxtReader<'a> {
    type Item = ImagesTxtEntry<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let Some(&(index, raw)) = self.lines.peek() else {
                return self.pending.take().map(|(line_no, metadata)| ImagesTxtEntry::Record {
                    line_no,
                    metadata,
                    points: None,
                });
            };
            let line = raw.trim();
            let line_no = index + 1;

            if line.starts_with('#') {
                self.lines.next();
                return Some(ImagesTxtEntry::Comment(line));
            }

            if let Some((meta_line_no, metadata)) = self.pending.take() {
                let points = if is_points2d_line(line) {
                    self.lines.next();
                    Some(line)
                } else {
                    None
                };
                return Some(ImagesTxtEntry::Record {
                    line_no: meta_line_no,
                    metadata,
                    points,
                });
            }

            self.lines.next();
            if line.is_empty() {
                continue;
            }
            match ImageMetadataLine::parse(line) {
                Ok(metadata) => self.pending = Some((line_no, metadata)),
                Err(_) => {
                    return Some(ImagesTxtEntry::Unrecognized {
                        line_no,
                        content: line,
                    })
                }
            }
        }
    }
}

/// Parse a point3d line and return a Point3D.
///       POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[0], TRACK[1], ...
fn parse_point3d_line(line: &str) -> Result<Point3D, ColmapError> {
    let parts = line.split_whitespace().collect::<Vec<_>>();

    if parts.len() < 8 || (parts.len() - 8) % 2 != 0 {
        return Err(ColmapError::ParseError(format!(
            "Invalid number of parts: {}",
            parts.len()
        )));
    }

    Ok(Point3D {
        id: parse_part(parts[0])?,
        position: parse_array(&parts[1..4])?,
        color: parse_array(&parts[4..7])?,
        error: parse_part(parts[7])?,
        track: parts[8..]
            .chunks_exact(2)
            .map(|chunk| -> Result<(u32, u32), ColmapError> {
                Ok((parse_part(chunk[0])?, parse_part(chunk[1])?))
            })
            .collect::<Result<Vec<_>, _>>()?,
    })
}

/// Decode the content of a cameras.txt file.
pub fn decode_cameras_txt(content: &str) -> Result<Vec<Camera>, ColmapError> {
    data_lines(content)
        .map(|(line_no, line)| parse_camera_line(line).map_err(at_line(line_no)))
        .collect()
}

/// Decode the content of an images.txt file. 2D points are dropped.
///
/// Lines that cannot be read as image metadata are an error.
pub fn decode_images_txt(content: &str) -> Result<Vec<Image>, ColmapError> {
    let mut images = Vec::new();
    for entry in ImagesTxtReader::new(content) {
        match entry {
            ImagesTxtEntry::Comment(_) => {}
            ImagesTxtEntry::Record { line_no, metadata, .. } => {
                images.push(metadata.to_image().map_err(at_line(line_no))?)
            }
            ImagesTxtEntry::Unrecognized { line_no, content } => {
                return Err(ColmapError::ParseError(format!(
                    "line {line_no}: not an image line: {content:?}"
                )))
            }
        }
    }
    Ok(images)
}

/// Decode the content of a points3D.txt file.
pub fn decode_points3d_txt(content: &str) -> Result<Vec<Point3D>, ColmapError> {
    data_lines(content)
        .map(|(line_no, line)| parse_point3d_line(line).map_err(at_line(line_no)))
        .collect()
}

fn read_to_string(path: impl AsRef<Path>) -> Result<String, ColmapError> {
    Ok(std::fs::read_to_string(path)?)
}

/// Read the cameras.txt file and return a vector of cameras.
///
/// # Arguments
///
/// * `path` - The path to the cameras.txt file.
pub fn read_cameras_txt(path: impl AsRef<Path>) -> Result<Vec<Camera>, ColmapError> {
    decode_cameras_txt(&read_to_string(path)?)
}

/// Read the images.txt file and return a vector of images.
///
/// # Arguments
///
/// * `path` - The path to the images.txt file.
pub fn read_images_txt(path: impl AsRef<Path>) -> Result<Vec<Image>, ColmapError> {
    decode_images_txt(&read_to_string(path)?)
}

/// Read the points3D.txt file and return a vector of points.
///
/// # Arguments
///
/// * `path` - The path to the points3D.txt file.
pub fn read_points3d_txt(path: impl AsRef<Path>) -> Result<Vec<Point3D>, ColmapError> {
    decode_points3d_txt(&read_to_string(path)?)
}

/// Encode the cameras of a reconstruction as cameras.txt.
pub fn encode_cameras_txt<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    writeln!(writer, "# Camera list with one line of data per camera:")?;
    writeln!(writer, "#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]")?;
    writeln!(writer, "# Number of cameras: {}", reconstruction.num_cameras())?;
    for camera in reconstruction.cameras() {
        let c = &camera.intrinsics;
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {}",
            camera.id,
            CameraModelId::Pinhole.name(),
            c.width,
            c.height,
            c.fx,
            c.fy,
            c.cx,
            c.cy
        )?;
    }
    Ok(())
}

/// Encode the images of a reconstruction as images.txt.
///
/// Every image takes two lines; the points line is always written, empty.
pub fn encode_images_txt<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    writeln!(writer, "# Image list with two lines of data per image:")?;
    writeln!(writer, "#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME")?;
    writeln!(writer, "#   POINTS2D[] as (X, Y, POINT3D_ID)")?;
    writeln!(
        writer,
        "# Number of images: {}, mean observations per image: 0",
        reconstruction.num_images()
    )?;
    for image in reconstruction.images() {
        let [qw, qx, qy, qz] = image.pose.rotation();
        let [tx, ty, tz] = image.pose.translation();
        writeln!(
            writer,
            "{} {} {} {} {} {} {} {} {} {}",
            image.id, qw, qx, qy, qz, tx, ty, tz, image.camera_id, image.name
        )?;
        writeln!(writer)?;
    }
    Ok(())
}

/// Encode the points of a reconstruction as points3D.txt.
pub fn encode_points3d_txt<W: Write>(
    writer: &mut W,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    let points = reconstruction.points();
    let mean_track = if points.is_empty() {
        0.0
    } else {
        points.iter().map(|p| p.track.len()).sum::<usize>() as f64 / points.len() as f64
    };
    writeln!(writer, "# 3D point list with one line of data per point:")?;
    writeln!(
        writer,
        "#   POINT3D_ID, X, Y, Z, R, G, B, ERROR, TRACK[] as (IMAGE_ID, POINT2D_IDX)"
    )?;
    writeln!(
        writer,
        "# Number of points: {}, mean track length: {}",
        points.len(),
        mean_track
    )?;
    for point in points {
        let [x, y, z] = point.position;
        let [r, g, b] = point.color;
        write!(writer, "{} {} {} {} {} {} {} {}", point.id, x, y, z, r, g, b, point.error)?;
        for (image_id, point2d_idx) in &point.track {
            write!(writer, " {} {}", image_id, point2d_idx)?;
        }
        writeln!(writer)?;
    }
    Ok(())
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

/// Write cameras.txt, images.txt and points3D.txt into `dir`.
pub fn write_model_text(
    dir: impl AsRef<Path>,
    reconstruction: &Reconstruction,
) -> Result<(), ColmapError> {
    let dir = dir.as_ref();
    write_file(&dir.join(CAMERAS_TXT), |w| encode_cameras_txt(w, reconstruction))?;
    write_file(&dir.join(IMAGES_TXT), |w| encode_images_txt(w, reconstruction))?;
    write_file(&dir.join(POINTS3D_TXT), |w| encode_points3d_txt(w, reconstruction))?;
    Ok(())
}

/// Read a text model from `dir`. A missing points3D.txt yields an empty cloud.
pub fn read_model_text(dir: impl AsRef<Path>) -> Result<Reconstruction, ColmapError> {
    let dir = dir.as_ref();
    let cameras_path = dir.join(CAMERAS_TXT);
    let images_path = dir.join(IMAGES_TXT);
    require_file(&cameras_path)?;
    require_file(&images_path)?;

    let cameras = read_cameras_txt(&cameras_path)?;
    let images = read_images_txt(&images_path)?;
    let points_path = dir.join(POINTS3D_TXT);
    let points = if points_path.is_file() {
        read_points3d_txt(&points_path)?
    } else {
        Vec::new()
    };

    Ok(Reconstruction::new(cameras, images, points)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAMERAS: &str = "# Camera list with one line of data per camera:
#   CAMERA_ID, MODEL, WIDTH, HEIGHT, PARAMS[]

1 PINHOLE 1920 1080 1000.5 1001 960 540
";

    #[test]
    fn test_decode_cameras_txt() -> Result<(), ColmapError> {
        let cameras = decode_cameras_txt(CAMERAS)?;
        assert_eq!(cameras.len(), 1);
        assert_eq!(cameras[0].id, 1);
        assert_eq!(cameras[0].intrinsics.width, 1920);
        assert_eq!(cameras[0].intrinsics.params(), [1000.5, 1001.0, 960.0, 540.0]);
        Ok(())
    }

    #[test]
    fn test_decode_cameras_txt_errors() {
        assert!(matches!(
            decode_cameras_txt("1 PINHOLE 10 10 1 1 1"),
            Err(ColmapError::InvalidNumCameraParams(3))
        ));
        assert!(matches!(
            decode_cameras_txt("1 SIMPLE_PINHOLE 10 10 1 1 1"),
            Err(ColmapError::UnsupportedCameraModel(_))
        ));
        assert!(decode_cameras_txt("1 FANCY 10 10 1 1 1 1").is_err());
    }

    #[test]
    fn test_decode_images_txt_tolerant() -> Result<(), ColmapError> {
        let content = "# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME

1 1 0 0 0 0.5 0 0 1 00000.jpg
10.0 20.0 -1 11.5 2.25 3
# a comment in the middle
2 1 0 0 0 0 0.5 0 1 00001.jpg
3 1 0 0 0 0 0 0.5 1 00002.jpg

";
        let images = decode_images_txt(content)?;
        assert_eq!(images.iter().map(|i| i.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(images[1].name, "00001.jpg");
        assert_eq!(images[2].pose.translation(), &[0.0, 0.0, 0.5]);
        Ok(())
    }

    #[test]
    fn test_images_reader_entries() {
        let content = "# header\n1 1 0 0 0 0 0 0 1 a.jpg\n\n\
            2 1 0 0 0 0 0 0 1 b.jpg\ngarbage line\n";
        let entries = ImagesTxtReader::new(content).collect::<Vec<_>>();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0], ImagesTxtEntry::Comment("# header"));
        assert!(matches!(
            &entries[1],
            ImagesTxtEntry::Record { line_no: 2, points: Some(""), .. }
        ));
        assert!(matches!(
            &entries[2],
            ImagesTxtEntry::Record { line_no: 4, points: None, .. }
        ));
        assert_eq!(
            entries[3],
            ImagesTxtEntry::Unrecognized { line_no: 5, content: "garbage line" }
        );
        assert!(decode_images_txt(content).is_err());
    }

    #[test]
    fn test_metadata_line_parse() {
        assert!(ImageMetadataLine::parse("1 1 0 0 0 0 0 0 1 a.jpg").is_ok());
        // a points line with ten numeric fields is not metadata
        assert!(ImageMetadataLine::parse("1 2 3 4 5 6 7 8 9 10").is_err());
        assert!(ImageMetadataLine::parse("1 1 0 0 0 0 0 0 1").is_err());
        assert!(ImageMetadataLine::parse("x 1 0 0 0 0 0 0 1 a.jpg").is_err());
        assert!(is_points2d_line(""));
        assert!(is_points2d_line("1.5 2.5 -1"));
        assert!(!is_points2d_line("1.5 2.5"));
        assert!(!is_points2d_line("1 1 0 0 0 0 0 0 1 a.jpg"));
    }

    #[test]
    fn test_decode_points3d_txt() -> Result<(), ColmapError> {
        let content = "# 3D point list\n\n1 0.5 -1 2 255 128 0 0.25 3 7 4 8\n2 0 0 0 0 0 0 0\n";
        let points = decode_points3d_txt(content)?;
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].position, [0.5, -1.0, 2.0]);
        assert_eq!(points[0].color, [255, 128, 0]);
        assert_eq!(points[0].track, vec![(3, 7), (4, 8)]);
        assert!(points[1].track.is_empty());
        assert!(decode_points3d_txt("1 0 0 0 0 0 0 0 5").is_err());
        assert!(decode_points3d_txt("1 0 0 0 300 0 0 0").is_err());
        Ok(())
    }
}
