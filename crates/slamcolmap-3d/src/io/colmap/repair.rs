use std::path::Path;

use super::{
    require_file, ColmapError, ImagesTxtEntry, ImagesTxtReader, CAMERAS_TXT, IMAGES_TXT,
    POINTS3D_TXT,
};
use crate::reconstruction::CANONICAL_CAMERA_ID;

/// Counters collected while repairing a text model.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct RepairReport {
    /// Camera lines written
    pub cameras: usize,
    /// Camera lines dropped because the canonical camera was already written
    pub cameras_dropped: usize,
    /// Image records written
    pub images: usize,
    /// Non-empty points lines that were discarded
    pub points_lines_discarded: usize,
    /// Metadata lines that had no points line after them
    pub points_lines_missing: usize,
    /// Lines that were neither comments, metadata nor points and were dropped
    pub lines_dropped: usize,
}

/// Normalize the content of a cameras.txt file.
///
/// Comments are kept and blank lines removed. The first camera line gets the
/// canonical camera id, later camera lines are dropped. Parameter fields are
/// copied verbatim.
pub fn repair_cameras_txt(content: &str, report: &mut RepairReport) -> String {
    let canonical = CANONICAL_CAMERA_ID.to_string();
    let mut out = String::with_capacity(content.len());
    for line in content.lines().map(str::trim) {
        if line.is_empty() {
            continue;
        }
        if line.starts_with('#') {
            out.push_str(line);
            out.push('\n');
            continue;
        }
        if report.cameras > 0 {
            log::warn!("dropping extra camera line: {line}");
            report.cameras_dropped += 1;
            continue;
        }
        let mut parts = line.split_whitespace().collect::<Vec<_>>();
        parts[0] = &canonical;
        out.push_str(&parts.join(" "));
        out.push('\n');
        report.cameras += 1;
    }
    out
}

/// Normalize the content of an images.txt file.
///
/// Every image record is written as its metadata line, with the camera id
/// field set to the canonical camera id, followed by an empty points line.
/// Pose fields and names are copied verbatim. Comments are kept and lines that
/// are not part of any record are dropped.
pub fn repair_images_txt(content: &str, report: &mut RepairReport) -> String {
    let canonical = CANONICAL_CAMERA_ID.to_string();
    let mut out = String::with_capacity(content.len());
    for entry in ImagesTxtReader::new(content) {
        match entry {
            ImagesTxtEntry::Comment(comment) => {
                out.push_str(comment);
                out.push('\n');
            }
            ImagesTxtEntry::Record { line_no, metadata, points } => {
                match points {
                    None => {
                        log::debug!(
                            "line {line_no}: image {} has no points line",
                            metadata.image_id
                        );
                        report.points_lines_missing += 1;
                    }
                    Some(points) if !points.is_empty() => report.points_lines_discarded += 1,
                    Some(_) => {}
                }
                let mut parts = metadata.raw.split_whitespace().collect::<Vec<_>>();
                parts[8] = &canonical;
                out.push_str(&parts.join(" "));
                out.push_str("\n\n");
                report.images += 1;
            }
            ImagesTxtEntry::Unrecognized { line_no, content } => {
                log::warn!("line {line_no}: dropping unrecognized line {content:?}");
                report.lines_dropped += 1;
            }
        }
    }
    out
}

/// Repair cameras.txt and images.txt from `src_dir` into `dst_dir`.
///
/// `dst_dir` may equal `src_dir` for an in-place repair. points3D.txt is copied
/// unchanged when present. Both input files are required.
pub fn repair_sparse_text(
    src_dir: impl AsRef<Path>,
    dst_dir: impl AsRef<Path>,
) -> Result<RepairReport, ColmapError> {
    let (src_dir, dst_dir) = (src_dir.as_ref(), dst_dir.as_ref());
    let cameras_path = src_dir.join(CAMERAS_TXT);
    let images_path = src_dir.join(IMAGES_TXT);
    require_file(&cameras_path)?;
    require_file(&images_path)?;

    let cameras = std::fs::read_to_string(&cameras_path)?;
    let images = std::fs::read_to_string(&images_path)?;

    let mut report = RepairReport::default();
    let cameras = repair_cameras_txt(&cameras, &mut report);
    let images = repair_images_txt(&images, &mut report);

    std::fs::create_dir_all(dst_dir)?;
    std::fs::write(dst_dir.join(CAMERAS_TXT), cameras)?;
    std::fs::write(dst_dir.join(IMAGES_TXT), images)?;

    let points_src = src_dir.join(POINTS3D_TXT);
    let points_dst = dst_dir.join(POINTS3D_TXT);
    if points_src.is_file() && points_src != points_dst {
        std::fs::copy(&points_src, &points_dst)?;
    }

    log::info!(
        "repaired {} camera(s) and {} image(s) into {}",
        report.cameras,
        report.images,
        dst_dir.display()
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMAGES: &str = "# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
1 0.7071067811865476 0.7071067811865476 0 0 1.5 -2 3 4 00000.jpg
100.5 200.25 7 300 400 -1
2 1 0 0 0 0 0 0 7 00001.jpg
3 1 0 0 0 0.125 0 0 2 00002.jpg


not an image line
";

    fn repair_images(content: &str) -> (String, RepairReport) {
        let mut report = RepairReport::default();
        let out = repair_images_txt(content, &mut report);
        (out, report)
    }

    #[test]
    fn test_repair_images_txt() {
        let (out, report) = repair_images(IMAGES);
        let expected = "# Image list with two lines of data per image:
#   IMAGE_ID, QW, QX, QY, QZ, TX, TY, TZ, CAMERA_ID, NAME
1 0.7071067811865476 0.7071067811865476 0 0 1.5 -2 3 1 00000.jpg

2 1 0 0 0 0 0 0 1 00001.jpg

3 1 0 0 0 0.125 0 0 1 00002.jpg

";
        assert_eq!(out, expected);
        assert_eq!(report.images, 3);
        assert_eq!(report.points_lines_discarded, 1);
        assert_eq!(report.points_lines_missing, 1);
        assert_eq!(report.lines_dropped, 1);
    }

    #[test]
    fn test_repair_images_txt_idempotent() {
        let (once, _) = repair_images(IMAGES);
        let (twice, report) = repair_images(&once);
        assert_eq!(once, twice);
        assert_eq!(report.points_lines_missing, 0);
        assert_eq!(report.lines_dropped, 0);

        // a comment between a record and its points line moves in front of it
        let (once, _) = repair_images("1 1 0 0 0 0 0 0 3 a.jpg\n# note\n1 2 -1\n");
        assert_eq!(once, "# note\n1 1 0 0 0 0 0 0 1 a.jpg\n\n");
        assert_eq!(repair_images(&once).0, once);
    }

    #[test]
    fn test_repair_cameras_txt() {
        let mut report = RepairReport::default();
        let content = "# Camera list\n\n\
            5 PINHOLE 640 480 500 500.5 320 240\n\
            6 PINHOLE 1 1 1 1 1 1\n";
        let once = repair_cameras_txt(content, &mut report);
        assert_eq!(once, "# Camera list\n1 PINHOLE 640 480 500 500.5 320 240\n");
        assert_eq!(report.cameras, 1);
        assert_eq!(report.cameras_dropped, 1);

        let mut report = RepairReport::default();
        assert_eq!(repair_cameras_txt(&once, &mut report), once);
    }

    #[test]
    fn test_repair_sparse_text_missing_files() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(CAMERAS_TXT), "1 PINHOLE 1 1 1 1 1 1\n").unwrap();
        assert!(matches!(
            repair_sparse_text(tmp.path(), tmp.path()),
            Err(ColmapError::MissingFile(path)) if path.ends_with(IMAGES_TXT)
        ));
    }
}
