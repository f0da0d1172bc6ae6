use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use slamcolmap_3d::pipeline::{frame_image_name, ConversionReport, SlamSequence};

use crate::{error::IoError, functional::write_frame_image};

/// Log a progress line every this many written frames.
const PROGRESS_EVERY: usize = 100;

/// File name of the conversion summary at the output root.
pub const REPORT_FILE: &str = "conversion_report.json";

/// The directories of a conversion output:
///
/// ```text
/// <root>/images/00000.jpg ...
/// <root>/sparse/0/{cameras,images,points3D}.{bin,txt}
/// <root>/conversion_report.json
/// ```
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    /// Describe the layout under `root` without touching the file system.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The output root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the frame images.
    pub fn images_dir(&self) -> PathBuf {
        self.root.join("images")
    }

    /// Directory holding the sparse model.
    pub fn sparse_dir(&self) -> PathBuf {
        self.root.join("sparse").join("0")
    }

    /// Path of the conversion summary.
    pub fn report_path(&self) -> PathBuf {
        self.root.join(REPORT_FILE)
    }

    /// Create the images and sparse directories.
    pub fn create(&self) -> Result<(), IoError> {
        std::fs::create_dir_all(self.images_dir())?;
        std::fs::create_dir_all(self.sparse_dir())?;
        Ok(())
    }

    /// Write every frame of the sequence as `images/%05d.<extension>`.
    ///
    /// Frames dropped from the reconstruction are written too, so image names
    /// always match the original frame index.
    pub fn write_frames(&self, sequence: &SlamSequence, extension: &str) -> Result<usize, IoError> {
        let images_dir = self.images_dir();
        let total = sequence.frames.len();
        for (index, frame) in sequence.frames.iter().enumerate() {
            write_frame_image(images_dir.join(frame_image_name(index, extension)), &frame.color)?;
            if (index + 1) % PROGRESS_EVERY == 0 {
                log::info!("wrote {}/{} images", index + 1, total);
            }
        }
        Ok(total)
    }

    /// Write the conversion summary as pretty JSON.
    pub fn write_report(&self, report: &ConversionReport) -> Result<(), IoError> {
        let writer = BufWriter::new(File::create(self.report_path())?);
        serde_json::to_writer_pretty(writer, report)?;
        Ok(())
    }
}
