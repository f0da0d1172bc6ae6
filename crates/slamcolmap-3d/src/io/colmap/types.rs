use std::path::Path;

/// Represents a Colmap camera model id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraModelId {
    /// Simple pinhole camera model
    SimplePinhole = 0,
    /// Pinhole camera model
    Pinhole = 1,
    /// Simplified radial camera model
    SimpleRadial = 2,
    /// Radial camera model
    Radial = 3,
    /// OpenCV camera model
    OpenCV = 4,
    /// OpenCV fisheye camera model
    OpenCVFisheye = 5,
    /// Full OpenCV camera model
    FullOpenCV = 6,
    /// Field of view camera model
    Fov = 7,
    /// Simple radial fisheye camera model
    SimpleRadialFisheye = 8,
    /// Radial fisheye camera model
    RadialFisheye = 9,
    /// Thin prism fisheye camera model
    ThinPrismFisheye = 10,
}

impl CameraModelId {
    const ALL: [CameraModelId; 11] = [
        Self::SimplePinhole,
        Self::Pinhole,
        Self::SimpleRadial,
        Self::Radial,
        Self::OpenCV,
        Self::OpenCVFisheye,
        Self::FullOpenCV,
        Self::Fov,
        Self::SimpleRadialFisheye,
        Self::RadialFisheye,
        Self::ThinPrismFisheye,
    ];

    /// The name used in cameras.txt.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SimplePinhole => "SIMPLE_PINHOLE",
            Self::Pinhole => "PINHOLE",
            Self::SimpleRadial => "SIMPLE_RADIAL",
            Self::Radial => "RADIAL",
            Self::OpenCV => "OPENCV",
            Self::OpenCVFisheye => "OPENCV_FISHEYE",
            Self::FullOpenCV => "FULL_OPENCV",
            Self::Fov => "FOV",
            Self::SimpleRadialFisheye => "SIMPLE_RADIAL_FISHEYE",
            Self::RadialFisheye => "RADIAL_FISHEYE",
            Self::ThinPrismFisheye => "THIN_PRISM_FISHEYE",
        }
    }

    /// Parse a model name as written in cameras.txt.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.name() == name)
    }

    /// Map the integer id stored in cameras.bin.
    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|model| *model as i32 == id)
    }

    /// Number of parameters of the model.
    pub fn num_params(&self) -> usize {
        match self {
            Self::SimplePinhole => 3,
            Self::Pinhole => 4,
            Self::SimpleRadial => 4,
            Self::Radial => 5,
            Self::OpenCV => 8,
            Self::OpenCVFisheye => 8,
            Self::FullOpenCV => 12,
            Self::Fov => 5,
            Self::SimpleRadialFisheye => 4,
            Self::RadialFisheye => 5,
            Self::ThinPrismFisheye => 12,
        }
    }
}

/// On-disk encoding of a sparse model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SparseFormat {
    /// cameras.txt, images.txt, points3D.txt
    Text,
    /// cameras.bin, images.bin, points3D.bin
    #[default]
    Binary,
}

impl SparseFormat {
    /// File names of the cameras, images and points files.
    pub fn file_names(&self) -> [&'static str; 3] {
        match self {
            Self::Text => [CAMERAS_TXT, IMAGES_TXT, POINTS3D_TXT],
            Self::Binary => [CAMERAS_BIN, IMAGES_BIN, POINTS3D_BIN],
        }
    }

    /// The other format.
    pub fn other(&self) -> Self {
        match self {
            Self::Text => Self::Binary,
            Self::Binary => Self::Text,
        }
    }

    /// Detect the format of a sparse directory, preferring binary when both exist.
    pub fn detect(dir: impl AsRef<Path>) -> Option<Self> {
        let dir = dir.as_ref();
        [Self::Binary, Self::Text]
            .into_iter()
            .find(|format| dir.join(format.file_names()[1]).is_file())
    }
}

impl std::str::FromStr for SparseFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "binary" | "bin" => Ok(Self::Binary),
            _ => Err(format!("unknown sparse format {s:?}, expected text or binary")),
        }
    }
}

/// cameras.txt file name
pub const CAMERAS_TXT: &str = "cameras.txt";
/// images.txt file name
pub const IMAGES_TXT: &str = "images.txt";
/// points3D.txt file name
pub const POINTS3D_TXT: &str = "points3D.txt";
/// cameras.bin file name
pub const CAMERAS_BIN: &str = "cameras.bin";
/// images.bin file name
pub const IMAGES_BIN: &str = "images.bin";
/// points3D.bin file name
pub const POINTS3D_BIN: &str = "points3D.bin";
