/// Error types for the RGB-D module.
#[derive(Debug, thiserror::Error)]
pub enum RgbdError {
    /// The pixel buffer length does not match the image dimensions
    #[error("Buffer of length {len} does not match image size {width}x{height}")]
    InvalidBufferLength {
        /// Buffer length
        len: usize,
        /// Image width
        width: usize,
        /// Image height
        height: usize,
    },

    /// The color and depth images have different dimensions
    #[error("Color image {0:?} and depth map {1:?} differ in size")]
    SizeMismatch((usize, usize), (usize, usize)),
}

/// An 8-bit RGB image stored row-major.
#[derive(Debug, Clone)]
pub struct ColorImage {
    width: usize,
    height: usize,
    pixels: Vec<[u8; 3]>,
}

impl ColorImage {
    /// Create a color image from its row-major pixels.
    pub fn new(width: usize, height: usize, pixels: Vec<[u8; 3]>) -> Result<Self, RgbdError> {
        if pixels.len() != width * height {
            return Err(RgbdError::InvalidBufferLength {
                len: pixels.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Create a color image from interleaved `rgbrgb...` bytes.
    pub fn from_interleaved(width: usize, height: usize, data: &[u8]) -> Result<Self, RgbdError> {
        if data.len() != width * height * 3 {
            return Err(RgbdError::InvalidBufferLength {
                len: data.len(),
                width,
                height,
            });
        }
        let pixels = data
            .chunks_exact(3)
            .map(|c| [c[0], c[1], c[2]])
            .collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixels.
    pub fn pixels(&self) -> &[[u8; 3]] {
        &self.pixels
    }

    /// The pixels as a contiguous interleaved byte slice.
    pub fn as_bytes(&self) -> &[u8] {
        self.pixels.as_flattened()
    }

    /// Get the color value at a specific pixel.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> [u8; 3] {
        self.pixels[y * self.width + x]
    }
}

/// A single channel metric depth map stored row-major.
#[derive(Debug, Clone)]
pub struct DepthMap {
    width: usize,
    height: usize,
    values: Vec<f64>,
}

impl DepthMap {
    /// Create a depth map from its row-major values.
    pub fn new(width: usize, height: usize, values: Vec<f64>) -> Result<Self, RgbdError> {
        if values.len() != width * height {
            return Err(RgbdError::InvalidBufferLength {
                len: values.len(),
                width,
                height,
            });
        }
        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// Create a depth map with the same depth everywhere.
    pub fn from_constant(width: usize, height: usize, depth: f64) -> Self {
        Self {
            width,
            height,
            values: vec![depth; width * height],
        }
    }

    /// Depth map width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Depth map height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major depth values.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Get the depth value at a specific pixel.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f64 {
        self.values[y * self.width + x]
    }
}

/// A borrowed color image paired with a depth map of the same resolution.
#[derive(Debug, Clone, Copy)]
pub struct RgbdImage<'a> {
    color: &'a ColorImage,
    depth: &'a DepthMap,
}

impl<'a> RgbdImage<'a> {
    /// Pair a color image with its depth map.
    pub fn new(color: &'a ColorImage, depth: &'a DepthMap) -> Result<Self, RgbdError> {
        if color.width() != depth.width() || color.height() != depth.height() {
            return Err(RgbdError::SizeMismatch(
                (color.width(), color.height()),
                (depth.width(), depth.height()),
            ));
        }
        Ok(Self { color, depth })
    }

    /// Returns the dimensions of the image (width, height).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.color.width(), self.color.height())
    }

    /// Get the depth value at a specific pixel.
    #[inline]
    pub fn get_depth(&self, x: usize, y: usize) -> f64 {
        self.depth.get(x, y)
    }

    /// Get the color value at a specific pixel.
    #[inline]
    pub fn get_color(&self, x: usize, y: usize) -> [u8; 3] {
        self.color.get(x, y)
    }
}
