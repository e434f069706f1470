pub mod decode;
pub mod fetch;

use std::sync::Arc;

/// JPEG-encoded raster ready to be embedded into a page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RasterImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Baseline JPEG bytes.
    pub jpeg: Arc<Vec<u8>>,
}

impl RasterImage {
    pub fn new(width: u32, height: u32, jpeg: Vec<u8>) -> Self {
        Self {
            width,
            height,
            jpeg: Arc::new(jpeg),
        }
    }
}
