use std::io::Cursor;

use image::{ImageFormat, Rgba, RgbaImage};

use crate::{CoreError, CoreResult};

/// Owned RGBA8 pixel buffer passed between pipeline stages.
///
/// Every stage consumes its input and hands back a new value, so a buffer
/// only ever has one writer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapturedImage {
    pixels: RgbaImage,
}

impl CapturedImage {
    /// Transparent image of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
        }
    }

    pub fn filled(width: u32, height: u32, color: [u8; 4]) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba(color)),
        }
    }

    pub fn from_rgba(width: u32, height: u32, raw: Vec<u8>) -> CoreResult<Self> {
        let len = raw.len();
        let expected = u64::from(width) * u64::from(height) * 4;
        if len as u64 != expected {
            return Err(CoreError::InvalidImage { width, height, len });
        }
        RgbaImage::from_raw(width, height, raw)
            .map(|pixels| Self { pixels })
            .ok_or(CoreError::InvalidImage { width, height, len })
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn as_rgba_mut(&mut self) -> &mut RgbaImage {
        &mut self.pixels
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.pixels
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        self.pixels.get_pixel(x, y).0
    }

    /// Lossless PNG encoding.
    pub fn to_png(&self) -> CoreResult<Vec<u8>> {
        let mut buf = Vec::new();
        self.pixels
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .map_err(|err| CoreError::Codec(format!("failed to encode png: {err}")))?;
        Ok(buf)
    }

    pub fn from_png(bytes: &[u8]) -> CoreResult<Self> {
        let decoded = image::load_from_memory_with_format(bytes, ImageFormat::Png)
            .map_err(|err| CoreError::Codec(format!("failed to decode png: {err}")))?;
        Ok(Self {
            pixels: decoded.to_rgba8(),
        })
    }
}

impl From<RgbaImage> for CapturedImage {
    fn from(pixels: RgbaImage) -> Self {
        Self { pixels }
    }
}
