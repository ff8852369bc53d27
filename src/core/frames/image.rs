//! Frame Image Decoding
//!
//! Turns the encoded bytes fetched from a [`FrameSource`] into a
//! displayable image handle, and reads that handle back as a raw RGBA
//! pixel buffer — the handoff format the external tracking engine
//! consumes.
//!
//! [`FrameSource`]: super::FrameSource

use image::DynamicImage;

use super::FrameData;
use crate::core::{CoreError, CoreResult};

// =============================================================================
// Frame Image
// =============================================================================

/// Decoded frame image handle
///
/// Owns its pixel data; dropping the handle releases it. There is no
/// separate revoke step.
pub struct FrameImage {
    inner: DynamicImage,
}

impl FrameImage {
    /// Decodes an encoded frame payload (JPEG or PNG)
    pub fn decode(data: &FrameData) -> CoreResult<Self> {
        let inner = image::load_from_memory(&data.bytes).map_err(|e| {
            CoreError::FrameDecode(format!("frame {}: {}", data.frame_number, e))
        })?;
        Ok(Self { inner })
    }

    /// Image width in pixels
    pub fn width(&self) -> u32 {
        self.inner.width()
    }

    /// Image height in pixels
    pub fn height(&self) -> u32 {
        self.inner.height()
    }

    /// Reads the image back as a raw RGBA8 pixel buffer
    pub fn image_data(&self) -> ImageData {
        let rgba = self.inner.to_rgba8();
        ImageData {
            width: rgba.width(),
            height: rgba.height(),
            pixels: rgba.into_raw(),
        }
    }
}

impl std::fmt::Debug for FrameImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .finish()
    }
}

// =============================================================================
// Image Data
// =============================================================================

/// Raw RGBA8 pixel buffer, row-major, 4 bytes per pixel
#[derive(Clone, Debug)]
pub struct ImageData {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Pixel bytes, `width * height * 4` long
    pub pixels: Vec<u8>,
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    /// Encodes a solid-color RGBA image as PNG bytes
    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageFormat::Png,
            )
            .unwrap();
        bytes
    }

    #[test]
    fn test_decode_and_readback() {
        let data = FrameData {
            frame_number: 0,
            bytes: png_bytes(3, 2, [255, 0, 0, 255]),
        };

        let img = FrameImage::decode(&data).unwrap();
        assert_eq!(img.width(), 3);
        assert_eq!(img.height(), 2);

        let pixels = img.image_data();
        assert_eq!(pixels.width, 3);
        assert_eq!(pixels.height, 2);
        assert_eq!(pixels.pixels.len(), 3 * 2 * 4);
        assert_eq!(&pixels.pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let data = FrameData {
            frame_number: 9,
            bytes: vec![0xde, 0xad, 0xbe, 0xef],
        };

        let err = FrameImage::decode(&data).unwrap_err();
        assert!(matches!(err, CoreError::FrameDecode(_)));
        assert!(err.to_string().contains('9'));
    }
}
