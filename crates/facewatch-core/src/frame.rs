//! Frame type — RGB8 pixel buffer handed to the detector and attached to uploads.

use image::{ImageFormat, RgbImage};
use std::io::Cursor;
use std::time::Instant;

/// A captured RGB frame.
#[derive(Clone)]
pub struct Frame {
    /// Packed RGB8 pixel data (width * height * 3 bytes).
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
    pub sequence: u32,
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl Frame {
    /// Wrap a raw RGB8 buffer, checking that it covers `width * height` pixels.
    pub fn from_rgb(data: Vec<u8>, width: u32, height: u32, sequence: u32) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * 3;
        if data.len() != expected {
            return Err(FrameError::InvalidLength {
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            data,
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        })
    }

    /// Decode an encoded still (JPEG, PNG, ...) into an RGB frame.
    pub fn decode(bytes: &[u8], sequence: u32) -> Result<Self, FrameError> {
        let rgb = image::load_from_memory(bytes)?.to_rgb8();
        let (width, height) = rgb.dimensions();
        Ok(Self {
            data: rgb.into_raw(),
            width,
            height,
            timestamp: Instant::now(),
            sequence,
        })
    }

    /// Encode the frame as PNG.
    pub fn encode_png(&self) -> Result<Vec<u8>, FrameError> {
        let img = RgbImage::from_raw(self.width, self.height, self.data.clone()).ok_or(
            FrameError::InvalidLength {
                expected: self.width as usize * self.height as usize * 3,
                actual: self.data.len(),
            },
        )?;
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, ImageFormat::Png)?;
        Ok(out.into_inner())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("invalid RGB length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("image codec: {0}")]
    Codec(#[from] image::ImageError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_rgb_checks_length() {
        assert!(Frame::from_rgb(vec![0; 12], 2, 2, 0).is_ok());
        let err = Frame::from_rgb(vec![0; 11], 2, 2, 0).unwrap_err();
        assert!(matches!(
            err,
            FrameError::InvalidLength {
                expected: 12,
                actual: 11
            }
        ));
    }

    #[test]
    fn test_png_encode_decodes_back() {
        let data: Vec<u8> = (0..4 * 3 * 3).map(|i| (i * 7) as u8).collect();
        let frame = Frame::from_rgb(data.clone(), 4, 3, 9).unwrap();
        let png = frame.encode_png().unwrap();
        assert_eq!(&png[..4], b"\x89PNG");

        let decoded = Frame::decode(&png, 10).unwrap();
        assert_eq!((decoded.width, decoded.height), (4, 3));
        assert_eq!(decoded.sequence, 10);
        assert_eq!(decoded.data, data);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            Frame::decode(b"not an image", 0),
            Err(FrameError::Codec(_))
        ));
    }
}
