use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};

use crate::capture::domain::still_image_encoder::{EncodedImage, StillImageEncoder, StillImageFormat};
use crate::shared::constants::DEFAULT_JPEG_QUALITY;
use crate::shared::frame::Frame;

/// Encodes frames to PNG or JPEG in memory using the `image` crate.
pub struct ImageCrateEncoder {
    format: StillImageFormat,
    jpeg_quality: u8,
}

impl ImageCrateEncoder {
    pub fn new(format: StillImageFormat, jpeg_quality: u8) -> Self {
        Self {
            format,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub fn png() -> Self {
        Self::new(StillImageFormat::Png, DEFAULT_JPEG_QUALITY)
    }

    pub fn format(&self) -> StillImageFormat {
        self.format
    }
}

impl Default for ImageCrateEncoder {
    fn default() -> Self {
        Self::png()
    }
}

fn color_type(channels: u8) -> Result<ExtendedColorType, Box<dyn std::error::Error>> {
    match channels {
        3 => Ok(ExtendedColorType::Rgb8),
        4 => Ok(ExtendedColorType::Rgba8),
        n => Err(format!("unsupported channel count {n}").into()),
    }
}

/// JPEG has no alpha channel.
fn strip_alpha(frame: &Frame) -> Vec<u8> {
    frame
        .data()
        .chunks_exact(4)
        .flat_map(|px| [px[0], px[1], px[2]])
        .collect()
}

impl StillImageEncoder for ImageCrateEncoder {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Err("cannot encode an empty frame".into());
        }
        let color = color_type(frame.channels())?;

        let mut bytes = Vec::new();
        match self.format {
            StillImageFormat::Png => {
                PngEncoder::new(&mut bytes).write_image(
                    frame.data(),
                    frame.width(),
                    frame.height(),
                    color,
                )?;
            }
            StillImageFormat::Jpeg => {
                let rgb;
                let data = if frame.channels() == 4 {
                    rgb = strip_alpha(frame);
                    rgb.as_slice()
                } else {
                    frame.data()
                };
                JpegEncoder::new_with_quality(&mut bytes, self.jpeg_quality).write_image(
                    data,
                    frame.width(),
                    frame.height(),
                    ExtendedColorType::Rgb8,
                )?;
            }
        }

        Ok(EncodedImage {
            bytes,
            format: self.format,
            width: frame.width(),
            height: frame.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_frame(width: u32, height: u32, channels: u8, value: u8) -> Frame {
        let data = vec![value; (width * height * channels as u32) as usize];
        Frame::new(data, width, height, channels, 0)
    }

    #[test]
    fn test_png_roundtrip_preserves_pixels() {
        let mut frame = make_frame(8, 6, 3, 0);
        let mut data = frame.data().to_vec();
        data[0] = 200;
        frame = Frame::new(data, 8, 6, 3, 0);

        let image = ImageCrateEncoder::png().encode(&frame).unwrap();
        assert_eq!(image.format, StillImageFormat::Png);
        assert_eq!((image.width, image.height), (8, 6));

        let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (8, 6));
        assert_eq!(decoded.as_raw(), frame.data());
    }

    #[test]
    fn test_png_keeps_alpha() {
        let frame = make_frame(4, 4, 4, 77);
        let image = ImageCrateEncoder::png().encode(&frame).unwrap();
        let decoded = image::load_from_memory(&image.bytes).unwrap();
        assert!(decoded.color().has_alpha());
    }

    #[test]
    fn test_jpeg_output_decodes() {
        let frame = make_frame(16, 16, 4, 128);
        let encoder = ImageCrateEncoder::new(StillImageFormat::Jpeg, 80);
        let image = encoder.encode(&frame).unwrap();
        assert_eq!(image.mime_type(), "image/jpeg");
        let decoded = image::load_from_memory(&image.bytes).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (16, 16));
        let px = decoded.get_pixel(8, 8);
        assert!((px[0] as i32 - 128).abs() < 10);
    }

    #[test]
    fn test_rejects_unsupported_channels() {
        let frame = make_frame(2, 2, 1, 0);
        assert!(ImageCrateEncoder::png().encode(&frame).is_err());
    }
}
