use std::fmt;
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::shared::frame::Frame;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StillImageFormat {
    #[default]
    Png,
    Jpeg,
}

impl StillImageFormat {
    pub fn mime_type(self) -> &'static str {
        match self {
            StillImageFormat::Png => "image/png",
            StillImageFormat::Jpeg => "image/jpeg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            StillImageFormat::Png => "png",
            StillImageFormat::Jpeg => "jpg",
        }
    }

    /// Guesses the format from a file extension (`jpg`/`jpeg`, else PNG).
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => StillImageFormat::Jpeg,
            _ => StillImageFormat::Png,
        }
    }
}

impl fmt::Display for StillImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// A single frame captured from the render surface.
#[derive(Clone, Debug)]
pub struct CapturedFrame {
    pub frame: Frame,
    /// Time since the playback session started.
    pub presentation_time: Duration,
}

/// An encoded still image.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: StillImageFormat,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:image/png;base64,...`, ready to drop into an `<img src>`.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type(), self.to_base64())
    }
}

/// Abstracts still-image encoding so capture doesn't depend on a specific
/// image library.
pub trait StillImageEncoder: Send + Sync {
    fn encode(&self, frame: &Frame) -> Result<EncodedImage, Box<dyn std::error::Error>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_base64_and_data_uri() {
        let image = EncodedImage {
            bytes: b"hello".to_vec(),
            format: StillImageFormat::Png,
            width: 1,
            height: 1,
        };
        assert_eq!(image.to_base64(), "aGVsbG8=");
        assert_eq!(image.data_uri(), "data:image/png;base64,aGVsbG8=");
    }

    #[rstest]
    #[case("jpg", StillImageFormat::Jpeg)]
    #[case("JPEG", StillImageFormat::Jpeg)]
    #[case("png", StillImageFormat::Png)]
    #[case("bmp", StillImageFormat::Png)]
    fn test_from_extension(#[case] ext: &str, #[case] expected: StillImageFormat) {
        assert_eq!(StillImageFormat::from_extension(ext), expected);
    }

    #[test]
    fn test_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&StillImageFormat::Jpeg).unwrap(),
            "\"jpeg\""
        );
    }
}
