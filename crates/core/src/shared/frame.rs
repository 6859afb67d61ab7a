use std::time::Duration;

/// A decoded video frame: contiguous RGB or RGBA bytes in row-major order.
///
/// Format conversion happens at I/O boundaries only; the domain layer
/// treats pixel data as opaque.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
    timestamp: Duration,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * (channels as usize),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            channels,
            index,
            timestamp: Duration::ZERO,
        }
    }

    /// Sets the media timestamp (position within the source).
    pub fn with_timestamp(mut self, timestamp: Duration) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn timestamp(&self) -> Duration {
        self.timestamp
    }

    /// True when every color sample is zero (alpha ignored).
    pub fn is_black(&self) -> bool {
        let channels = self.channels.max(1) as usize;
        let color = channels.min(3);
        self.data
            .chunks_exact(channels)
            .all(|px| px[..color].iter().all(|&v| v == 0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert_eq!(frame.timestamp(), Duration::ZERO);
    }

    #[test]
    fn test_with_timestamp() {
        let frame = Frame::new(vec![0u8; 3], 1, 1, 3, 0).with_timestamp(Duration::from_millis(40));
        assert_eq!(frame.timestamp(), Duration::from_millis(40));
    }

    #[test]
    #[should_panic(expected = "data length must equal width * height * channels")]
    fn test_mismatched_data_length_panics_in_debug() {
        let data = vec![0u8; 10]; // wrong size for 2x2x3
        Frame::new(data, 2, 2, 3, 0);
    }

    #[test]
    fn test_is_black() {
        assert!(Frame::new(vec![0u8; 12], 2, 2, 3, 0).is_black());
        let mut data = vec![0u8; 12];
        data[7] = 1;
        assert!(!Frame::new(data, 2, 2, 3, 0).is_black());
    }

    #[test]
    fn test_is_black_ignores_alpha() {
        let data = vec![0, 0, 0, 255, 0, 0, 0, 255];
        assert!(Frame::new(data, 2, 1, 4, 0).is_black());
    }
}
