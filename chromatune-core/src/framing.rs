//! Splits a stream of sample blocks into fixed-size analysis windows.
//!
//! Audio sources deliver blocks of arbitrary length; the detectors want
//! windows of exactly `window_size` samples. Consecutive windows do not
//! overlap.

use crate::error::{TunerError, TunerResult};
use crate::pitch::SampleWindow;

#[derive(Debug, Clone)]
pub struct FrameAccumulator {
    window_size: usize,
    sample_rate: u32,
    buffer: Vec<f32>,
}

impl FrameAccumulator {
    /// # Returns
    /// * `Err(TunerError)` - `window_size` is zero, which would buffer forever
    pub fn new(window_size: usize, sample_rate: u32) -> TunerResult<Self> {
        if window_size == 0 {
            return Err(TunerError::config("window_size", "must be at least 1 sample"));
        }
        Ok(Self {
            window_size,
            sample_rate,
            buffer: Vec::with_capacity(window_size * 2),
        })
    }

    /// Appends a block and returns every complete window it produced.
    pub fn push(&mut self, data: &[f32]) -> Vec<SampleWindow> {
        self.buffer.extend_from_slice(data);

        let mut windows = Vec::new();
        while self.buffer.len() >= self.window_size {
            let frame: Vec<f32> = self.buffer.drain(..self.window_size).collect();
            windows.push(SampleWindow::new(frame, self.sample_rate));
        }
        windows
    }

    /// Samples waiting for the next window.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_windows_once_enough_samples_arrive() {
        let mut framer = FrameAccumulator::new(4, 8000).unwrap();
        assert!(framer.push(&[0.1, 0.2, 0.3]).is_empty());
        assert_eq!(framer.pending(), 3);

        let windows = framer.push(&[0.4, 0.5, 0.6, 0.7, 0.8, 0.9]);
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].samples, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(windows[1].samples, vec![0.5, 0.6, 0.7, 0.8]);
        assert_eq!(windows[1].sample_rate, 8000);
        assert_eq!(framer.pending(), 1);
    }

    #[test]
    fn zero_window_size_is_rejected() {
        assert!(matches!(
            FrameAccumulator::new(0, 8000),
            Err(TunerError::InvalidConfig { field: "window_size", .. })
        ));
    }

    #[test]
    fn buffer_never_holds_a_full_window() {
        let mut framer = FrameAccumulator::new(3, 8000).unwrap();
        for _ in 0..10 {
            framer.push(&[0.5; 7]);
            assert!(framer.pending() < 3);
        }
    }
}
