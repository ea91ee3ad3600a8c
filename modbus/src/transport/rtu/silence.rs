use crate::codec::crc::detect_valid_frame;
use crate::data::MAX_DATA_SIZE;
use std::time::{Duration, Instant};

/// Splits a serial byte stream into RTU frames by line silence. Bytes that
/// arrive after a gap longer than the silence window start a new frame; a
/// frame is complete once its CRC matches.
#[derive(Debug)]
pub struct FrameAccumulator {
    buffer: Vec<u8>,
    last: Option<Instant>,
    silence: Duration,
}

/// 3.5 characters, approximated as 4000 / baud ms.
pub fn silence_for(baud: u32) -> Duration {
    Duration::from_micros(4_000_000 / u64::from(baud.max(1)))
}

impl FrameAccumulator {
    pub fn new(baud: u32) -> FrameAccumulator {
        FrameAccumulator::with_silence(silence_for(baud))
    }

    pub fn with_silence(silence: Duration) -> FrameAccumulator {
        FrameAccumulator {
            buffer: Vec::with_capacity(MAX_DATA_SIZE),
            last: None,
            silence,
        }
    }

    pub fn silence(&self) -> Duration {
        self.silence
    }

    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
        self.last = None;
    }

    /// Appends `bytes` received at `now`; returns a complete frame if there is one.
    pub fn push(&mut self, now: Instant, bytes: &[u8]) -> Option<Vec<u8>> {
        if let Some(last) = self.last {
            if now.saturating_duration_since(last) > self.silence {
                self.buffer.clear();
            }
        }
        self.last = Some(now);

        self.buffer.extend_from_slice(bytes);
        if self.buffer.len() > MAX_DATA_SIZE {
            self.buffer.clear();
            return None;
        }

        if detect_valid_frame(&self.buffer) {
            Some(std::mem::take(&mut self.buffer))
        } else {
            None
        }
    }
}
