//! Frame assembly by inter-frame silence
//!
//! RTU carries no delimiters: a pause longer than 3.5 character times ends a
//! frame and any arriving byte extends the current one. `FrameAssembler`
//! holds the buffering rules, `FrameReader` drives them from an async byte
//! source with a read timeout equal to the silence threshold.

use bytes::BytesMut;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;
use tracing::{trace, warn};

use crate::constants::{
    BITS_PER_CHAR, HIGH_SPEED_BAUD_THRESHOLD, HIGH_SPEED_FRAME_GAP_US, MAX_RTU_FRAME_SIZE,
};
use crate::frame::RawFrame;

/// Inter-frame silence threshold for a baud rate.
///
/// 3.5 character times of 11 bits each; above 19200 baud the fixed 1750 µs
/// recommended for RTU is used instead.
pub fn silence_threshold(baud_rate: u32) -> Duration {
    if baud_rate > HIGH_SPEED_BAUD_THRESHOLD {
        return Duration::from_micros(HIGH_SPEED_FRAME_GAP_US);
    }

    let char_time_us = BITS_PER_CHAR * 1_000_000 / u64::from(baud_rate.max(1));
    Duration::from_micros(char_time_us * 35 / 10)
}

/// Accumulation buffer for the frame currently on the wire
#[derive(Debug, Default)]
pub struct FrameAssembler {
    buffer: BytesMut,
}

impl FrameAssembler {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(MAX_RTU_FRAME_SIZE),
        }
    }

    /// Extend the current frame with freshly received bytes
    pub fn push(&mut self, data: &[u8]) {
        let before = self.buffer.len();
        self.buffer.extend_from_slice(data);

        if before <= MAX_RTU_FRAME_SIZE && self.buffer.len() > MAX_RTU_FRAME_SIZE {
            warn!(
                "Frame exceeds {} bytes without a silence gap (baud rate or wiring?)",
                MAX_RTU_FRAME_SIZE
            );
        }
    }

    /// Silence detected: close the current frame if it holds any bytes
    pub fn on_silence(&mut self) -> Option<RawFrame> {
        if self.buffer.is_empty() {
            return None;
        }
        Some(RawFrame::new(self.buffer.split().freeze()))
    }

    /// End of stream: flush whatever is buffered
    pub fn finish(&mut self) -> Option<RawFrame> {
        self.on_silence()
    }

    /// Bytes received for the frame in progress
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

/// Reads `RawFrame`s from a byte source using silence-gap framing
#[derive(Debug)]
pub struct FrameReader<R> {
    reader: R,
    assembler: FrameAssembler,
    silence: Duration,
    read_buf: [u8; MAX_RTU_FRAME_SIZE],
    eof: bool,
}

impl<R> FrameReader<R>
where
    R: AsyncRead + Unpin,
{
    pub fn new(reader: R, silence: Duration) -> Self {
        Self {
            reader,
            assembler: FrameAssembler::new(),
            silence,
            read_buf: [0u8; MAX_RTU_FRAME_SIZE],
            eof: false,
        }
    }

    /// Silence threshold in use
    pub fn silence(&self) -> Duration {
        self.silence
    }

    /// Wait for the next complete frame.
    ///
    /// Returns `Ok(None)` once the source reports end of stream (after
    /// flushing a partial frame). Cancel-safe: bytes already received stay
    /// buffered in the reader.
    pub async fn next_frame(&mut self) -> io::Result<Option<RawFrame>> {
        if self.eof {
            return Ok(None);
        }

        loop {
            match timeout(self.silence, self.reader.read(&mut self.read_buf)).await {
                Ok(Ok(0)) => {
                    trace!("Byte source closed with {} bytes buffered", self.assembler.pending());
                    self.eof = true;
                    return Ok(self.assembler.finish());
                },
                Ok(Ok(n)) => {
                    trace!(length = n, "Received bytes");
                    self.assembler.push(&self.read_buf[..n]);
                },
                Ok(Err(e)) if e.kind() == io::ErrorKind::Interrupted => continue,
                // Some serial drivers surface their own read timeout as an error
                Ok(Err(e)) if e.kind() == io::ErrorKind::TimedOut => {
                    if let Some(frame) = self.assembler.on_silence() {
                        return Ok(Some(frame));
                    }
                },
                Ok(Err(e)) => return Err(e),
                Err(_) => {
                    if let Some(frame) = self.assembler.on_silence() {
                        return Ok(Some(frame));
                    }
                },
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    const GAP: Duration = Duration::from_millis(4);
    const PAUSE: Duration = Duration::from_millis(50);

    #[test]
    fn test_silence_threshold_9600() {
        // 11 bits / 9600 baud = 1145 µs per char, x3.5
        assert_eq!(silence_threshold(9600), Duration::from_micros(4007));
    }

    #[test]
    fn test_silence_threshold_scales_with_baud() {
        assert!(silence_threshold(1200) > silence_threshold(9600));
        assert!(silence_threshold(9600) > silence_threshold(19200));
    }

    #[test]
    fn test_silence_threshold_high_speed_is_fixed() {
        assert_eq!(silence_threshold(38400), Duration::from_micros(1750));
        assert_eq!(silence_threshold(115200), Duration::from_micros(1750));
    }

    #[test]
    fn test_assembler_emits_on_silence() {
        let mut asm = FrameAssembler::new();
        assert!(asm.on_silence().is_none());

        asm.push(&[0x01, 0x03]);
        asm.push(&[0x00, 0x01]);
        assert_eq!(asm.pending(), 4);

        let frame = asm.on_silence().unwrap();
        assert_eq!(frame.as_bytes(), &[0x01, 0x03, 0x00, 0x01]);
        assert_eq!(asm.pending(), 0);
        assert!(asm.on_silence().is_none());
    }

    #[test]
    fn test_assembler_keeps_short_frames() {
        let mut asm = FrameAssembler::new();
        asm.push(&[0xFF]);
        assert_eq!(asm.finish().unwrap().as_bytes(), &[0xFF]);
    }

    #[test]
    fn test_assembler_oversize_frame_still_emitted() {
        let mut asm = FrameAssembler::new();
        asm.push(&[0xAA; MAX_RTU_FRAME_SIZE]);
        asm.push(&[0xBB; 10]);
        assert_eq!(asm.on_silence().unwrap().len(), MAX_RTU_FRAME_SIZE + 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_splits_on_gap() {
        let request = [0x01, 0x03, 0x00, 0x01, 0x00, 0x02, 0x95, 0xCB];
        let response = [0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x14, 0xDA, 0x3E];

        let mock = Builder::new()
            .read(&request)
            .wait(PAUSE)
            .read(&response)
            .build();
        let mut reader = FrameReader::new(mock, GAP);

        let first = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(first.as_bytes(), &request);

        let second = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(second.as_bytes(), &response);

        assert!(reader.next_frame().await.unwrap().is_none());
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_chunking_does_not_matter() {
        let request = [0x01, 0x03, 0x00, 0x01, 0x00, 0x02, 0x95, 0xCB];
        let response = [0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x14, 0xDA, 0x3E];

        let mock = Builder::new()
            .read(&request[..1])
            .read(&request[1..5])
            .read(&request[5..])
            .wait(PAUSE)
            .read(&response[..2])
            .read(&response[2..3])
            .read(&response[3..])
            .wait(PAUSE)
            .build();
        let mut reader = FrameReader::new(mock, GAP);

        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            frames.push(frame);
        }

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].as_bytes(), &request);
        assert_eq!(frames[1].as_bytes(), &response);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_short_pause_does_not_split() {
        let mock = Builder::new()
            .read(&[0x01, 0x03])
            .wait(Duration::from_millis(1))
            .read(&[0x00, 0x01])
            .wait(PAUSE)
            .build();
        let mut reader = FrameReader::new(mock, GAP);

        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[0x01, 0x03, 0x00, 0x01]);
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_idle_line_emits_nothing() {
        let mock = Builder::new().wait(PAUSE).read(&[0x07]).build();
        let mut reader = FrameReader::new(mock, GAP);

        // Several silence periods pass with an empty buffer before the byte
        let frame = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(frame.as_bytes(), &[0x07]);
        assert!(reader.next_frame().await.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_reader_propagates_io_error() {
        let mock = Builder::new()
            .read(&[0x01])
            .read_error(io::Error::new(io::ErrorKind::BrokenPipe, "port gone"))
            .build();
        let mut reader = FrameReader::new(mock, GAP);

        let err = reader.next_frame().await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
