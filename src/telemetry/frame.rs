//! Telemetry wire format and framer.
//!
//! One UDP datagram per drained buffer, fixed size per sensor group:
//!
//! ```text
//! ┌──────────────────────────────┬───────────────────────────────────────┬─────────┐
//! │ Header (4B)                  │ DataItem × n (16B each)               │ zero    │
//! │ sensor_id u8 │ pad │ len u16 │ reading u16 │ pad ×6 │ timestamp u64  │ padding │
//! └──────────────────────────────┴───────────────────────────────────────┴─────────┘
//! ```
//!
//! All integers little-endian.  Padding follows C natural alignment so a
//! ground-station `struct` can overlay the datagram directly.  `len` is
//! the payload byte count (`n * 16`), not including header or padding.

use heapless::Vec;
use log::{debug, warn};

use super::ring_buffer::RingBuffer;
use crate::app::ports::DatagramSink;
use crate::error::FrameError;

/// Serialized header size.
pub const HEADER_LEN: usize = 4;
/// Serialized item size.
pub const ITEM_LEN: usize = 16;
/// Items one sampling buffer holds before it is drained.
pub const BUFFER_CAPACITY: usize = 16;
/// Physical slots backing a sampling buffer.
pub const BUFFER_SLOTS: usize = BUFFER_CAPACITY + 1;
/// Size of a full telemetry datagram.
pub const FRAME_LEN: usize = HEADER_LEN + BUFFER_CAPACITY * ITEM_LEN;
/// Largest frame whose payload length still fits the `u16` header field.
pub const MAX_FRAME_LEN: usize = HEADER_LEN + (u16::MAX as usize / ITEM_LEN) * ITEM_LEN;

/// One timestamped raw reading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataItem {
    pub reading: u16,
    /// Nanoseconds since process start.
    pub timestamp: u64,
}

/// Prefix of every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    pub sensor_id: u8,
    /// Payload length in bytes.
    pub length: u16,
}

/// The per-sensor sampling buffer.
pub type SampleBuffer = RingBuffer<DataItem, BUFFER_SLOTS>;

/// A complete frame ready for the datagram sink.
pub type FrameBuf = Vec<u8, FRAME_LEN>;

impl DataHeader {
    pub fn write(&self, out: &mut [u8]) {
        out[0] = self.sensor_id;
        out[1] = 0;
        out[2..4].copy_from_slice(&self.length.to_le_bytes());
    }

    pub fn read(bytes: &[u8]) -> Result<Self, FrameError> {
        if bytes.len() < HEADER_LEN {
            return Err(FrameError::Truncated {
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }
        Ok(Self {
            sensor_id: bytes[0],
            length: u16::from_le_bytes([bytes[2], bytes[3]]),
        })
    }
}

impl DataItem {
    pub fn write(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.reading.to_le_bytes());
        out[2..8].fill(0);
        out[8..16].copy_from_slice(&self.timestamp.to_le_bytes());
    }

    pub fn read(bytes: &[u8]) -> Self {
        let mut ts = [0u8; 8];
        ts.copy_from_slice(&bytes[8..16]);
        Self {
            reading: u16::from_le_bytes([bytes[0], bytes[1]]),
            timestamp: u64::from_le_bytes(ts),
        }
    }
}

impl<const SLOTS: usize> RingBuffer<DataItem, SLOTS> {
    /// Pop items into `buf` after a header, stopping when the buffer is
    /// empty or the next item would take the frame past `max_bytes`
    /// (also capped at `buf.len()` and [`MAX_FRAME_LEN`]).  Writes the
    /// header last with the actual payload length.  Returns header +
    /// payload bytes written.
    pub fn drain_into(
        &mut self,
        sensor_id: u8,
        buf: &mut [u8],
        max_bytes: usize,
    ) -> Result<usize, FrameError> {
        let limit = max_bytes.min(buf.len()).min(MAX_FRAME_LEN);
        if limit < HEADER_LEN {
            return Err(FrameError::BufferTooSmall(limit));
        }

        let mut offset = HEADER_LEN;
        while offset + ITEM_LEN <= limit {
            let Some(item) = self.pop() else { break };
            item.write(&mut buf[offset..offset + ITEM_LEN]);
            offset += ITEM_LEN;
        }

        let payload = offset - HEADER_LEN;
        DataHeader {
            sensor_id,
            length: payload as u16,
        }
        .write(&mut buf[..HEADER_LEN]);
        Ok(offset)
    }
}

/// Serialize `header` and `items` into `out`.  `header.length` is
/// recomputed from `items`.  Returns bytes written.
pub fn encode_frame(
    header: DataHeader,
    items: &[DataItem],
    out: &mut [u8],
) -> Result<usize, FrameError> {
    let total = HEADER_LEN + items.len() * ITEM_LEN;
    if total > out.len() || items.len() * ITEM_LEN > usize::from(u16::MAX) {
        return Err(FrameError::BufferTooSmall(out.len()));
    }
    DataHeader {
        sensor_id: header.sensor_id,
        length: (items.len() * ITEM_LEN) as u16,
    }
    .write(&mut out[..HEADER_LEN]);
    for (item, chunk) in items
        .iter()
        .zip(out[HEADER_LEN..total].chunks_exact_mut(ITEM_LEN))
    {
        item.write(chunk);
    }
    Ok(total)
}

/// Parse a datagram back into header and items.  Padding after the
/// declared payload is ignored.
pub fn decode_frame(bytes: &[u8]) -> Result<(DataHeader, std::vec::Vec<DataItem>), FrameError> {
    let header = DataHeader::read(bytes)?;
    let len = usize::from(header.length);
    if len % ITEM_LEN != 0 {
        return Err(FrameError::Misaligned(header.length));
    }
    let end = HEADER_LEN + len;
    if bytes.len() < end {
        return Err(FrameError::Truncated {
            needed: end,
            available: bytes.len(),
        });
    }
    let items = bytes[HEADER_LEN..end]
        .chunks_exact(ITEM_LEN)
        .map(DataItem::read)
        .collect();
    Ok((header, items))
}

/// Builds fixed-size frames from full buffers and hands them to the sink.
#[derive(Debug, Clone, Copy)]
pub struct TelemetryFramer {
    frame_len: usize,
}

impl Default for TelemetryFramer {
    fn default() -> Self {
        Self::new(FRAME_LEN)
    }
}

impl TelemetryFramer {
    /// `frame_len` is capped at [`FRAME_LEN`] and floored at one header.
    pub fn new(frame_len: usize) -> Self {
        Self {
            frame_len: frame_len.clamp(HEADER_LEN, FRAME_LEN),
        }
    }

    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Drain `buffer` into one zero-padded frame of `frame_len` bytes.
    pub fn frame(&self, sensor_id: u8, buffer: &mut SampleBuffer) -> FrameBuf {
        let mut frame = FrameBuf::new();
        // frame_len <= FRAME_LEN == capacity.
        let _ = frame.resize(self.frame_len, 0);
        // frame_len >= HEADER_LEN, so this cannot fail.
        let _ = buffer.drain_into(sensor_id, &mut frame, self.frame_len);
        frame
    }

    /// Send one frame.  A failure is logged and the frame dropped; stale
    /// samples are never retried.  Returns whether the frame went out.
    pub fn transmit(&self, sink: &impl DatagramSink, label: &str, frame: &[u8]) -> bool {
        match sink.send(frame) {
            Ok(()) => {
                debug!(target: "telemetry", "{label}: sent {} bytes", frame.len());
                true
            }
            Err(e) => {
                warn!(target: "telemetry", "{label}: frame dropped: {e}");
                false
            }
        }
    }
}
