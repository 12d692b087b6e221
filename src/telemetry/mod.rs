//! Sample buffering and the telemetry wire format.

pub mod frame;
pub mod ring_buffer;

pub use frame::{
    BUFFER_CAPACITY, DataHeader, DataItem, FRAME_LEN, SampleBuffer, TelemetryFramer, decode_frame,
};
pub use ring_buffer::{PushStatus, RingBuffer};
