//! Capture collaborator surface.
//!
//! A [`CaptureBackend`] answers whether recording is possible at all and
//! constructs [`Recorder`]s. A recorder reports what happens asynchronously
//! as [`CaptureEvent`]s on the channel it was created with. Every `stop`
//! is answered by exactly one `DataAvailable` or `FlushFailed`.

pub mod cpal_backend;
pub mod encoder;

use anyhow::Result;
use tokio::sync::mpsc;

use crate::config::RecorderConfig;

pub use cpal_backend::CpalBackend;
pub use encoder::Encoder;

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// The input stream is open and capture may start.
    StreamReady,
    /// Capture stopped and the encoded payload is complete.
    DataAvailable(Vec<u8>),
    /// The device or stream failed. Capture may still produce a payload.
    StreamError(String),
    /// Capture stopped but no payload could be produced.
    FlushFailed(String),
}

pub type EventSender = mpsc::UnboundedSender<CaptureEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<CaptureEvent>;

#[derive(Debug, Clone)]
pub struct RecorderOptions {
    pub encoder: Encoder,
    pub sample_rate: u32,
    pub channels: u16,
    /// Keep the input stream open after `stop` so later attempts reuse it.
    pub leave_stream_open: bool,
}

impl RecorderOptions {
    pub fn from_config(config: &RecorderConfig) -> Result<Self> {
        Ok(Self {
            encoder: Encoder::from_name(&config.encoder)?,
            sample_rate: config.sample_rate,
            channels: config.channels,
            leave_stream_open: config.leave_stream_open,
        })
    }
}

impl Default for RecorderOptions {
    fn default() -> Self {
        Self {
            encoder: Encoder::Wav,
            sample_rate: 48_000,
            channels: 1,
            leave_stream_open: true,
        }
    }
}

pub trait CaptureBackend: Send + Sync {
    /// Whether this runtime can record audio at all.
    fn is_recording_supported(&self) -> bool;

    /// Builds a recorder that reports on `events`. Does not touch the device.
    fn create(&self, options: &RecorderOptions, events: EventSender) -> Result<Box<dyn Recorder>>;
}

pub trait Recorder: Send {
    /// Requests the input stream. Outcome arrives as `StreamReady` or `StreamError`.
    fn init_stream(&mut self) -> Result<()>;

    fn start(&mut self) -> Result<()>;

    /// Stops capture. The payload arrives later as `DataAvailable`.
    fn stop(&mut self) -> Result<()>;

    /// Stops capture and discards what was recorded. Emits nothing.
    fn abort(&mut self) -> Result<()>;
}
