//! Shared capture stream registry.
//!
//! The input device is acquired at most once per process and reused by
//! every later attempt without asking for permission again. A failed
//! acquisition is not remembered: the next call starts over.
//!
//! Once the stream is ready a forwarding task watches its events. Stream
//! errors go to the banner as soon as they happen; they do not abort the
//! capture in progress. Payloads are queued for whoever stopped capture.

use anyhow::{anyhow, Context, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::banner::{present_stream_error, ErrorPresenter};
use crate::capture::{CaptureBackend, CaptureEvent, EventReceiver, Recorder, RecorderOptions};
use crate::config::MessagesConfig;
use crate::error::MicCheckError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamPhase {
    Uninitialized,
    Pending,
    Ready,
    Errored,
}

impl StreamPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamPhase::Uninitialized => "uninitialized",
            StreamPhase::Pending => "pending",
            StreamPhase::Ready => "ready",
            StreamPhase::Errored => "errored",
        }
    }
}

/// Outcome of one `stop`: the encoded payload or why there is none.
type Flush = std::result::Result<Vec<u8>, String>;

/// An open capture stream together with the payloads it has flushed.
///
/// Each `stop` queues exactly one flush. Whoever called `stop` should take
/// it with `next_payload` before releasing the stream lock, so a payload is
/// never read by a later attempt.
pub struct DeviceStream {
    recorder: Box<dyn Recorder>,
    flushes: mpsc::UnboundedReceiver<Flush>,
}

pub type StreamHandle = Arc<Mutex<DeviceStream>>;

impl DeviceStream {
    pub fn start(&mut self) -> Result<()> {
        self.recorder.start().context("Failed to start capture")
    }

    pub fn stop(&mut self) -> Result<()> {
        self.recorder.stop().context("Failed to stop capture")
    }

    /// Stops capture without producing a payload.
    pub fn abort(&mut self) -> Result<()> {
        self.recorder.abort().context("Failed to abort capture")
    }

    /// Waits for the encoded payload of the capture that was just stopped.
    pub async fn next_payload(&mut self) -> Result<Vec<u8>> {
        match self.flushes.recv().await {
            Some(Ok(payload)) => Ok(payload),
            Some(Err(message)) => Err(anyhow!(message)),
            None => Err(anyhow!("Capture stream closed")),
        }
    }
}

/// Routes capture events of a ready stream until the recorder goes away.
async fn forward_events(
    mut events: EventReceiver,
    flushes: mpsc::UnboundedSender<Flush>,
    presenter: Arc<dyn ErrorPresenter>,
    messages: MessagesConfig,
) {
    while let Some(event) = events.recv().await {
        let flush = match event {
            CaptureEvent::DataAvailable(payload) => Ok(payload),
            CaptureEvent::FlushFailed(message) => Err(message),
            CaptureEvent::StreamError(message) => {
                warn!("Recorder stream error: {}", message);
                present_stream_error(presenter.as_ref(), &messages, &message);
                continue;
            }
            CaptureEvent::StreamReady => {
                debug!("Stream reported ready again");
                continue;
            }
        };
        if flushes.send(flush).is_err() {
            break;
        }
    }
    debug!("Capture event forwarding stopped");
}

pub struct StreamRegistry {
    backend: Arc<dyn CaptureBackend>,
    options: RecorderOptions,
    presenter: Arc<dyn ErrorPresenter>,
    messages: MessagesConfig,
    stream: Mutex<Option<StreamHandle>>,
    phase: StdMutex<StreamPhase>,
    acquisitions: AtomicUsize,
}

impl StreamRegistry {
    pub fn new(
        backend: Arc<dyn CaptureBackend>,
        options: RecorderOptions,
        presenter: Arc<dyn ErrorPresenter>,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            backend,
            options,
            presenter,
            messages,
            stream: Mutex::new(None),
            phase: StdMutex::new(StreamPhase::Uninitialized),
            acquisitions: AtomicUsize::new(0),
        }
    }

    pub fn is_supported(&self) -> bool {
        self.backend.is_recording_supported()
    }

    pub fn phase(&self) -> StreamPhase {
        *self.phase.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of device acquisitions issued so far.
    pub fn acquisitions(&self) -> usize {
        self.acquisitions.load(Ordering::SeqCst)
    }

    /// Returns the shared stream, acquiring the device on first use.
    ///
    /// Callers arriving while an acquisition is pending wait for it rather
    /// than issuing their own. On failure the banner shows the device error
    /// and the registry falls back to acquiring from scratch next time.
    pub async fn ensure_stream(&self) -> Result<StreamHandle, MicCheckError> {
        if !self.is_supported() {
            return Err(MicCheckError::DeviceUnsupported);
        }

        let mut slot = self.stream.lock().await;
        if let Some(handle) = slot.as_ref() {
            info!("Using an already started recorder stream");
            return Ok(handle.clone());
        }

        info!("Starting a new recorder stream");
        self.set_phase(StreamPhase::Pending);
        self.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.presenter.show(&self.messages.permission_request);

        let stream = match self.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                let detail = format!("{e:#}");
                warn!("Recorder stream failed to initialize: {}", detail);
                self.set_phase(StreamPhase::Errored);
                present_stream_error(self.presenter.as_ref(), &self.messages, &detail);
                return Err(MicCheckError::DeviceStream(detail));
            }
        };

        self.set_phase(StreamPhase::Ready);
        self.presenter.clear();
        info!("Recording stream ready (not recording yet)");

        let handle = Arc::new(Mutex::new(stream));
        *slot = Some(handle.clone());
        Ok(handle)
    }

    async fn acquire(&self) -> Result<DeviceStream> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut recorder = self.backend.create(&self.options, tx)?;
        recorder.init_stream()?;

        loop {
            match rx.recv().await {
                Some(CaptureEvent::StreamReady) => break,
                Some(CaptureEvent::StreamError(message)) => return Err(anyhow!(message)),
                Some(CaptureEvent::DataAvailable(_)) | Some(CaptureEvent::FlushFailed(_)) => {
                    debug!("Ignoring flush delivered before the stream was ready");
                }
                None => return Err(anyhow!("Capture stream closed before it became ready")),
            }
        }

        let (flush_tx, flush_rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_events(
            rx,
            flush_tx,
            self.presenter.clone(),
            self.messages.clone(),
        ));

        Ok(DeviceStream {
            recorder,
            flushes: flush_rx,
        })
    }

    fn set_phase(&self, phase: StreamPhase) {
        debug!("Stream phase -> {}", phase.as_str());
        *self.phase.lock().unwrap_or_else(|e| e.into_inner()) = phase;
    }
}
