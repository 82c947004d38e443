//! Recording flow.
//!
//! [`MicCheck`] hands out one [`Attempt`] per user-initiated check. An
//! attempt moves `idle → recording → stopped` over the shared capture
//! stream and exposes three operations:
//!
//! - [`Attempt::start`] begins capture.
//! - [`Attempt::finish`] stops capture. The encoded payload is uploaded in
//!   the background as soon as the recorder flushes it. The shared stream
//!   stays locked until that payload is taken, so the next attempt cannot
//!   start before it.
//! - [`Attempt::done`] registers the caller's continuation. It runs once,
//!   with the upload token, whether it was registered before or after the
//!   upload finished.
//!
//! When the runtime cannot record at all, `start`/`finish` do nothing and
//! `done` invokes its continuation immediately with no token. Dropping an
//! attempt that is still recording aborts the capture.

use std::sync::Arc;
use tokio::sync::{oneshot, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::banner::{present_connectivity_failure, present_stream_error, ErrorPresenter};
use crate::config::MessagesConfig;
use crate::error::MicCheckError;
use crate::join::{Arrival, CompletionJoin};
use crate::session::{DeviceStream, StreamHandle, StreamRegistry};
use crate::token::{TokenSource, UploadToken};
use crate::upload::UploadClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptPhase {
    Idle,
    Recording,
    Stopped,
}

impl AttemptPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptPhase::Idle => "idle",
            AttemptPhase::Recording => "recording",
            AttemptPhase::Stopped => "stopped",
        }
    }
}

/// Collaborators every attempt needs, shared by all of them.
#[derive(Clone)]
struct FlowContext {
    uploader: Arc<dyn UploadClient>,
    tokens: Arc<dyn TokenSource>,
    presenter: Arc<dyn ErrorPresenter>,
    messages: MessagesConfig,
}

pub struct MicCheck {
    registry: Arc<StreamRegistry>,
    context: FlowContext,
}

impl MicCheck {
    pub fn new(
        registry: Arc<StreamRegistry>,
        uploader: Arc<dyn UploadClient>,
        tokens: Arc<dyn TokenSource>,
        presenter: Arc<dyn ErrorPresenter>,
        messages: MessagesConfig,
    ) -> Self {
        Self {
            registry,
            context: FlowContext {
                uploader,
                tokens,
                presenter,
                messages,
            },
        }
    }

    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    /// Prepares a new attempt, acquiring or reusing the capture stream.
    ///
    /// An unsupported runtime yields an attempt whose `is_supported()` is
    /// false rather than an error. A device failure has already been shown
    /// on the banner when `Err` is returned.
    pub async fn begin_attempt(&self) -> Result<Attempt, MicCheckError> {
        if !self.registry.is_supported() {
            info!("Recording is not supported, attempt degrades to no-ops");
            return Ok(Attempt::unsupported());
        }

        let stream = self.registry.ensure_stream().await?;
        Ok(Attempt::wired(stream, self.context.clone()))
    }
}

struct Wiring {
    stream: StreamHandle,
    context: FlowContext,
}

pub struct Attempt {
    wiring: Option<Wiring>,
    phase: AttemptPhase,
    join: CompletionJoin<UploadToken>,
    upload: Option<JoinHandle<Result<(), MicCheckError>>>,
}

impl Attempt {
    fn unsupported() -> Self {
        Self {
            wiring: None,
            phase: AttemptPhase::Idle,
            join: CompletionJoin::new(),
            upload: None,
        }
    }

    fn wired(stream: StreamHandle, context: FlowContext) -> Self {
        Self {
            wiring: Some(Wiring { stream, context }),
            phase: AttemptPhase::Idle,
            join: CompletionJoin::new(),
            upload: None,
        }
    }

    pub fn is_supported(&self) -> bool {
        self.wiring.is_some()
    }

    pub fn phase(&self) -> AttemptPhase {
        self.phase
    }

    pub async fn start(&mut self) -> Result<(), MicCheckError> {
        let Some(wiring) = &self.wiring else {
            return Ok(());
        };
        if self.phase != AttemptPhase::Idle {
            warn!("start() called while {}, ignoring", self.phase.as_str());
            return Ok(());
        }

        info!("Start recording");
        let result = wiring.stream.lock().await.start();
        if let Err(e) = result {
            let detail = format!("{e:#}");
            error!("Failed to start recording: {}", detail);
            present_stream_error(
                wiring.context.presenter.as_ref(),
                &wiring.context.messages,
                &detail,
            );
            return Err(MicCheckError::DeviceStream(detail));
        }

        self.phase = AttemptPhase::Recording;
        Ok(())
    }

    /// Stops capture and schedules the upload of the flushed payload.
    pub async fn finish(&mut self) -> Result<(), MicCheckError> {
        let Some(wiring) = &self.wiring else {
            return Ok(());
        };
        if self.phase != AttemptPhase::Recording {
            warn!("finish() called while {}, ignoring", self.phase.as_str());
            return Ok(());
        }

        info!("Stopping recording");
        let mut stream = wiring.stream.clone().lock_owned().await;
        if let Err(e) = stream.stop() {
            let detail = format!("{e:#}");
            error!("Failed to stop recording: {}", detail);
            present_stream_error(
                wiring.context.presenter.as_ref(),
                &wiring.context.messages,
                &detail,
            );
            return Err(MicCheckError::DeviceStream(detail));
        }

        self.phase = AttemptPhase::Stopped;
        self.upload = Some(tokio::spawn(upload_when_flushed(
            stream,
            wiring.context.clone(),
            self.join.clone(),
        )));
        Ok(())
    }

    /// Registers the continuation for this attempt.
    ///
    /// It runs exactly once with the upload token, or synchronously with
    /// `None` when recording is unsupported. If the upload fails it never
    /// runs.
    pub fn done<F>(&self, after_done: F)
    where
        F: FnOnce(Option<UploadToken>) + Send + 'static,
    {
        if self.wiring.is_none() {
            after_done(None);
            return;
        }
        self.join.arrive(Arrival::continuation(after_done));
    }

    /// Consumes the attempt and waits for its continuation.
    ///
    /// Resolves to `None` when recording is unsupported or when the upload
    /// failed (the continuation is dropped without running once the
    /// background upload ends).
    pub async fn into_done(self) -> Option<UploadToken> {
        let (tx, rx) = oneshot::channel();
        self.done(move |token| {
            let _ = tx.send(token);
        });
        drop(self);
        rx.await.ok().flatten()
    }

    /// Waits for the background upload, if one was scheduled, to finish.
    ///
    /// Reports why the attempt produced no token. The error has already
    /// been shown on the banner.
    pub async fn upload_settled(&mut self) -> Result<(), MicCheckError> {
        let Some(upload) = self.upload.take() else {
            return Ok(());
        };
        match upload.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Upload task failed: {}", e);
                Err(MicCheckError::UploadConnectivity(e.to_string()))
            }
        }
    }
}

impl Drop for Attempt {
    fn drop(&mut self) {
        if self.phase != AttemptPhase::Recording {
            return;
        }
        let Some(wiring) = &self.wiring else {
            return;
        };
        match wiring.stream.try_lock() {
            Ok(mut stream) => {
                info!("Attempt dropped while recording, aborting capture");
                if let Err(e) = stream.abort() {
                    warn!("Failed to abort capture: {:#}", e);
                }
            }
            Err(_) => warn!("Attempt dropped while recording but the stream is busy"),
        }
    }
}

/// Takes the payload flushed by `stop`, then uploads it under a fresh token.
///
/// The stream guard is released as soon as the payload is in hand, so only
/// the upload itself overlaps with later attempts.
async fn upload_when_flushed(
    mut stream: OwnedMutexGuard<DeviceStream>,
    context: FlowContext,
    join: CompletionJoin<UploadToken>,
) -> Result<(), MicCheckError> {
    let payload = stream.next_payload().await;
    drop(stream);

    let payload = match payload {
        Ok(payload) => payload,
        Err(e) => {
            let detail = format!("{e:#}");
            error!("Recording did not produce audio: {}", detail);
            present_stream_error(context.presenter.as_ref(), &context.messages, &detail);
            return Err(MicCheckError::DeviceStream(detail));
        }
    };

    let token = context.tokens.next_token();
    info!("Recorded data is available ({} bytes)", payload.len());

    match context.uploader.upload(&token, payload).await {
        Ok(()) => {
            info!("Mic check sample {} uploaded", token);
            join.arrive(Arrival::value(token));
            Ok(())
        }
        Err(e) => {
            let detail = format!("{e:#}");
            error!("Error saving recorded audio: {}", detail);
            present_connectivity_failure(context.presenter.clone(), &context.messages);
            Err(MicCheckError::UploadConnectivity(detail))
        }
    }
}
