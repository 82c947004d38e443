//! Scriptable collaborators for unit tests.

use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::capture::{CaptureBackend, CaptureEvent, EventSender, Recorder, RecorderOptions};
use crate::token::{TokenSource, UploadToken};
use crate::upload::UploadClient;

/// Capture backend that counts device acquisitions.
pub struct FakeBackend {
    pub supported: bool,
    /// Error messages returned by successive `init_stream` calls.
    pub init_failures: Mutex<Vec<String>>,
    pub created: AtomicUsize,
    pub starts: Arc<AtomicUsize>,
    pub aborts: Arc<AtomicUsize>,
    /// Stream error reported by every `start`.
    pub start_error: Option<String>,
    /// Reported instead of a payload by every `stop`.
    pub flush_failure: Option<String>,
    pub payload: Vec<u8>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            supported: true,
            init_failures: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
            starts: Arc::new(AtomicUsize::new(0)),
            aborts: Arc::new(AtomicUsize::new(0)),
            start_error: None,
            flush_failure: None,
            payload: b"RIFF-fake-audio".to_vec(),
        }
    }

    pub fn erroring_on_start(message: &str) -> Self {
        Self {
            start_error: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn failing_flush(message: &str) -> Self {
        Self {
            flush_failure: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new()
        }
    }

    pub fn failing_once(message: &str) -> Self {
        let backend = Self::new();
        backend.init_failures.lock().unwrap().push(message.to_string());
        backend
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn aborts(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Payload flushed by the `n`th stop of a recorder, counting from 1.
    pub fn payload_for(&self, n: usize) -> Vec<u8> {
        let mut payload = self.payload.clone();
        payload.extend_from_slice(format!("#{n}").as_bytes());
        payload
    }
}

impl CaptureBackend for FakeBackend {
    fn is_recording_supported(&self) -> bool {
        self.supported
    }

    fn create(&self, _options: &RecorderOptions, events: EventSender) -> Result<Box<dyn Recorder>> {
        self.created.fetch_add(1, Ordering::SeqCst);
        let failure = {
            let mut failures = self.init_failures.lock().unwrap();
            if failures.is_empty() {
                None
            } else {
                Some(failures.remove(0))
            }
        };
        Ok(Box::new(FakeRecorder {
            events,
            failure,
            start_error: self.start_error.clone(),
            flush_failure: self.flush_failure.clone(),
            payload: self.payload.clone(),
            starts: self.starts.clone(),
            aborts: self.aborts.clone(),
            stops: 0,
            recording: false,
        }))
    }
}

pub struct FakeRecorder {
    events: EventSender,
    failure: Option<String>,
    start_error: Option<String>,
    flush_failure: Option<String>,
    payload: Vec<u8>,
    starts: Arc<AtomicUsize>,
    aborts: Arc<AtomicUsize>,
    stops: usize,
    recording: bool,
}

impl Recorder for FakeRecorder {
    fn init_stream(&mut self) -> Result<()> {
        let event = match self.failure.take() {
            Some(message) => CaptureEvent::StreamError(message),
            None => CaptureEvent::StreamReady,
        };
        let _ = self.events.send(event);
        Ok(())
    }

    fn start(&mut self) -> Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        self.recording = true;
        if let Some(message) = &self.start_error {
            let _ = self.events.send(CaptureEvent::StreamError(message.clone()));
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if !self.recording {
            bail!("not recording");
        }
        self.recording = false;
        self.stops += 1;
        let event = match &self.flush_failure {
            Some(message) => CaptureEvent::FlushFailed(message.clone()),
            None => {
                let mut payload = self.payload.clone();
                payload.extend_from_slice(format!("#{}", self.stops).as_bytes());
                CaptureEvent::DataAvailable(payload)
            }
        };
        let _ = self.events.send(event);
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        self.recording = false;
        Ok(())
    }
}

/// Upload client that records every submission.
#[derive(Default)]
pub struct FakeUploader {
    pub fail: bool,
    pub uploads: Mutex<Vec<(UploadToken, Vec<u8>)>>,
}

impl FakeUploader {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl UploadClient for FakeUploader {
    async fn upload(&self, token: &UploadToken, payload: Vec<u8>) -> Result<()> {
        self.uploads.lock().unwrap().push((token.clone(), payload));
        if self.fail {
            bail!("connection refused");
        }
        Ok(())
    }
}

/// Hands out "1", "2", "3", ...
#[derive(Default)]
pub struct SequentialTokens {
    next: AtomicUsize,
}

impl TokenSource for SequentialTokens {
    fn next_token(&self) -> UploadToken {
        let n = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        UploadToken::parse(&n.to_string()).unwrap()
    }
}
