//! Default input device capture via cpal.
//!
//! `cpal::Stream` is not `Send` on every platform, so each recorder owns a
//! dedicated capture thread that holds the stream and is driven by commands.
//! With `leave_stream_open` the stream stays open between captures and only
//! the "capturing" flag toggles, so the device is acquired once.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

use super::{CaptureBackend, CaptureEvent, EventSender, Recorder, RecorderOptions};

#[derive(Debug, Default, Clone, Copy)]
pub struct CpalBackend;

impl CaptureBackend for CpalBackend {
    fn is_recording_supported(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn create(&self, options: &RecorderOptions, events: EventSender) -> Result<Box<dyn Recorder>> {
        Ok(Box::new(CpalRecorder::spawn(options.clone(), events)?))
    }
}

enum Command {
    Init,
    Start,
    Stop,
    Abort,
    Shutdown,
}

pub struct CpalRecorder {
    commands: mpsc::Sender<Command>,
    worker: Option<JoinHandle<()>>,
}

impl CpalRecorder {
    fn spawn(options: RecorderOptions, events: EventSender) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let worker = std::thread::Builder::new()
            .name("miccheck-capture".to_string())
            .spawn(move || CaptureWorker::new(options, events).run(rx))
            .context("Failed to spawn capture thread")?;

        Ok(Self {
            commands: tx,
            worker: Some(worker),
        })
    }

    fn send(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| anyhow!("Capture thread is no longer running"))
    }
}

impl Recorder for CpalRecorder {
    fn init_stream(&mut self) -> Result<()> {
        self.send(Command::Init)
    }

    fn start(&mut self) -> Result<()> {
        self.send(Command::Start)
    }

    fn stop(&mut self) -> Result<()> {
        self.send(Command::Stop)
    }

    fn abort(&mut self) -> Result<()> {
        self.send(Command::Abort)
    }
}

impl Drop for CpalRecorder {
    fn drop(&mut self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }
    }
}

struct CaptureWorker {
    options: RecorderOptions,
    events: EventSender,
    stream: Option<cpal::Stream>,
    capturing: Arc<AtomicBool>,
    samples: Arc<Mutex<Vec<f32>>>,
}

impl CaptureWorker {
    fn new(options: RecorderOptions, events: EventSender) -> Self {
        Self {
            options,
            events,
            stream: None,
            capturing: Arc::new(AtomicBool::new(false)),
            samples: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn run(mut self, commands: mpsc::Receiver<Command>) {
        while let Ok(command) = commands.recv() {
            match command {
                Command::Init => match self.open_stream() {
                    Ok(()) => self.emit(CaptureEvent::StreamReady),
                    Err(e) => self.emit(CaptureEvent::StreamError(format!("{e:#}"))),
                },
                Command::Start => self.start(),
                Command::Stop => self.stop(),
                Command::Abort => self.abort(),
                Command::Shutdown => break,
            }
        }
        debug!("Capture thread exiting");
    }

    fn open_stream(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .context("No input device available")?;

        info!(
            "Mic check using device: {}",
            device.name().unwrap_or_else(|_| "unknown".to_string())
        );

        let config = cpal::StreamConfig {
            channels: self.options.channels,
            sample_rate: cpal::SampleRate(self.options.sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let samples = self.samples.clone();
        let capturing = self.capturing.clone();
        let error_events = self.events.clone();

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if capturing.load(Ordering::Relaxed) {
                        if let Ok(mut samples) = samples.lock() {
                            samples.extend_from_slice(data);
                        }
                    }
                },
                move |err| {
                    error!("Mic check stream error: {}", err);
                    let _ = error_events.send(CaptureEvent::StreamError(err.to_string()));
                },
                None,
            )
            .context("Failed to build input stream")?;

        stream.play().context("Failed to start input stream")?;
        self.stream = Some(stream);
        Ok(())
    }

    fn start(&mut self) {
        if self.stream.is_none() {
            if let Err(e) = self.open_stream() {
                self.emit(CaptureEvent::StreamError(format!("{e:#}")));
                return;
            }
        }

        if let Ok(mut samples) = self.samples.lock() {
            samples.clear();
        }
        self.capturing.store(true, Ordering::Relaxed);
        info!("Capture started");
    }

    fn stop(&mut self) {
        let samples = self.halt();

        info!("Capture stopped, {} samples captured", samples.len());

        let event = match self.options.encoder.encode(
            &samples,
            self.options.sample_rate,
            self.options.channels,
        ) {
            Ok(payload) => CaptureEvent::DataAvailable(payload),
            Err(e) => CaptureEvent::FlushFailed(format!("Failed to encode recording: {e:#}")),
        };
        self.emit(event);
    }

    fn abort(&mut self) {
        let samples = self.halt();
        info!("Capture aborted, {} samples discarded", samples.len());
    }

    /// Stops capturing and takes the recorded samples.
    fn halt(&mut self) -> Vec<f32> {
        self.capturing.store(false, Ordering::Relaxed);

        if !self.options.leave_stream_open {
            if let Some(stream) = self.stream.take() {
                debug!("Releasing input stream");
                drop(stream);
            }
        }

        match self.samples.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    fn emit(&self, event: CaptureEvent) {
        if self.events.send(event).is_err() {
            debug!("Capture event dropped, no listener");
        }
    }
}
