//! Recording controller.
//!
//! Owns the capture session and chunk buffer, and runs one
//! start -> capture -> stop -> playback -> upload -> reset cycle at a time.
//! The controller has two states, Idle and Recording; the start and stop
//! controls are derived from whether a session exists.

use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

use super::capture::{CaptureDevice, CaptureError, CaptureEvent, CaptureStream};
use super::chunks::{ChunkBuffer, Recording};
use super::controls::Controls;
use crate::playback::{PlaybackError, PlaybackSource, PlaybackSurface};
use crate::upload::{UploadError, UploadReceipt, Uploader};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    /// A capture session is already running.
    #[error("A recording is already in progress")]
    SessionActive,

    #[error(transparent)]
    Capture(#[from] CaptureError),
}

/// Result of a stop request.
#[derive(Debug)]
pub enum StopOutcome {
    /// No session was active; nothing was finalized or uploaded.
    Idle,
    /// A session was finalized, presented, and uploaded.
    Completed(CycleReport),
}

/// What happened to one finished recording.
#[derive(Debug)]
pub struct CycleReport {
    pub session: u64,
    pub chunk_count: usize,
    pub recording_bytes: usize,
    pub duration: Duration,
    pub playback: Result<Option<PlaybackSource>, PlaybackError>,
    pub upload: Result<UploadReceipt, UploadError>,
}

/// An active capture session. Dropping it releases the capture stream.
struct CaptureSession<S: CaptureStream> {
    id: u64,
    started_at: Instant,
    stream: S,
    events: mpsc::UnboundedReceiver<CaptureEvent>,
    finalized: bool,
}

impl<S: CaptureStream> Drop for CaptureSession<S> {
    fn drop(&mut self) {
        self.stream.release();
    }
}

/// Mediates between start/stop requests and the capture, playback, and upload
/// collaborators.
pub struct RecordingController<D, U, P>
where
    D: CaptureDevice,
    U: Uploader,
    P: PlaybackSurface,
{
    device: D,
    uploader: U,
    playback: P,
    mime_type: String,
    session: Option<CaptureSession<D::Stream>>,
    chunks: ChunkBuffer,
    sessions_started: u64,
}

impl<D, U, P> RecordingController<D, U, P>
where
    D: CaptureDevice,
    U: Uploader,
    P: PlaybackSurface,
{
    /// Creates an idle controller. Recordings are tagged with `mime_type`.
    pub fn new(device: D, uploader: U, playback: P, mime_type: impl Into<String>) -> Self {
        Self {
            device,
            uploader,
            playback,
            mime_type: mime_type.into(),
            session: None,
            chunks: ChunkBuffer::new(),
            sessions_started: 0,
        }
    }

    pub fn controls(&self) -> Controls {
        Controls::for_session(self.session.is_some())
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Number of chunks received so far in the current session.
    pub fn buffered_chunks(&self) -> usize {
        self.chunks.len()
    }

    pub fn buffered_bytes(&self) -> usize {
        self.chunks.byte_len()
    }

    /// Audio captured in the current session, whether or not it has been
    /// delivered as chunks yet.
    pub fn captured_bytes(&self) -> usize {
        let pending = self
            .session
            .as_ref()
            .map_or(0, |s| s.stream.pending_bytes());
        self.buffered_bytes() + pending
    }

    /// Time since the current session started.
    pub fn elapsed(&self) -> Option<Duration> {
        self.session.as_ref().map(|s| s.started_at.elapsed())
    }

    /// Acquires the input device and starts a new capture session.
    ///
    /// On failure the controller stays idle.
    ///
    /// # Errors
    /// - `SessionActive` if a session is already running; the device is not touched
    /// - `Capture` if the device cannot be acquired or started
    pub async fn start_capture(&mut self) -> Result<(), ControllerError> {
        if self.session.is_some() {
            tracing::warn!("Start requested while a recording is in progress");
            return Err(ControllerError::SessionActive);
        }

        let mut stream = self.device.acquire().await.map_err(|e| {
            tracing::error!("Failed to acquire input device: {}", e);
            e
        })?;

        let (sink, events) = mpsc::unbounded_channel();
        if let Err(e) = stream.start(sink) {
            tracing::error!("Failed to start capture: {}", e);
            stream.release();
            return Err(e.into());
        }

        self.sessions_started += 1;
        self.chunks.clear();
        self.session = Some(CaptureSession {
            id: self.sessions_started,
            started_at: Instant::now(),
            stream,
            events,
            finalized: false,
        });

        tracing::info!("Recording session {} started", self.sessions_started);
        Ok(())
    }

    /// Moves chunks delivered so far into the buffer without waiting.
    ///
    /// Returns the number of new chunks.
    pub fn pump(&mut self) -> usize {
        let Some(session) = self.session.as_mut() else {
            return 0;
        };

        let mut received = 0;
        while let Ok(event) = session.events.try_recv() {
            match event {
                CaptureEvent::Chunk(chunk) => {
                    self.chunks.push(chunk);
                    received += 1;
                }
                CaptureEvent::Finalized => session.finalized = true,
            }
        }
        received
    }

    /// Stops the current session and runs finalize, playback, and upload to completion.
    ///
    /// With no active session this does nothing and returns [`StopOutcome::Idle`].
    /// Whatever the outcome, the chunk buffer is cleared, the capture stream is
    /// released, and the controller returns to idle.
    ///
    /// # Errors
    /// - `Capture` if the stream fails to finalize; upload failures are
    ///   reported in the [`CycleReport`] instead
    pub async fn stop_capture(&mut self) -> Result<StopOutcome, ControllerError> {
        if self.session.is_none() {
            tracing::debug!("Stop requested with no active recording");
            return Ok(StopOutcome::Idle);
        }

        let result = match self.finalize().await {
            Ok(()) => Ok(StopOutcome::Completed(self.on_capture_finalized().await)),
            Err(e) => {
                tracing::error!("Capture failed to finalize: {}", e);
                Err(e.into())
            }
        };

        self.reset();
        result
    }

    /// Requests finalization and collects chunks until the stream reports it is done.
    async fn finalize(&mut self) -> Result<(), CaptureError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(());
        };

        if !session.finalized {
            session.stream.stop()?;
        }

        while !session.finalized {
            match session.events.recv().await {
                Some(CaptureEvent::Chunk(chunk)) => self.chunks.push(chunk),
                Some(CaptureEvent::Finalized) => session.finalized = true,
                None => return Err(CaptureError::FinalizeLost),
            }
        }

        Ok(())
    }

    async fn on_capture_finalized(&mut self) -> CycleReport {
        let (session_id, duration) = self
            .session
            .as_ref()
            .map(|s| (s.id, s.started_at.elapsed()))
            .unwrap_or_default();

        if self.chunks.is_empty() {
            tracing::warn!("Recording session {} finalized without any chunks", session_id);
        }

        let recording: Recording = self.chunks.assemble(&self.mime_type);
        tracing::info!(
            "Recording session {} finalized: {} chunks, {} bytes, {:.2}s",
            session_id,
            self.chunks.len(),
            recording.len(),
            duration.as_secs_f32()
        );

        let playback = self.playback.present(&recording);
        if let Err(e) = &playback {
            tracing::warn!("Playback unavailable: {}", e);
        }

        let upload = self.uploader.upload(&recording).await;
        match &upload {
            Ok(receipt) => tracing::info!(
                "Upload complete: {} bytes, status {}",
                receipt.bytes_sent,
                receipt.status
            ),
            Err(e) => tracing::warn!("Upload failed: {}", e),
        }

        CycleReport {
            session: session_id,
            chunk_count: self.chunks.len(),
            recording_bytes: recording.len(),
            duration,
            playback,
            upload,
        }
    }

    fn reset(&mut self) {
        self.chunks.clear();
        if let Some(session) = self.session.take() {
            tracing::debug!("Recording session {} closed", session.id);
        }
    }
}
