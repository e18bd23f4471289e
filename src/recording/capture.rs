//! Capture backend interface.
//!
//! A [`CaptureDevice`] hands out one [`CaptureStream`] per recording session.
//! Streams report their output through a [`ChunkSink`]: any number of
//! [`CaptureEvent::Chunk`] events in order, followed by exactly one
//! [`CaptureEvent::Finalized`] after [`CaptureStream::stop`] is called.

use thiserror::Error;
use tokio::sync::mpsc;

/// Event emitted by an active capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// An encoded audio segment, in delivery order.
    Chunk(Vec<u8>),
    /// No more chunks will follow for this session.
    Finalized,
}

/// Sending half of a session's event channel.
pub type ChunkSink = mpsc::UnboundedSender<CaptureEvent>;

/// Errors raised while acquiring, running, or finalizing a capture stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// The platform refused access to the microphone.
    #[error("Microphone access denied: {0}")]
    PermissionDenied(String),

    /// No usable input device exists.
    #[error("No audio input device available: {0}")]
    DeviceUnavailable(String),

    /// The stream could not be built, started, or stopped.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// Captured audio could not be encoded.
    #[error("Audio encoding failed: {0}")]
    Encoding(String),

    /// The event channel closed before the stream reported finalization.
    #[error("Capture stream closed before finalizing")]
    FinalizeLost,
}

/// Source of capture streams, typically a microphone.
#[allow(async_fn_in_trait)]
pub trait CaptureDevice {
    type Stream: CaptureStream;

    /// Requests access to the input device and opens a stream on it.
    ///
    /// May suspend while the platform asks the user for permission.
    ///
    /// # Errors
    /// - `PermissionDenied` if access is refused
    /// - `DeviceUnavailable` if there is no input device
    async fn acquire(&mut self) -> Result<Self::Stream, CaptureError>;
}

/// One acquired input stream.
pub trait CaptureStream {
    /// Starts capturing and delivering events into `sink`.
    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError>;

    /// Asks the stream to finalize. Remaining chunks and a single
    /// [`CaptureEvent::Finalized`] are delivered to the sink, possibly later.
    fn stop(&mut self) -> Result<(), CaptureError>;

    /// Bytes of audio captured so far that have not been delivered as chunks.
    fn pending_bytes(&self) -> usize;

    /// Releases the underlying device. Must be safe to call more than once.
    fn release(&mut self);
}
