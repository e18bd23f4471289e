//! Microphone capture backend built on cpal.
//!
//! Captures from the system's default input device at its native sample rate,
//! converts the input to mono 16-bit PCM, and on stop encodes everything into
//! an in-memory WAV file that is delivered as a sequence of chunks.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use hound::WavWriter;
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use super::capture::{CaptureDevice, CaptureError, CaptureEvent, CaptureStream, ChunkSink};

#[cfg(target_os = "linux")]
use std::fs::OpenOptions;
#[cfg(target_os = "linux")]
use std::os::unix::io::AsRawFd;

/// Opens streams on the system default input device.
pub struct MicrophoneDevice {
    /// Maximum size of each delivered chunk in bytes
    chunk_bytes: usize,
}

impl MicrophoneDevice {
    pub fn new(chunk_bytes: usize) -> Self {
        Self {
            chunk_bytes: chunk_bytes.max(1),
        }
    }
}

impl CaptureDevice for MicrophoneDevice {
    type Stream = MicrophoneStream;

    async fn acquire(&mut self) -> Result<MicrophoneStream, CaptureError> {
        // Get device while suppressing ALSA library warnings
        let device = suppress_alsa_warnings(|| {
            cpal::default_host().default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device".to_string())
            })
        })?;

        let device_name = device
            .name()
            .unwrap_or_else(|_| "Unknown device".to_string());
        tracing::info!("Recording device: {}", device_name);

        let supported = device.default_input_config().map_err(|e| match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable(device_name.clone())
            }
            cpal::DefaultStreamConfigError::BackendSpecific { err } => {
                classify_backend_error(&err.description)
            }
            other => CaptureError::Stream(format!("Failed to get input config: {other}")),
        })?;

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let sample_format = supported.sample_format();

        tracing::debug!(
            "Device configuration: {}Hz, {} channels, {:?}",
            sample_rate,
            channels,
            sample_format
        );

        let samples = Arc::new(Mutex::new(Vec::new()));
        let samples_arc = Arc::clone(&samples);
        let config: cpal::StreamConfig = supported.into();

        let built = match sample_format {
            cpal::SampleFormat::I16 => device.build_input_stream(
                &config,
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    append_mono(&samples_arc, data, channels);
                },
                stream_error,
                None,
            ),
            cpal::SampleFormat::F32 => device.build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    let converted: Vec<i16> = data.iter().copied().map(f32_to_i16).collect();
                    append_mono(&samples_arc, &converted, channels);
                },
                stream_error,
                None,
            ),
            other => {
                return Err(CaptureError::Stream(format!(
                    "Unsupported sample format: {other:?}"
                )))
            }
        };

        let stream = built.map_err(|e| match e {
            cpal::BuildStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable(device_name.clone())
            }
            cpal::BuildStreamError::BackendSpecific { err } => {
                classify_backend_error(&err.description)
            }
            other => CaptureError::Stream(format!("Failed to build input stream: {other}")),
        })?;

        Ok(MicrophoneStream {
            stream: Some(stream),
            samples,
            sample_rate,
            chunk_bytes: self.chunk_bytes,
            sink: None,
        })
    }
}

/// An acquired microphone stream. Dropping it releases the device.
pub struct MicrophoneStream {
    /// Active cpal stream; `None` once released
    stream: Option<cpal::Stream>,
    /// Captured mono PCM samples
    samples: Arc<Mutex<Vec<i16>>>,
    sample_rate: u32,
    chunk_bytes: usize,
    sink: Option<ChunkSink>,
}

impl CaptureStream for MicrophoneStream {
    fn start(&mut self, sink: ChunkSink) -> Result<(), CaptureError> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| CaptureError::Stream("stream already released".to_string()))?;

        stream
            .play()
            .map_err(|e| CaptureError::Stream(format!("Failed to start stream: {e}")))?;
        self.sink = Some(sink);

        tracing::debug!("Audio stream started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), CaptureError> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| CaptureError::Stream("stream was never started".to_string()))?;

        // Stop the callbacks before draining the buffer
        self.release();

        let samples = std::mem::take(&mut *lock_samples(&self.samples));
        if samples.is_empty() {
            tracing::warn!("Recording stopped with no samples captured");
        } else {
            let duration_secs = samples.len() as f32 / self.sample_rate as f32;
            tracing::info!(
                "Recording stopped: {:.2}s ({} samples at {}Hz)",
                duration_secs,
                samples.len(),
                self.sample_rate
            );
        }

        let wav = encode_wav(&samples, self.sample_rate)?;
        for chunk in split_chunks(&wav, self.chunk_bytes) {
            if sink.send(CaptureEvent::Chunk(chunk)).is_err() {
                tracing::debug!("Chunk receiver dropped before finalization");
                return Ok(());
            }
        }
        if sink.send(CaptureEvent::Finalized).is_err() {
            tracing::debug!("Chunk receiver dropped before finalization");
        }

        Ok(())
    }

    fn pending_bytes(&self) -> usize {
        lock_samples(&self.samples).len() * std::mem::size_of::<i16>()
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Microphone released");
        }
    }
}

impl Drop for MicrophoneStream {
    fn drop(&mut self) {
        self.release();
    }
}

fn stream_error(err: cpal::StreamError) {
    tracing::error!("Audio stream error: {}", err);
}

/// Maps a backend error description to a capture error, recognising
/// permission refusals reported by the platform.
fn classify_backend_error(description: &str) -> CaptureError {
    let lowered = description.to_lowercase();
    if lowered.contains("permission") || lowered.contains("denied") {
        CaptureError::PermissionDenied(description.to_string())
    } else {
        CaptureError::Stream(description.to_string())
    }
}

fn lock_samples(samples: &Mutex<Vec<i16>>) -> std::sync::MutexGuard<'_, Vec<i16>> {
    samples.lock().unwrap_or_else(|e| {
        tracing::error!("Sample buffer lock poisoned, recovering: {}", e);
        e.into_inner()
    })
}

fn append_mono(samples: &Mutex<Vec<i16>>, data: &[i16], num_channels: usize) {
    let mut samples = lock_samples(samples);
    downmix_into(&mut samples, data, num_channels);
}

/// Appends `data` to `samples`, averaging interleaved channels into mono.
fn downmix_into(samples: &mut Vec<i16>, data: &[i16], num_channels: usize) {
    match num_channels {
        0 | 1 => samples.extend_from_slice(data),
        2 => {
            for frame in data.chunks_exact(2) {
                let mono = (i32::from(frame[0]) + i32::from(frame[1])) / 2;
                samples.push(mono as i16);
            }
        }
        _ => {
            for frame in data.chunks_exact(num_channels) {
                let sum: i32 = frame.iter().map(|&s| i32::from(s)).sum();
                samples.push((sum / num_channels as i32) as i16);
            }
        }
    }
}

fn f32_to_i16(sample: f32) -> i16 {
    (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
}

/// Encodes mono 16-bit PCM into a complete WAV file in memory.
fn encode_wav(samples: &[i16], sample_rate: u32) -> Result<Vec<u8>, CaptureError> {
    let wav_spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::with_capacity(44 + samples.len() * 2));
    {
        let mut writer = WavWriter::new(&mut cursor, wav_spec)
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        for &sample in samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Encoding(e.to_string()))?;
        }
        writer
            .finalize()
            .map_err(|e| CaptureError::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

fn split_chunks(bytes: &[u8], chunk_bytes: usize) -> Vec<Vec<u8>> {
    bytes.chunks(chunk_bytes.max(1)).map(<[u8]>::to_vec).collect()
}

/// Temporarily redirects stderr to /dev/null to suppress ALSA library warnings on Linux.
/// On non-Linux platforms, this is a no-op since ALSA doesn't exist.
#[cfg(target_os = "linux")]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T, CaptureError>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    let Ok(dev_null) = OpenOptions::new().write(true).open("/dev/null") else {
        return f();
    };

    let old_stderr = unsafe { libc::dup(libc::STDERR_FILENO) };
    if old_stderr == -1 {
        return f();
    }

    if unsafe { libc::dup2(dev_null.as_raw_fd(), libc::STDERR_FILENO) } == -1 {
        unsafe { libc::close(old_stderr) };
        return f();
    }

    let result = f();

    unsafe {
        libc::dup2(old_stderr, libc::STDERR_FILENO);
        libc::close(old_stderr);
    }

    result
}

#[cfg(not(target_os = "linux"))]
fn suppress_alsa_warnings<F, T>(f: F) -> Result<T, CaptureError>
where
    F: FnOnce() -> Result<T, CaptureError>,
{
    f()
}
