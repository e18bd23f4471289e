//! Audio recording and upload.
//!
//! Runs the recorder either interactively in the TUI or headless for a fixed
//! duration. Supports external stop triggers via SIGUSR1 signal.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::MicpostConfig;
use crate::playback::{PlaybackSurface, SilentPlayback, SystemPlayer};
use crate::recording::{
    MicrophoneDevice, RecorderCommand, RecorderTui, RecorderView, RecordingController,
    StatusLine, StopOutcome,
};
use crate::upload::HttpUploader;

type Controller<P> = RecordingController<MicrophoneDevice, HttpUploader, P>;

/// Command-line options for the record command.
#[derive(Debug, Default)]
pub struct RecordOptions {
    /// Record for this many seconds without the TUI, then upload and exit
    pub duration: Option<u64>,
    /// Skip local playback of each recording
    pub no_playback: bool,
    /// Upload endpoint overriding the config file
    pub endpoint: Option<String>,
}

/// Handles audio recording, playback, and upload.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the terminal UI cannot be initialized
/// - In headless mode, if recording or upload fails
pub async fn handle_record(options: RecordOptions) -> Result<(), anyhow::Error> {
    tracing::info!("=== micpost Recorder Started ===");

    let mut config = MicpostConfig::load().map_err(|e| {
        tracing::error!("Failed to load configuration: {e}");
        anyhow::anyhow!(
            "Configuration error: {e}\n\nPlease check your ~/.config/micpost/micpost.toml file and try again."
        )
    })?;
    if let Some(endpoint) = options.endpoint {
        config.upload.endpoint = endpoint;
    }

    tracing::info!(
        "Configuration loaded: endpoint={}, field={}, file_name={}, mime={}, playback={}",
        config.upload.endpoint,
        config.upload.field_name,
        config.upload.file_name,
        config.upload.mime_type,
        config.playback.enabled && !options.no_playback
    );

    let device = MicrophoneDevice::new(config.audio.chunk_bytes);
    let uploader = HttpUploader::new(&config.upload);
    let mime_type = config.upload.mime_type.clone();
    let stop_signal = register_stop_signal()?;

    match options.duration {
        Some(secs) => {
            // The process exits right after the upload, so there is nobody to listen
            let controller = RecordingController::new(device, uploader, SilentPlayback, mime_type);
            run_headless(controller, Duration::from_secs(secs), &stop_signal).await?;
        }
        None if config.playback.enabled && !options.no_playback => {
            let playback = SystemPlayer::new(config.playback.player.clone());
            let controller = RecordingController::new(device, uploader, playback, mime_type);
            run_interactive(controller, &stop_signal).await?;
        }
        None => {
            let controller = RecordingController::new(device, uploader, SilentPlayback, mime_type);
            run_interactive(controller, &stop_signal).await?;
        }
    }

    tracing::info!("=== micpost Recorder Exited Successfully ===");
    Ok(())
}

/// Registers SIGUSR1 as an external "stop" trigger.
fn register_stop_signal() -> anyhow::Result<Arc<AtomicBool>> {
    let flag = Arc::new(AtomicBool::new(false));
    #[cfg(unix)]
    signal_hook::flag::register(signal_hook::consts::SIGUSR1, Arc::clone(&flag))
        .map_err(|e| anyhow::anyhow!("Failed to register signal handler: {e}"))?;
    Ok(flag)
}

async fn run_interactive<P: PlaybackSurface>(
    mut controller: Controller<P>,
    stop_signal: &AtomicBool,
) -> anyhow::Result<()> {
    let mut tui = RecorderTui::new().map_err(|e| anyhow::anyhow!("Failed to initialize UI: {e}"))?;
    let mut status = StatusLine::Ready;

    tracing::debug!("Entering recorder loop. Press 's' to start, 'Enter' to stop, 'q' to quit.");

    loop {
        render(&mut tui, &controller, &status)?;

        let command = if stop_signal.swap(false, Ordering::Relaxed) && controller.is_recording() {
            tracing::info!("Received SIGUSR1: stopping via external trigger");
            RecorderCommand::Stop
        } else {
            tui.handle_input(controller.controls())?
        };

        controller.pump();

        match command {
            RecorderCommand::Continue => {}
            RecorderCommand::Start => {
                status = match controller.start_capture().await {
                    Ok(()) => StatusLine::Recording,
                    Err(e) => StatusLine::Error(e.to_string()),
                };
            }
            RecorderCommand::Stop => {
                status = StatusLine::Uploading;
                render(&mut tui, &controller, &status)?;
                status = match controller.stop_capture().await {
                    Ok(StopOutcome::Completed(report)) => StatusLine::from_report(&report),
                    Ok(StopOutcome::Idle) => StatusLine::Ready,
                    Err(e) => StatusLine::Error(e.to_string()),
                };
            }
            RecorderCommand::Quit => {
                if controller.is_recording() {
                    tracing::info!("Recorder closed during a recording; discarding it");
                }
                break;
            }
        }
    }

    tui.cleanup()
        .map_err(|e| anyhow::anyhow!("Cleanup failed: {e}"))?;
    Ok(())
}

fn render<P: PlaybackSurface>(
    tui: &mut RecorderTui,
    controller: &Controller<P>,
    status: &StatusLine,
) -> anyhow::Result<()> {
    let view = RecorderView {
        controls: controller.controls(),
        elapsed: controller.elapsed(),
        chunks: controller.buffered_chunks(),
        captured: controller.captured_bytes(),
        status,
    };
    tui.render(&view)
        .map_err(|e| anyhow::anyhow!("Render failed: {e}"))
}

async fn run_headless<P: PlaybackSurface>(
    mut controller: Controller<P>,
    duration: Duration,
    stop_signal: &AtomicBool,
) -> anyhow::Result<()> {
    controller
        .start_capture()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start recording: {e}"))?;

    eprintln!(
        "Recording for {}s (send SIGUSR1 to stop early)...",
        duration.as_secs()
    );

    let deadline = Instant::now() + duration;
    while Instant::now() < deadline {
        if stop_signal.swap(false, Ordering::Relaxed) {
            tracing::info!("Received SIGUSR1: stopping via external trigger");
            break;
        }
        controller.pump();
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    match controller.stop_capture().await? {
        StopOutcome::Completed(report) => {
            let receipt = report
                .upload
                .map_err(|e| anyhow::anyhow!("Upload failed: {e}"))?;
            eprintln!(
                "Session {}: uploaded {} bytes in {} chunks ({:.1}s) with status {}",
                report.session,
                report.recording_bytes,
                report.chunk_count,
                report.duration.as_secs_f32(),
                receipt.status
            );
            Ok(())
        }
        StopOutcome::Idle => Ok(()),
    }
}
