//! Local listen-back of finished recordings.
//!
//! Each recording is written to its own temporary file, which acts as the
//! locally playable reference, and handed to the platform audio player. The
//! player runs detached; nothing waits for it to finish. The files live until
//! the [`SystemPlayer`] is dropped.

use std::path::PathBuf;
use std::process::Stdio;
use thiserror::Error;

use crate::recording::Recording;

/// Where a presented recording can be played from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackSource {
    /// File holding the recording bytes
    pub path: PathBuf,
    /// Player that was launched on it
    pub player: String,
}

#[derive(Error, Debug)]
pub enum PlaybackError {
    #[error("Failed to write playback file: {0}")]
    Io(#[from] std::io::Error),

    #[error("No audio player found (tried: {0})")]
    NoPlayer(String),
}

/// Surface that receives each finished recording for immediate review.
pub trait PlaybackSurface {
    /// Presents a recording. Returns `None` when the surface plays nothing.
    fn present(&mut self, recording: &Recording) -> Result<Option<PlaybackSource>, PlaybackError>;
}

/// Plays recordings with the system audio player.
pub struct SystemPlayer {
    dir: PathBuf,
    player: Option<String>,
    /// Files written so far, removed on drop
    written: Vec<PathBuf>,
}

impl SystemPlayer {
    /// Creates a player writing into the system temp directory.
    ///
    /// `player` overrides the platform default, e.g. `"mpv --really-quiet"`.
    pub fn new(player: Option<String>) -> Self {
        Self::in_dir(std::env::temp_dir(), player)
    }

    pub fn in_dir(dir: PathBuf, player: Option<String>) -> Self {
        Self {
            dir,
            player,
            written: Vec::new(),
        }
    }

    /// Path for the next recording, unique per process and take. A player
    /// still reading an earlier take keeps its own file.
    fn next_reference_path(&self) -> PathBuf {
        self.dir.join(format!(
            "micpost-{}-{}.wav",
            std::process::id(),
            self.written.len() + 1
        ))
    }

    fn candidates(&self) -> Vec<Vec<String>> {
        if let Some(player) = &self.player {
            let parts: Vec<String> = player.split_whitespace().map(str::to_string).collect();
            return if parts.is_empty() { Vec::new() } else { vec![parts] };
        }

        let defaults: &[&[&str]] = if cfg!(target_os = "macos") {
            &[&["afplay"]]
        } else if cfg!(target_os = "linux") {
            &[
                &["paplay"],
                &["aplay", "-q"],
                &["ffplay", "-nodisp", "-autoexit", "-loglevel", "quiet"],
                &["mpv", "--no-video", "--really-quiet"],
            ]
        } else {
            &[]
        };

        defaults
            .iter()
            .map(|cmd| cmd.iter().map(|s| s.to_string()).collect())
            .collect()
    }
}

impl PlaybackSurface for SystemPlayer {
    fn present(&mut self, recording: &Recording) -> Result<Option<PlaybackSource>, PlaybackError> {
        let reference_path = self.next_reference_path();
        std::fs::write(&reference_path, recording.bytes())?;
        self.written.push(reference_path.clone());
        tracing::debug!(
            "Playback file written: {} ({} bytes)",
            reference_path.display(),
            recording.len()
        );

        let candidates = self.candidates();
        for command in &candidates {
            let Some((program, args)) = command.split_first() else {
                continue;
            };

            let spawned = tokio::process::Command::new(program)
                .args(args)
                .arg(&reference_path)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .spawn();

            match spawned {
                Ok(_child) => {
                    tracing::info!("Playing recording with {}", program);
                    return Ok(Some(PlaybackSource {
                        path: reference_path,
                        player: program.clone(),
                    }));
                }
                Err(e) => {
                    tracing::debug!("Audio player '{}' unavailable: {}", program, e);
                }
            }
        }

        let tried: Vec<&str> = candidates
            .iter()
            .filter_map(|c| c.first().map(String::as_str))
            .collect();
        Err(PlaybackError::NoPlayer(tried.join(", ")))
    }
}

impl Drop for SystemPlayer {
    fn drop(&mut self) {
        for path in self.written.drain(..) {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::debug!("Failed to remove playback file {}: {}", path.display(), e);
            }
        }
    }
}

/// Playback surface that discards recordings.
#[derive(Debug, Default)]
pub struct SilentPlayback;

impl PlaybackSurface for SilentPlayback {
    fn present(&mut self, _recording: &Recording) -> Result<Option<PlaybackSource>, PlaybackError> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Fresh directory per test so parallel tests never share files.
    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("micpost-test-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_present_writes_reference_and_launches_player() {
        let dir = temp_dir("launch");
        let mut player = SystemPlayer::in_dir(dir.clone(), Some("true".to_string()));
        let recording = Recording::new(vec![9, 8, 7], "audio/wav");

        let source = player.present(&recording).unwrap().unwrap();
        assert!(source.path.starts_with(&dir));
        assert_eq!(source.player, "true");
        assert_eq!(std::fs::read(&source.path).unwrap(), vec![9, 8, 7]);

        drop(player);
        assert!(!source.path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_each_take_gets_its_own_file_until_drop() {
        let dir = temp_dir("takes");
        let mut player = SystemPlayer::in_dir(dir.clone(), Some("true".to_string()));

        let first = player
            .present(&Recording::new(vec![1], "audio/wav"))
            .unwrap()
            .unwrap();
        let second = player
            .present(&Recording::new(vec![2, 2], "audio/wav"))
            .unwrap()
            .unwrap();

        assert_ne!(first.path, second.path);
        assert_eq!(std::fs::read(&first.path).unwrap(), vec![1]);
        assert_eq!(std::fs::read(&second.path).unwrap(), vec![2, 2]);

        drop(player);
        assert!(!first.path.exists());
        assert!(!second.path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_player_is_reported() {
        let dir = temp_dir("missing");
        let mut player = SystemPlayer::in_dir(
            dir.clone(),
            Some("micpost-no-such-player --flag".to_string()),
        );
        let recording = Recording::new(vec![1], "audio/wav");

        let err = player.present(&recording).unwrap_err();
        assert!(matches!(err, PlaybackError::NoPlayer(ref tried) if tried == "micpost-no-such-player"));
        // The reference is still written for manual playback
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

        drop(player);
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_silent_playback_presents_nothing() {
        let mut surface = SilentPlayback;
        let recording = Recording::new(vec![1, 2], "audio/wav");
        assert!(surface.present(&recording).unwrap().is_none());
    }
}
