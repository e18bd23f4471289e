//! Audio recording feature for micpost.
//!
//! Provides the capture backend, the recording controller that runs each
//! start/stop/upload cycle, and the terminal UI that drives it.

pub mod capture;
pub mod chunks;
pub mod controller;
pub mod controls;
pub mod microphone;
pub mod ui;

pub use chunks::Recording;
pub use controller::{RecordingController, StopOutcome};
pub use microphone::MicrophoneDevice;
pub use ui::{RecorderCommand, RecorderTui, RecorderView, StatusLine};
