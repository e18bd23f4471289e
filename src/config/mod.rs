//! Configuration management for micpost.
//!
//! Configuration is a TOML file in the user's config directory covering the
//! capture backend, the upload endpoint, and local playback.

pub mod file;

pub use file::{get_config_path, MicpostConfig, UploadConfig};
