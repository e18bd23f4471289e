//! Application command handlers for micpost.
//!
//! # Commands
//! - `record`: Interactive (or timed) recording with playback and upload
//! - `upload`: Upload an existing audio file to the configured endpoint
//! - `config`: Open configuration file in user's preferred editor
//! - `logs`: Display recent log entries

pub mod config;
pub mod logs;
pub mod record;
pub mod upload;

pub use config::handle_config;
pub use logs::handle_logs;
pub use record::{handle_record, RecordOptions};
pub use upload::handle_upload;
