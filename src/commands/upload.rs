//! Upload an existing audio file.

use std::path::PathBuf;

use crate::config::MicpostConfig;
use crate::recording::Recording;
use crate::upload::{HttpUploader, Uploader};

/// Uploads a file to the configured endpoint the same way a recording is uploaded.
///
/// The file is sent under the configured field and file name, tagged with the
/// configured MIME type.
///
/// # Errors
/// - If the configuration cannot be loaded
/// - If the file cannot be read
/// - If the upload fails or the endpoint answers with a non-2xx status
pub async fn handle_upload(file: PathBuf, endpoint: Option<String>) -> Result<(), anyhow::Error> {
    tracing::info!("=== micpost Upload Command ===");

    let mut config = MicpostConfig::load()?;
    if let Some(endpoint) = endpoint {
        config.upload.endpoint = endpoint;
    }

    let bytes = std::fs::read(&file)
        .map_err(|e| anyhow::anyhow!("Failed to read audio file {}: {e}", file.display()))?;
    let recording = Recording::new(bytes, config.upload.mime_type.clone());
    if recording.is_empty() {
        return Err(anyhow::anyhow!("Audio file {} is empty", file.display()));
    }

    let uploader = HttpUploader::new(&config.upload);
    tracing::info!(
        "Uploading {} ({} bytes) to {}",
        file.display(),
        recording.len(),
        uploader.endpoint()
    );

    let receipt = uploader.upload(&recording).await.map_err(|e| {
        tracing::error!("Upload failed: {}", e);
        anyhow::anyhow!("Upload failed: {e}")
    })?;

    println!(
        "Uploaded {} bytes to {} (status {})",
        receipt.bytes_sent,
        uploader.endpoint(),
        receipt.status
    );
    Ok(())
}
