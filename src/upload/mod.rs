//! Upload of finished recordings to an HTTP endpoint.
//!
//! A recording is sent as a single multipart/form-data POST with one file part.
//! No authentication is performed and the response body is never read; only the
//! status code is inspected to report the outcome.

use thiserror::Error;

use crate::config::UploadConfig;
use crate::recording::Recording;

/// Successful upload outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadReceipt {
    /// HTTP status code returned by the endpoint
    pub status: u16,
    /// Size of the uploaded recording in bytes
    pub bytes_sent: usize,
}

/// Reasons an upload did not complete with a 2xx response.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Failed to connect to upload endpoint {endpoint}: {reason}")]
    Connect { endpoint: String, reason: String },

    #[error("Upload endpoint responded with status {status}")]
    Status { status: u16 },

    #[error("Upload request failed: {0}")]
    Request(String),

    #[error("Invalid MIME type for upload: {0}")]
    InvalidMime(String),
}

/// Destination for finished recordings.
#[allow(async_fn_in_trait)]
pub trait Uploader {
    /// Sends one recording.
    ///
    /// # Errors
    /// - If the endpoint cannot be reached
    /// - If the endpoint answers with a non-2xx status
    async fn upload(&self, recording: &Recording) -> Result<UploadReceipt, UploadError>;
}

/// Uploads recordings with reqwest as multipart form data.
pub struct HttpUploader {
    client: reqwest::Client,
    endpoint: String,
    field_name: String,
    file_name: String,
}

impl HttpUploader {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            field_name: config.field_name.clone(),
            file_name: config.file_name.clone(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Uploader for HttpUploader {
    async fn upload(&self, recording: &Recording) -> Result<UploadReceipt, UploadError> {
        let file_part = reqwest::multipart::Part::bytes(recording.bytes().to_vec())
            .file_name(self.file_name.clone())
            .mime_str(recording.mime_type())
            .map_err(|_| UploadError::InvalidMime(recording.mime_type().to_string()))?;

        let form = reqwest::multipart::Form::new().part(self.field_name.clone(), file_part);

        tracing::debug!(
            "Upload:\n  URL: {}\n  Method: POST\n  Field: {} ({}, {}, {} bytes)",
            self.endpoint,
            self.field_name,
            self.file_name,
            recording.mime_type(),
            recording.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    UploadError::Connect {
                        endpoint: self.endpoint.clone(),
                        reason: e.to_string(),
                    }
                } else {
                    UploadError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(UploadError::Status {
                status: status.as_u16(),
            });
        }

        Ok(UploadReceipt {
            status: status.as_u16(),
            bytes_sent: recording.len(),
        })
    }
}

#[cfg(test)]
pub(crate) mod test_server {
    //! Minimal multipart endpoint for exercising uploads.

    use axum::extract::{Multipart, State};
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    /// One multipart field as received by the server.
    #[derive(Debug, Clone)]
    pub struct ReceivedField {
        pub name: Option<String>,
        pub file_name: Option<String>,
        pub content_type: Option<String>,
        pub bytes: Vec<u8>,
    }

    #[derive(Clone)]
    struct ServerState {
        requests: Arc<Mutex<Vec<Vec<ReceivedField>>>>,
        status: StatusCode,
    }

    /// Handle to a running server; each entry of `requests` is one POST.
    pub struct TestServer {
        pub addr: SocketAddr,
        pub requests: Arc<Mutex<Vec<Vec<ReceivedField>>>>,
    }

    impl TestServer {
        pub fn url(&self) -> String {
            format!("http://{}/upload", self.addr)
        }

        pub fn requests(&self) -> Vec<Vec<ReceivedField>> {
            self.requests.lock().unwrap().clone()
        }
    }

    async fn receive(
        State(state): State<ServerState>,
        mut multipart: Multipart,
    ) -> StatusCode {
        let mut fields = Vec::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().map(str::to_owned);
            let file_name = field.file_name().map(str::to_owned);
            let content_type = field.content_type().map(str::to_owned);
            let bytes = field.bytes().await.unwrap().to_vec();
            fields.push(ReceivedField {
                name,
                file_name,
                content_type,
                bytes,
            });
        }
        state.requests.lock().unwrap().push(fields);
        state.status
    }

    /// Starts a server on an ephemeral port that answers every upload with `status`.
    pub async fn spawn(status: StatusCode) -> TestServer {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = ServerState {
            requests: Arc::clone(&requests),
            status,
        };
        let app = Router::new()
            .route("/upload", post(receive))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        TestServer { addr, requests }
    }
}

#[cfg(test)]
mod tests {
    use super::test_server;
    use super::*;
    use axum::http::StatusCode;

    fn uploader_for(endpoint: String) -> HttpUploader {
        HttpUploader::new(&UploadConfig {
            endpoint,
            ..UploadConfig::default()
        })
    }

    #[tokio::test]
    async fn test_upload_sends_single_audio_field() {
        let server = test_server::spawn(StatusCode::OK).await;
        let uploader = uploader_for(server.url());
        let recording = Recording::new(vec![0x00, 0x01, 0x02, 0x03], "audio/wav");

        let receipt = uploader.upload(&recording).await.unwrap();
        assert_eq!(receipt.status, 200);
        assert_eq!(receipt.bytes_sent, 4);

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        let fields = &requests[0];
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].name.as_deref(), Some("audio"));
        assert_eq!(fields[0].file_name.as_deref(), Some("recording.wav"));
        assert_eq!(fields[0].content_type.as_deref(), Some("audio/wav"));
        assert_eq!(fields[0].bytes, vec![0x00, 0x01, 0x02, 0x03]);
    }

    #[tokio::test]
    async fn test_non_success_status_is_reported() {
        let server = test_server::spawn(StatusCode::INTERNAL_SERVER_ERROR).await;
        let uploader = uploader_for(server.url());
        let recording = Recording::new(vec![1, 2, 3], "audio/wav");

        let err = uploader.upload(&recording).await.unwrap_err();
        assert!(matches!(err, UploadError::Status { status: 500 }));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_a_connect_error() {
        // Bind then drop to get a port nothing listens on
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let uploader = uploader_for(format!("http://{addr}/upload"));
        let recording = Recording::new(vec![1], "audio/wav");

        let err = uploader.upload(&recording).await.unwrap_err();
        assert!(matches!(err, UploadError::Connect { .. }));
    }

    #[tokio::test]
    async fn test_connection_dropped_by_endpoint_is_a_request_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            // Accept, then hang up without answering
            if let Ok((socket, _)) = listener.accept().await {
                drop(socket);
            }
        });

        let uploader = uploader_for(format!("http://{addr}/upload"));
        let recording = Recording::new(vec![1, 2], "audio/wav");

        let err = uploader.upload(&recording).await.unwrap_err();
        assert!(matches!(err, UploadError::Request(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn test_invalid_mime_is_rejected_before_sending() {
        let uploader = uploader_for("http://127.0.0.1:9/upload".to_string());
        let recording = Recording::new(vec![1], "not a mime type");

        let err = uploader.upload(&recording).await.unwrap_err();
        assert!(matches!(err, UploadError::InvalidMime(_)));
    }
}
