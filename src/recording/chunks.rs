//! Chunk buffer and the assembled recording.
//!
//! Chunks are opaque byte segments delivered by the capture backend. They are
//! kept in arrival order and concatenated into a single [`Recording`] once the
//! capture stream finalizes.

/// Ordered, append-only buffer of captured chunks for one session.
#[derive(Debug, Default)]
pub struct ChunkBuffer {
    chunks: Vec<Vec<u8>>,
    byte_len: usize,
}

impl ChunkBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk after all previously received chunks.
    pub fn push(&mut self, chunk: Vec<u8>) {
        self.byte_len += chunk.len();
        self.chunks.push(chunk);
    }

    /// Number of chunks received.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Total number of bytes across all chunks.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drops every buffered chunk.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.byte_len = 0;
    }

    /// Concatenates the buffered chunks in arrival order into one recording.
    ///
    /// The buffer itself is left untouched; the caller clears it once the
    /// recording has been handed off.
    pub fn assemble(&self, mime_type: &str) -> Recording {
        let mut bytes = Vec::with_capacity(self.byte_len);
        for chunk in &self.chunks {
            bytes.extend_from_slice(chunk);
        }
        Recording::new(bytes, mime_type)
    }
}

/// A finished recording: the assembled bytes tagged with their MIME type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recording {
    bytes: Vec<u8>,
    mime_type: String,
}

impl Recording {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assemble_preserves_arrival_order() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(b"\x00\x01".to_vec());
        buffer.push(b"\x02\x03".to_vec());
        buffer.push(b"\x04".to_vec());

        let recording = buffer.assemble("audio/wav");
        assert_eq!(recording.bytes(), b"\x00\x01\x02\x03\x04");
        assert_eq!(recording.mime_type(), "audio/wav");
        assert_eq!(recording.len(), 5);
    }

    #[test]
    fn test_empty_chunks_contribute_nothing() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(Vec::new());
        buffer.push(vec![7, 8]);
        buffer.push(Vec::new());

        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.byte_len(), 2);
        assert_eq!(buffer.assemble("audio/wav").bytes(), &[7, 8]);
    }

    #[test]
    fn test_clear_resets_counters() {
        let mut buffer = ChunkBuffer::new();
        buffer.push(vec![1, 2, 3]);
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.byte_len(), 0);
        assert!(buffer.assemble("audio/wav").is_empty());
    }
}
