//! Audio capture capability
//!
//! Device APIs are an external collaborator: the core only needs
//! "start capturing" and "stop, give me the blob". Platform layers provide
//! the implementation; tests use fakes.

use async_trait::async_trait;
use roomtone_common::Result;

/// A captured audio blob ready for upload
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub bytes: Vec<u8>,
    /// MIME type sent with the multipart upload
    pub mime: String,
}

impl AudioClip {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            mime: "audio/mp4".to_string(),
        }
    }
}

/// Capture device boundary
///
/// `start` failing leaves the device idle; `stop` without a prior successful
/// `start` is an error. Both map to `Error::Capture`.
#[async_trait]
pub trait AudioRecorder: Send + Sync {
    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<AudioClip>;
}
