//! Boundary to the remote generative image service.

mod gemini;
mod instruction;

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::history::Snapshot;

pub use gemini::{GeminiClient, GeminiSettings};
pub use instruction::{EditInstruction, UpscaleFactor};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("request was blocked: {reason}")]
    Blocked { reason: String },
    #[error("the model did not return an image{}", text_suffix(.text))]
    NoImage { text: Option<String> },
    #[error("image generation stopped unexpectedly: {reason}")]
    StoppedEarly { reason: String },
    #[error("service responded with status {status}: {message}")]
    Http { status: u16, message: String },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("malformed service response: {message}")]
    MalformedResponse { message: String },
    #[error("missing API key; set GEMINI_API_KEY or API_KEY")]
    MissingApiKey,
    #[error("generation worker exited before delivering a result")]
    WorkerDisconnected,
}

fn text_suffix(text: &Option<String>) -> String {
    match text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(": {text}"),
        _ => String::new(),
    }
}

pub type AiResult<T> = std::result::Result<T, AiError>;

/// One ordered part of a generation request.
#[derive(Clone, PartialEq, Eq)]
pub enum RequestPart {
    Image {
        bytes: Arc<[u8]>,
        mime_type: String,
    },
    Text(String),
}

impl RequestPart {
    pub fn image(snapshot: &Snapshot) -> Self {
        Self::Image {
            bytes: snapshot.shared_bytes(),
            mime_type: snapshot.mime_type().to_string(),
        }
    }
}

impl fmt::Debug for RequestPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image { bytes, mime_type } => f
                .debug_struct("Image")
                .field("mime_type", mime_type)
                .field("len", &bytes.len())
                .finish(),
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenerationRequest {
    pub parts: Vec<RequestPart>,
}

impl GenerationRequest {
    /// Images first, in order, followed by the instruction text.
    pub fn new(images: &[&Snapshot], instruction: &EditInstruction) -> Self {
        let mut parts = images
            .iter()
            .map(|snapshot| RequestPart::image(snapshot))
            .collect::<Vec<_>>();
        parts.push(RequestPart::Text(instruction.instruction_text()));
        Self { parts }
    }

    pub fn image_count(&self) -> usize {
        self.parts
            .iter()
            .filter(|part| matches!(part, RequestPart::Image { .. }))
            .count()
    }
}

/// Image returned by the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn into_snapshot(self, name: impl Into<String>) -> Snapshot {
        Snapshot::new(self.bytes, self.mime_type, name)
    }
}

/// Remote collaborator that turns images plus an instruction into one image.
pub trait ImageGenerator: Send + Sync {
    fn generate(&self, request: &GenerationRequest) -> AiResult<ImagePayload>;
}

impl<G: ImageGenerator + ?Sized> ImageGenerator for Arc<G> {
    fn generate(&self, request: &GenerationRequest) -> AiResult<ImagePayload> {
        (**self).generate(request)
    }
}
