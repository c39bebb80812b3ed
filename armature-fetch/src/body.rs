//! Request body model.

use bytes::Bytes;
use futures::stream::BoxStream;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Chunk stream accepted as a streamed request body.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Body of an outgoing request.
#[derive(Clone)]
pub enum RequestBody {
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Bytes(Bytes),
    /// Multipart form.
    Multipart(Vec<FormPart>),
    /// Streamed body whose length is not known up front.
    Stream(StreamBody),
}

impl RequestBody {
    /// Byte length of the body, or `None` for streams.
    pub fn size(&self) -> Option<u64> {
        match self {
            Self::Text(text) => Some(text.len() as u64),
            Self::Bytes(bytes) => Some(bytes.len() as u64),
            Self::Multipart(parts) => Some(parts.iter().map(FormPart::size).sum()),
            Self::Stream(_) => None,
        }
    }

    /// Whether the body can be sent more than once (e.g. across a 307 redirect).
    pub fn is_replayable(&self) -> bool {
        !matches!(self, Self::Stream(_))
    }

    /// Wrap a chunk stream.
    pub fn stream(stream: ByteStream) -> Self {
        Self::Stream(StreamBody::new(stream))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Multipart(parts) => f.debug_tuple("Multipart").field(parts).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<String> for RequestBody {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for RequestBody {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for RequestBody {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(Bytes::from(bytes))
    }
}

impl From<Vec<FormPart>> for RequestBody {
    fn from(parts: Vec<FormPart>) -> Self {
        Self::Multipart(parts)
    }
}

/// One-shot stream body. Clones share the stream; the first consumer takes it.
#[derive(Clone)]
pub struct StreamBody {
    inner: Arc<Mutex<Option<ByteStream>>>,
}

impl StreamBody {
    fn new(stream: ByteStream) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(stream))),
        }
    }

    /// Take the stream out. Returns `None` once consumed.
    pub fn take(&self) -> Option<ByteStream> {
        self.inner.lock().take()
    }
}

/// A named field of a multipart form.
#[derive(Debug, Clone)]
pub struct FormPart {
    /// Field name.
    pub name: String,
    /// Field value.
    pub value: PartValue,
}

/// Value of a multipart field.
#[derive(Debug, Clone)]
pub enum PartValue {
    /// Plain text field.
    Text(String),
    /// File-like field.
    File {
        /// File contents.
        data: Bytes,
        /// Reported file name.
        file_name: Option<String>,
        /// MIME type.
        content_type: Option<String>,
    },
}

impl FormPart {
    /// Create a text field.
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::Text(value.into()),
        }
    }

    /// Create a file field.
    pub fn file(name: impl Into<String>, data: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            value: PartValue::File {
                data: data.into(),
                file_name: None,
                content_type: None,
            },
        }
    }

    /// Set the file name of a file field.
    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        if let PartValue::File { file_name, .. } = &mut self.value {
            *file_name = Some(name.into());
        }
        self
    }

    /// Set the MIME type of a file field.
    pub fn content_type(mut self, mime: impl Into<String>) -> Self {
        if let PartValue::File { content_type, .. } = &mut self.value {
            *content_type = Some(mime.into());
        }
        self
    }

    /// Size of the field value in bytes.
    pub fn size(&self) -> u64 {
        match &self.value {
            PartValue::Text(text) => text.len() as u64,
            PartValue::File { data, .. } => data.len() as u64,
        }
    }
}
