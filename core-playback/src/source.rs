//! Source descriptors and kind detection.
//!
//! A [`SourceDescriptor`] is the caller's description of what to play:
//! a remote URL, an in-memory payload, or a byte stream, optionally
//! annotated with format/type hints and request headers. Classification
//! into a [`SourceKind`] is derived, never stored: the explicit type hint
//! wins, then the URL suffix or format hint, then the runtime type of the
//! raw data. Unresolvable descriptors fall back to `Native`; only a hint
//! that explicitly names an unimplemented protocol (a DASH manifest)
//! classifies as `Unsupported`.

use bytes::Bytes;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::io::AsyncRead;

/// Reader type carried by streamed raw data.
pub type ByteStreamReader = Box<dyn AsyncRead + Send + Unpin>;

/// A take-once async byte stream.
///
/// The reader is consumed by the first loader that drains it; the
/// descriptor itself stays immutable.
pub struct ByteStream {
    reader: Mutex<Option<ByteStreamReader>>,
}

impl ByteStream {
    pub fn new(reader: ByteStreamReader) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
        }
    }

    /// Take the underlying reader. Returns `None` if already consumed.
    pub fn take(&self) -> Option<ByteStreamReader> {
        self.reader.lock().take()
    }

    /// Whether the reader is still available.
    pub fn is_available(&self) -> bool {
        self.reader.lock().is_some()
    }
}

impl std::fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ByteStream")
            .field("available", &self.is_available())
            .finish()
    }
}

/// Raw audio payload supplied in place of a URL.
#[derive(Debug)]
pub enum RawData {
    /// File-like payload with an optional content type.
    Blob {
        data: Bytes,
        content_type: Option<String>,
    },
    /// Plain byte buffer.
    Buffer(Bytes),
    /// Asynchronous byte stream, drained once at load time.
    Stream(ByteStream),
}

/// Caller-facing description of an audio source.
///
/// Exactly one of `url`/`data` is expected to be meaningful; a descriptor
/// with neither is invalid.
#[derive(Debug, Default)]
pub struct SourceDescriptor {
    /// Remote URL (http(s), or anything the host element can play).
    pub url: Option<String>,
    /// In-memory payload.
    pub data: Option<RawData>,
    /// Container/format hint, e.g. `"mp3"` or `"flac"`.
    pub format_hint: Option<String>,
    /// Explicit type hint (MIME type or extension). Authoritative when
    /// present.
    pub type_hint: Option<String>,
    /// Extra HTTP headers for URL fetches.
    pub headers: HashMap<String, String>,
}

impl SourceDescriptor {
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Default::default()
        }
    }

    pub fn from_bytes(data: Bytes) -> Self {
        Self {
            data: Some(RawData::Buffer(data)),
            ..Default::default()
        }
    }

    pub fn from_blob(data: Bytes, content_type: Option<String>) -> Self {
        Self {
            data: Some(RawData::Blob { data, content_type }),
            ..Default::default()
        }
    }

    pub fn from_stream(reader: ByteStreamReader) -> Self {
        Self {
            data: Some(RawData::Stream(ByteStream::new(reader))),
            ..Default::default()
        }
    }

    pub fn with_format_hint(mut self, hint: impl Into<String>) -> Self {
        self.format_hint = Some(hint.into());
        self
    }

    pub fn with_type_hint(mut self, hint: impl Into<String>) -> Self {
        self.type_hint = Some(hint.into());
        self
    }

    pub fn with_headers(mut self, headers: HashMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Returns `true` when the descriptor names something loadable.
    pub fn is_meaningful(&self) -> bool {
        self.url.is_some() || self.data.is_some()
    }

    /// Best available format hint: explicit type hint, then format hint,
    /// then the URL extension.
    pub fn effective_hint(&self) -> Option<String> {
        if let Some(hint) = &self.type_hint {
            return Some(hint.clone());
        }
        if let Some(hint) = &self.format_hint {
            return Some(hint.clone());
        }
        if let Some(RawData::Blob {
            content_type: Some(ct),
            ..
        }) = self.data.as_ref()
        {
            return Some(ct.clone());
        }
        self.url.as_deref().and_then(url_extension)
    }
}

/// Derived classification of a source descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    /// Host-native format: playable by the element, decodable by the device.
    Native,
    /// Adaptive-streaming manifest handled by the external engine.
    AdaptiveStream,
    /// Container the host cannot decode; goes through the codec bridge.
    DecodeNeeded,
    /// Raw in-memory payload.
    Buffer,
    /// Explicitly named but unimplemented protocol.
    Unsupported,
}

/// Lower-cased file extension of a URL, ignoring query/fragment parts.
fn url_extension(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let last_segment = path.rsplit('/').next().unwrap_or(path);
    let (stem, ext) = last_segment.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Classify a hint string (MIME type or bare extension).
fn classify_hint(hint: &str) -> Option<SourceKind> {
    let hint = hint.trim().to_ascii_lowercase();
    // MIME parameters ("application/x-mpegurl; charset=utf-8") are ignored.
    let hint = hint.split(';').next().unwrap_or(&hint).trim().to_string();

    match hint.as_str() {
        "application/vnd.apple.mpegurl" | "application/x-mpegurl" | "audio/mpegurl"
        | "audio/x-mpegurl" | "m3u8" | "m3u" => Some(SourceKind::AdaptiveStream),
        "application/dash+xml" | "mpd" => Some(SourceKind::Unsupported),
        "audio/flac" | "audio/x-flac" | "flac" | "audio/x-ape" | "ape" | "audio/x-wavpack"
        | "wv" | "audio/x-tta" | "tta" => Some(SourceKind::DecodeNeeded),
        "audio/mpeg" | "audio/mp3" | "mp3" | "audio/wav" | "audio/x-wav" | "wav" | "audio/mp4"
        | "m4a" | "mp4" | "audio/aac" | "aac" | "audio/ogg" | "application/ogg" | "ogg" | "oga"
        | "opus" | "audio/webm" | "webm" => Some(SourceKind::Native),
        _ => None,
    }
}

/// Compute the [`SourceKind`] of a descriptor.
///
/// Precedence: explicit `type_hint` > URL suffix / `format_hint` > raw-data
/// runtime type > `Native`.
pub fn classify(descriptor: &SourceDescriptor) -> SourceKind {
    if let Some(hint) = &descriptor.type_hint {
        if let Some(kind) = classify_hint(hint) {
            return kind;
        }
    }

    if let Some(url) = &descriptor.url {
        if let Some(ext) = url_extension(url) {
            if let Some(kind) = classify_hint(&ext) {
                return kind;
            }
        }
    }

    if let Some(hint) = &descriptor.format_hint {
        if let Some(kind) = classify_hint(hint) {
            return kind;
        }
    }

    match &descriptor.data {
        Some(RawData::Blob { content_type, .. }) => content_type
            .as_deref()
            .and_then(classify_hint)
            .unwrap_or(SourceKind::Buffer),
        Some(RawData::Buffer(_)) | Some(RawData::Stream(_)) => SourceKind::Buffer,
        // Last-resort default; never Unsupported without an explicit hint.
        None => SourceKind::Native,
    }
}
