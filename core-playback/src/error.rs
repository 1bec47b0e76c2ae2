//! # Playback Error Types
//!
//! Error taxonomy for the playback engine, grouped by phase.

use bridge_traits::error::BridgeError;
use bridge_traits::stream::AdaptiveErrorKind;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Flat error code surfaced on `error` events, grouped by phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    LoadAborted,
    LoadNetwork,
    LoadDecode,
    LoadNotSupported,
    PlaybackNotAllowed,
    PlaybackFailed,
    StreamFatal,
    StreamNetwork,
    StreamMedia,
    Unknown,
}

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone)]
pub enum PlayerError {
    // ========================================================================
    // Load Phase
    // ========================================================================
    /// The operation was cancelled. Not a failure: a superseded load returns
    /// this without surfacing an `error` event.
    #[error("Operation aborted")]
    Aborted,

    /// Fetch or stream-layer fault while acquiring the source.
    #[error("Network failure: {0}")]
    Network(String),

    /// Codec/demux fault while preparing the source.
    #[error("Decode failure: {0}")]
    Decode(String),

    /// No loader is available for the described source.
    #[error("Unsupported source: {0}")]
    Unsupported(String),

    // ========================================================================
    // Playback Phase
    // ========================================================================
    /// The render device refused to start (e.g. no user gesture yet).
    #[error("Playback not allowed: {0}")]
    PlaybackRejected(String),

    /// A playback operation failed.
    #[error("Playback failed: {0}")]
    PlaybackFailed(String),

    /// The adaptive-streaming engine reported a fault mid-stream.
    #[error("Stream fault ({kind:?}): {message}")]
    Stream {
        kind: AdaptiveErrorKind,
        fatal: bool,
        message: String,
    },

    // ========================================================================
    // Caller Errors
    // ========================================================================
    /// A bad argument, rejected synchronously with no state change.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// Internal error (should not occur in normal operation).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PlayerError {
    /// Map onto the flat event error code.
    pub fn code(&self) -> ErrorCode {
        match self {
            PlayerError::Aborted => ErrorCode::LoadAborted,
            PlayerError::Network(_) => ErrorCode::LoadNetwork,
            PlayerError::Decode(_) => ErrorCode::LoadDecode,
            PlayerError::Unsupported(_) => ErrorCode::LoadNotSupported,
            PlayerError::PlaybackRejected(_) => ErrorCode::PlaybackNotAllowed,
            PlayerError::PlaybackFailed(_) => ErrorCode::PlaybackFailed,
            PlayerError::Stream { kind, fatal, .. } => match (fatal, kind) {
                (false, AdaptiveErrorKind::Network) => ErrorCode::StreamNetwork,
                (false, AdaptiveErrorKind::Media) => ErrorCode::StreamMedia,
                (_, _) => ErrorCode::StreamFatal,
            },
            PlayerError::InvalidArgument(_) => ErrorCode::Unknown,
            PlayerError::Internal(_) => ErrorCode::Unknown,
        }
    }

    /// Returns `true` for cancellation, which is surfaced silently.
    pub fn is_abort(&self) -> bool {
        matches!(self, PlayerError::Aborted)
    }

    /// Classify a bridge fault raised during the load phase.
    pub fn from_load_fault(err: BridgeError) -> Self {
        match err {
            BridgeError::Network(message) => PlayerError::Network(message),
            BridgeError::Decode(message) => PlayerError::Decode(message),
            BridgeError::NotAvailable(message) => PlayerError::Unsupported(message),
            BridgeError::NotAllowed(message) => PlayerError::PlaybackRejected(message),
            BridgeError::Io(err) => PlayerError::Network(err.to_string()),
            other => PlayerError::Internal(other.to_string()),
        }
    }

    /// Classify a bridge fault raised while starting or driving playback.
    pub fn from_playback_fault(err: BridgeError) -> Self {
        match err {
            BridgeError::NotAllowed(message) => PlayerError::PlaybackRejected(message),
            BridgeError::Decode(message) => PlayerError::Decode(message),
            BridgeError::Network(message) => PlayerError::Network(message),
            other => PlayerError::PlaybackFailed(other.to_string()),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlayerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_follow_phase_grouping() {
        assert_eq!(PlayerError::Aborted.code(), ErrorCode::LoadAborted);
        assert_eq!(
            PlayerError::Network("dns".into()).code(),
            ErrorCode::LoadNetwork
        );
        assert_eq!(
            PlayerError::Decode("bad frame".into()).code(),
            ErrorCode::LoadDecode
        );
        assert_eq!(
            PlayerError::Unsupported("dash".into()).code(),
            ErrorCode::LoadNotSupported
        );
        assert_eq!(
            PlayerError::PlaybackRejected("gesture".into()).code(),
            ErrorCode::PlaybackNotAllowed
        );
    }

    #[test]
    fn stream_faults_split_by_fatality_and_kind() {
        let fatal = PlayerError::Stream {
            kind: AdaptiveErrorKind::Network,
            fatal: true,
            message: "manifest".into(),
        };
        assert_eq!(fatal.code(), ErrorCode::StreamFatal);

        let network = PlayerError::Stream {
            kind: AdaptiveErrorKind::Network,
            fatal: false,
            message: "segment".into(),
        };
        assert_eq!(network.code(), ErrorCode::StreamNetwork);

        let media = PlayerError::Stream {
            kind: AdaptiveErrorKind::Media,
            fatal: false,
            message: "append".into(),
        };
        assert_eq!(media.code(), ErrorCode::StreamMedia);
    }

    #[test]
    fn bridge_faults_map_to_taxonomy() {
        let err = PlayerError::from_load_fault(BridgeError::Network("offline".into()));
        assert!(matches!(err, PlayerError::Network(_)));

        let err = PlayerError::from_playback_fault(BridgeError::NotAllowed("autoplay".into()));
        assert!(matches!(err, PlayerError::PlaybackRejected(_)));
    }

    #[test]
    fn abort_is_not_a_failure() {
        assert!(PlayerError::Aborted.is_abort());
        assert!(!PlayerError::Network("x".into()).is_abort());
    }
}
