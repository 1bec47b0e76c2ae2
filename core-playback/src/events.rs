//! Player-facing event set.
//!
//! All outbound notifications are plain-data enum values distributed
//! through an [`EventRegistry`](core_runtime::events::EventRegistry) keyed
//! by [`PlayerEventKind`].

use crate::error::ErrorCode;
use crate::state::PlayerState;
use crate::types::QualityLevel;
use core_runtime::events::Event;
use serde::{Deserialize, Serialize};

/// Everything the player emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "lowercase")]
pub enum PlayerEvent {
    // Lifecycle
    LoadStart,
    LoadedMetadata { duration: f64 },
    CanPlay,

    // Transport
    Play,
    Playing,
    Pause,
    Ended,
    Stop,

    // Time
    TimeUpdate { position: f64 },
    DurationChange { duration: f64 },
    Seeking { position: f64 },
    Seeked { position: f64 },

    // Buffering
    Waiting,
    Buffered,
    Progress,

    // State
    StateChange { from: PlayerState, to: PlayerState },

    // Volume / rate / loop
    VolumeChange { volume: f32, muted: bool },
    RateChange { rate: f32 },
    LoopChange { looping: bool },

    // Quality
    QualitiesAvailable { levels: Vec<QualityLevel> },
    QualityChange { index: usize },

    // Failure
    Error { code: ErrorCode, message: String },

    // Teardown
    Dispose,
}

/// Discriminant used for listener filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerEventKind {
    LoadStart,
    LoadedMetadata,
    CanPlay,
    Play,
    Playing,
    Pause,
    Ended,
    Stop,
    TimeUpdate,
    DurationChange,
    Seeking,
    Seeked,
    Waiting,
    Buffered,
    Progress,
    StateChange,
    VolumeChange,
    RateChange,
    LoopChange,
    QualitiesAvailable,
    QualityChange,
    Error,
    Dispose,
}

impl Event for PlayerEvent {
    type Tag = PlayerEventKind;

    fn tag(&self) -> PlayerEventKind {
        match self {
            PlayerEvent::LoadStart => PlayerEventKind::LoadStart,
            PlayerEvent::LoadedMetadata { .. } => PlayerEventKind::LoadedMetadata,
            PlayerEvent::CanPlay => PlayerEventKind::CanPlay,
            PlayerEvent::Play => PlayerEventKind::Play,
            PlayerEvent::Playing => PlayerEventKind::Playing,
            PlayerEvent::Pause => PlayerEventKind::Pause,
            PlayerEvent::Ended => PlayerEventKind::Ended,
            PlayerEvent::Stop => PlayerEventKind::Stop,
            PlayerEvent::TimeUpdate { .. } => PlayerEventKind::TimeUpdate,
            PlayerEvent::DurationChange { .. } => PlayerEventKind::DurationChange,
            PlayerEvent::Seeking { .. } => PlayerEventKind::Seeking,
            PlayerEvent::Seeked { .. } => PlayerEventKind::Seeked,
            PlayerEvent::Waiting => PlayerEventKind::Waiting,
            PlayerEvent::Buffered => PlayerEventKind::Buffered,
            PlayerEvent::Progress => PlayerEventKind::Progress,
            PlayerEvent::StateChange { .. } => PlayerEventKind::StateChange,
            PlayerEvent::VolumeChange { .. } => PlayerEventKind::VolumeChange,
            PlayerEvent::RateChange { .. } => PlayerEventKind::RateChange,
            PlayerEvent::LoopChange { .. } => PlayerEventKind::LoopChange,
            PlayerEvent::QualitiesAvailable { .. } => PlayerEventKind::QualitiesAvailable,
            PlayerEvent::QualityChange { .. } => PlayerEventKind::QualityChange,
            PlayerEvent::Error { .. } => PlayerEventKind::Error,
            PlayerEvent::Dispose => PlayerEventKind::Dispose,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tags_match_variants() {
        assert_eq!(PlayerEvent::LoadStart.tag(), PlayerEventKind::LoadStart);
        assert_eq!(
            PlayerEvent::TimeUpdate { position: 1.5 }.tag(),
            PlayerEventKind::TimeUpdate
        );
        assert_eq!(
            PlayerEvent::Error {
                code: ErrorCode::LoadNetwork,
                message: "offline".into()
            }
            .tag(),
            PlayerEventKind::Error
        );
    }

    #[test]
    fn events_serialize_with_a_tag_field() {
        let event = PlayerEvent::VolumeChange {
            volume: 0.5,
            muted: false,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event\":\"volumechange\""));

        let back: PlayerEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
