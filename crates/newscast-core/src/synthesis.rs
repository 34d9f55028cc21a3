//! Text-to-speech synthesis plan types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum characters of cleaned text per synthesis unit.
pub const MAX_UNIT_CHARS: usize = 4000;

/// Narration role, mapped to a concrete provider voice by the planner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceRole {
    Host,
    Analyst,
    Stinger,
}

impl VoiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Host => "host",
            Self::Analyst => "analyst",
            Self::Stinger => "stinger",
        }
    }
}

/// One voice+text chunk sent to the TTS provider. The atomic unit of audio
/// generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisUnit {
    pub id: Uuid,
    pub role: VoiceRole,
    /// Opaque provider voice identifier.
    pub voice: String,
    /// Cleaned narration text: no parenthetical stage directions, pause
    /// markers mapped to ellipses, single-spaced.
    pub text: String,
    /// Rough spoken duration used for progress accounting.
    pub duration_sec_estimate: f64,
    /// Playback speed in [0.85, 1.05].
    pub speed: f32,
}

/// Ordered synthesis units for one episode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisPlan {
    pub units: Vec<SynthesisUnit>,
}

impl SynthesisPlan {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Sum of per-unit duration estimates, in seconds.
    pub fn estimated_duration_sec(&self) -> f64 {
        self.units.iter().map(|u| u.duration_sec_estimate).sum()
    }
}
