//! Alert requests and speech parameters

use serde::{Deserialize, Serialize};

/// Short sound effect played ahead of an alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundKind {
    SpeedLimit,
    LaneDeparture,
    Collision,
}

impl SoundKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SoundKind::SpeedLimit => "speed_limit",
            SoundKind::LaneDeparture => "lane_departure",
            SoundKind::Collision => "collision",
        }
    }
}

/// A message to be spoken
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRequest {
    pub message: String,
    pub sound: Option<SoundKind>,
    pub urgent: bool,
}

impl AlertRequest {
    pub fn normal(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sound: None,
            urgent: false,
        }
    }

    pub fn urgent(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sound: None,
            urgent: true,
        }
    }

    pub fn with_sound(mut self, sound: SoundKind) -> Self {
        self.sound = Some(sound);
        self
    }
}

/// Speech command handed to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    /// Identifier echoed back in the completion event
    pub id: u64,
    pub text: String,
    pub rate: f32,
    pub volume: f32,
    pub urgent: bool,
}
