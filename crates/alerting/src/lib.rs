//! Alerting System
//!
//! Voice and sound alert arbitration:
//! - `AlertArbiter` keeps at most one utterance active, queues the rest
//!   (urgent ahead of normal) and advances on speech completion or failure
//! - `SpeechEngine` is the text-to-speech contract; completions come back
//!   through a `CompletionSink` channel
//! - `AlertGate` applies per-kind cooldowns so a persistent risk does not
//!   flood the voice queue

mod arbiter;
mod config;
mod gate;
mod request;
mod speech;

pub use arbiter::{AlertArbiter, ArbiterStats, Submitted};
pub use config::AlertConfig;
pub use gate::{AlertGate, GateState};
pub use request::{AlertRequest, SoundKind, Utterance};
pub use speech::{
    speech_channel, CompletionSink, SpeechEngine, SpeechError, SpeechEvent, SpeechEvents,
    SpeechOutcome,
};

use thiserror::Error;

/// Alerting errors
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("Alert arbiter is shut down")]
    Closed,

    #[error("Speech events already attached")]
    AlreadyAttached,

    #[error("Failed to spawn completion pump: {0}")]
    Spawn(#[from] std::io::Error),
}
