//! Speech engine contract and completion channel

use thiserror::Error;
use tokio::sync::mpsc;

use crate::request::{SoundKind, Utterance};

/// Speech engine errors
#[derive(Debug, Clone, Error)]
pub enum SpeechError {
    #[error("Speech engine not ready")]
    NotReady,

    #[error("Speech engine error: {0}")]
    Engine(String),
}

/// Text-to-speech backend.
///
/// `speak` starts an utterance and returns; the end of the utterance (normal
/// or failed) is reported later through the engine's `CompletionSink`.
/// An engine still initializing returns `SpeechError::NotReady` and calls
/// `CompletionSink::ready` once it can speak.
pub trait SpeechEngine: Send + Sync {
    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Fire-and-forget sound effect
    fn play_sound(&self, kind: SoundKind);

    /// Cancel the in-flight utterance, if any
    fn stop(&self);
}

/// How an utterance ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechOutcome {
    Done,
    Error(String),
}

/// Completion report for one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechEvent {
    pub utterance_id: u64,
    pub outcome: SpeechOutcome,
}

#[derive(Debug)]
pub(crate) enum Signal {
    Event(SpeechEvent),
    Ready,
    Close,
}

/// Producer side of the completion channel, held by the speech engine
#[derive(Debug, Clone)]
pub struct CompletionSink {
    tx: mpsc::UnboundedSender<Signal>,
}

impl CompletionSink {
    /// Report that an utterance finished. Returns false once the arbiter is gone.
    pub fn done(&self, utterance_id: u64) -> bool {
        self.report(SpeechEvent {
            utterance_id,
            outcome: SpeechOutcome::Done,
        })
    }

    /// Report that an utterance failed
    pub fn error(&self, utterance_id: u64, reason: impl Into<String>) -> bool {
        self.report(SpeechEvent {
            utterance_id,
            outcome: SpeechOutcome::Error(reason.into()),
        })
    }

    /// Report that the engine finished initializing; held alerts are retried
    pub fn ready(&self) -> bool {
        self.tx.send(Signal::Ready).is_ok()
    }

    pub fn report(&self, event: SpeechEvent) -> bool {
        self.tx.send(Signal::Event(event)).is_ok()
    }
}

/// Consumer side of the completion channel, attached to an `AlertArbiter`
pub struct SpeechEvents {
    pub(crate) rx: mpsc::UnboundedReceiver<Signal>,
    pub(crate) closer: mpsc::UnboundedSender<Signal>,
}

/// Create the completion channel shared by a speech engine and its arbiter
pub fn speech_channel() -> (CompletionSink, SpeechEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    let sink = CompletionSink { tx: tx.clone() };
    (sink, SpeechEvents { rx, closer: tx })
}
