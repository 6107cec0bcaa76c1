//! Speech engine for hosts without a synthesizer: utterances are logged and
//! reported complete after a duration proportional to their length.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alerting::{CompletionSink, SoundKind, SpeechEngine, SpeechError, Utterance};
use tokio::runtime::Handle;
use tracing::{debug, info};

pub struct TracingSpeechEngine {
    sink: CompletionSink,
    runtime: Handle,
    ms_per_char: u64,
    /// Bumped by `stop`; completions from an older generation are discarded
    generation: Arc<AtomicU64>,
}

impl TracingSpeechEngine {
    pub fn new(sink: CompletionSink, runtime: Handle, ms_per_char: u64) -> Self {
        Self {
            sink,
            runtime,
            ms_per_char,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn duration_of(&self, utterance: &Utterance) -> Duration {
        let chars = utterance.text.chars().count() as f64;
        let rate = f64::from(utterance.rate).max(0.1);
        Duration::from_millis((chars * self.ms_per_char as f64 / rate) as u64)
    }
}

impl SpeechEngine for TracingSpeechEngine {
    fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
        info!(
            utterance = utterance.id,
            urgent = utterance.urgent,
            rate = utterance.rate,
            volume = utterance.volume,
            "Speaking: {}",
            utterance.text
        );

        let id = utterance.id;
        let duration = self.duration_of(utterance);
        let sink = self.sink.clone();
        let generation = self.generation.clone();
        let started = generation.load(Ordering::Acquire);

        self.runtime.spawn(async move {
            tokio::time::sleep(duration).await;
            if generation.load(Ordering::Acquire) == started {
                sink.done(id);
            } else {
                debug!("Utterance {} stopped", id);
            }
        });
        Ok(())
    }

    fn play_sound(&self, kind: SoundKind) {
        info!(sound = kind.as_str(), "Playing alert sound");
    }

    fn stop(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        debug!("Speech stopped");
    }
}
