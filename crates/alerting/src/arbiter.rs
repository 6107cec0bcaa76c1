//! Alert Arbiter Implementation
//!
//! State machine over the speaking slot and the pending queue:
//! - `Idle` + submit: the request is spoken immediately
//! - `Speaking` + submit(urgent): queued ahead of every normal entry; the
//!   active utterance is never interrupted
//! - `Speaking` + submit(normal): appended FIFO
//! - `Speaking` + completion (done or failed): next entry is spoken, or `Idle`
//! - engine not ready: the entry goes back to the head of its queue and the
//!   arbiter idles until the engine reports ready or the next submit
//!
//! All transitions happen under one lock. Engine calls happen outside it, so
//! an engine may report completion from any thread, including synchronously.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::{self, JoinHandle};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::AlertConfig;
use crate::request::{AlertRequest, Utterance};
use crate::speech::{Signal, SpeechEngine, SpeechError, SpeechEvent, SpeechEvents, SpeechOutcome};
use crate::AlertError;

/// What happened to a submitted request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submitted {
    /// Handed to the engine at once (arbiter was idle)
    Started,
    /// Waiting for the active utterance to finish
    Queued,
    /// Queue full of urgent entries, normal request discarded
    Dropped,
    /// Arbiter is shut down
    Closed,
}

/// Arbiter counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct ArbiterStats {
    pub spoken: u64,
    pub failed: u64,
    pub dropped: u64,
}

#[derive(Default)]
struct SpeakState {
    /// Active utterance id
    active: Option<u64>,
    urgent: VecDeque<AlertRequest>,
    normal: VecDeque<AlertRequest>,
    next_id: u64,
    closed: bool,
}

impl SpeakState {
    fn pending_len(&self) -> usize {
        self.urgent.len() + self.normal.len()
    }

    fn begin(&mut self, request: AlertRequest) -> Dispatch {
        self.next_id += 1;
        self.active = Some(self.next_id);
        Dispatch {
            id: self.next_id,
            request,
        }
    }

    fn begin_next(&mut self) -> Option<Dispatch> {
        let request = self.urgent.pop_front().or_else(|| self.normal.pop_front())?;
        Some(self.begin(request))
    }
}

struct Dispatch {
    id: u64,
    request: AlertRequest,
}

struct Pump {
    handle: JoinHandle<()>,
    closer: mpsc::UnboundedSender<Signal>,
}

/// Owner of the single-active-utterance invariant
pub struct AlertArbiter {
    config: AlertConfig,
    engine: Arc<dyn SpeechEngine>,
    state: Mutex<SpeakState>,
    pump: Mutex<Option<Pump>>,
    spoken: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

impl AlertArbiter {
    /// Create a new arbiter speaking through `engine`
    pub fn new(config: AlertConfig, engine: Arc<dyn SpeechEngine>) -> Self {
        let config = AlertConfig {
            max_pending: config.max_pending.max(1),
            ..config
        };
        info!("Creating alert arbiter with config: {:?}", config);
        Self {
            config,
            engine,
            state: Mutex::new(SpeakState::default()),
            pump: Mutex::new(None),
            spoken: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Drain speech completion events on a dedicated thread
    pub fn attach(self: &Arc<Self>, events: SpeechEvents) -> Result<(), AlertError> {
        let mut pump = self.pump.lock();
        if pump.is_some() {
            return Err(AlertError::AlreadyAttached);
        }
        if self.state.lock().closed {
            return Err(AlertError::Closed);
        }

        let SpeechEvents { mut rx, closer } = events;
        let arbiter = Arc::downgrade(self);
        let handle = thread::Builder::new()
            .name("speech-completion".to_string())
            .spawn(move || run_pump(arbiter, &mut rx))?;

        *pump = Some(Pump { handle, closer });
        debug!("Speech completion pump attached");
        Ok(())
    }

    /// Submit an alert for speaking
    pub fn submit(&self, request: AlertRequest) -> Submitted {
        let dispatch = {
            let mut state = self.state.lock();
            if state.closed {
                debug!("Alert '{}' submitted after shutdown", request.message);
                return Submitted::Closed;
            }
            if state.active.is_some() {
                return self.enqueue(&mut state, request);
            }
            // alerts held for an unready engine keep their place
            let jumps_queue = request.urgent && state.urgent.is_empty();
            if state.pending_len() == 0 || jumps_queue {
                state.begin(request)
            } else {
                let submitted = self.enqueue(&mut state, request);
                let next = state.begin_next();
                drop(state);
                self.run(next);
                return submitted;
            }
        };

        self.run(Some(dispatch));
        Submitted::Started
    }

    /// Retry alerts held while the engine was not ready
    pub fn on_engine_ready(&self) {
        let dispatch = {
            let mut state = self.state.lock();
            if state.closed || state.active.is_some() {
                return;
            }
            state.begin_next()
        };
        if dispatch.is_some() {
            info!("Speech engine ready, resuming held alerts");
        }
        self.run(dispatch);
    }

    /// Handle a completion report from the speech engine
    pub fn on_speech_event(&self, event: SpeechEvent) {
        match &event.outcome {
            SpeechOutcome::Done => debug!("Utterance {} finished", event.utterance_id),
            SpeechOutcome::Error(reason) => {
                warn!("Utterance {} failed: {}", event.utterance_id, reason);
                self.failed.fetch_add(1, Ordering::Relaxed);
            }
        }

        let next = self.finish(event.utterance_id);
        self.run(next);
    }

    /// Whether an utterance is active
    pub fn is_speaking(&self) -> bool {
        self.state.lock().active.is_some()
    }

    /// Id of the active utterance
    pub fn active_utterance(&self) -> Option<u64> {
        self.state.lock().active
    }

    /// Number of queued alerts
    pub fn pending_len(&self) -> usize {
        self.state.lock().pending_len()
    }

    /// Queued alerts in the order they will be spoken
    pub fn pending(&self) -> Vec<AlertRequest> {
        let state = self.state.lock();
        state.urgent.iter().chain(state.normal.iter()).cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    pub fn stats(&self) -> ArbiterStats {
        ArbiterStats {
            spoken: self.spoken.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Drain the queue, stop the active utterance and detach the pump.
    /// Later submissions return `Submitted::Closed`.
    pub fn shutdown(&self) {
        let (drained, interrupted) = {
            let mut state = self.state.lock();
            if state.closed {
                return;
            }
            state.closed = true;
            let drained = state.pending_len();
            state.urgent.clear();
            state.normal.clear();
            (drained, state.active.take())
        };

        if interrupted.is_some() {
            self.engine.stop();
        }

        if let Some(pump) = self.pump.lock().take() {
            let _ = pump.closer.send(Signal::Close);
            if pump.handle.thread().id() != thread::current().id() {
                let _ = pump.handle.join();
            }
        }

        info!(
            "Alert arbiter shut down ({} queued alerts drained, active utterance: {:?})",
            drained, interrupted
        );
    }

    /// Put an entry the engine could not start back at the head of its queue
    fn hold(&self, id: u64, request: AlertRequest) {
        let mut state = self.state.lock();
        if state.active != Some(id) || state.closed {
            return;
        }
        state.active = None;
        if request.urgent {
            state.urgent.push_front(request);
        } else {
            state.normal.push_front(request);
        }

        while state.pending_len() > self.config.max_pending {
            let dropped = match state.normal.pop_front() {
                Some(oldest) => oldest,
                None => match state.urgent.pop_front() {
                    Some(oldest) => oldest,
                    None => break,
                },
            };
            warn!("Alert queue full, dropping oldest queued alert '{}'", dropped.message);
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Speech engine not ready, holding {} alerts", state.pending_len());
    }

    /// Whether `id` still owns the speaking slot
    fn owns_slot(&self, id: u64) -> bool {
        let state = self.state.lock();
        !state.closed && state.active == Some(id)
    }

    fn enqueue(&self, state: &mut SpeakState, request: AlertRequest) -> Submitted {
        if state.pending_len() >= self.config.max_pending {
            if let Some(oldest) = state.normal.pop_front() {
                warn!("Alert queue full, dropping oldest queued alert '{}'", oldest.message);
            } else if !request.urgent {
                warn!("Alert queue full of urgent alerts, dropping '{}'", request.message);
                self.dropped.fetch_add(1, Ordering::Relaxed);
                return Submitted::Dropped;
            } else if let Some(oldest) = state.urgent.pop_front() {
                warn!("Alert queue full, dropping oldest urgent alert '{}'", oldest.message);
            }
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }

        debug!("Queueing alert '{}' (urgent: {})", request.message, request.urgent);
        if request.urgent {
            state.urgent.push_back(request);
        } else {
            state.normal.push_back(request);
        }
        Submitted::Queued
    }

    /// Release the speaking slot held by `id` and claim it for the next entry
    fn finish(&self, id: u64) -> Option<Dispatch> {
        let mut state = self.state.lock();
        if state.active != Some(id) {
            debug!("Ignoring completion for inactive utterance {}", id);
            return None;
        }
        state.active = None;
        if state.closed {
            return None;
        }
        state.begin_next()
    }

    fn run(&self, mut next: Option<Dispatch>) {
        while let Some(Dispatch { id, request }) = next.take() {
            if let Some(kind) = request.sound {
                if !self.owns_slot(id) {
                    break;
                }
                self.engine.play_sound(kind);
            }

            // shutdown may have taken the slot while the sound played
            if !self.owns_slot(id) {
                debug!("Utterance {} cancelled before start", id);
                break;
            }

            let utterance = self.utterance(id, &request);
            debug!("Speaking utterance {}: '{}'", id, utterance.text);
            match self.engine.speak(&utterance) {
                Ok(()) => {
                    self.spoken.fetch_add(1, Ordering::Relaxed);
                    if self.is_closed() {
                        self.engine.stop();
                    }
                }
                Err(SpeechError::NotReady) => self.hold(id, request),
                Err(e) => {
                    warn!("Utterance {} could not start: {}", id, e);
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    next = self.finish(id);
                }
            }
        }
    }

    fn utterance(&self, id: u64, request: &AlertRequest) -> Utterance {
        let (rate, volume) = if request.urgent {
            (self.config.urgent_rate, self.config.urgent_volume)
        } else {
            (self.config.normal_rate, self.config.normal_volume)
        };
        Utterance {
            id,
            text: request.message.clone(),
            rate,
            volume,
            urgent: request.urgent,
        }
    }
}

impl Drop for AlertArbiter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_pump(arbiter: Weak<AlertArbiter>, rx: &mut mpsc::UnboundedReceiver<Signal>) {
    while let Some(signal) = rx.blocking_recv() {
        match signal {
            Signal::Event(event) => match arbiter.upgrade() {
                Some(arbiter) => arbiter.on_speech_event(event),
                None => break,
            },
            Signal::Ready => match arbiter.upgrade() {
                Some(arbiter) => arbiter.on_engine_ready(),
                None => break,
            },
            Signal::Close => break,
        }
    }
    debug!("Speech completion pump stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::SoundKind;
    use crate::speech::{speech_channel, CompletionSink};
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::sync::Barrier;
    use std::time::{Duration, Instant};

    /// Engine that records calls; completion is driven by the test
    #[derive(Default)]
    struct RecordingEngine {
        spoken: Mutex<Vec<Utterance>>,
        sounds: Mutex<Vec<SoundKind>>,
        stops: AtomicUsize,
        fail_next: Mutex<Option<SpeechError>>,
        not_ready: AtomicBool,
    }

    impl RecordingEngine {
        fn texts(&self) -> Vec<String> {
            self.spoken.lock().iter().map(|u| u.text.clone()).collect()
        }

        fn last_id(&self) -> u64 {
            self.spoken.lock().last().map(|u| u.id).unwrap()
        }
    }

    impl SpeechEngine for RecordingEngine {
        fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
            if self.not_ready.load(Ordering::SeqCst) {
                return Err(SpeechError::NotReady);
            }
            if let Some(e) = self.fail_next.lock().take() {
                return Err(e);
            }
            self.spoken.lock().push(utterance.clone());
            Ok(())
        }

        fn play_sound(&self, kind: SoundKind) {
            self.sounds.lock().push(kind);
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn arbiter_with(config: AlertConfig) -> (AlertArbiter, Arc<RecordingEngine>) {
        let engine = Arc::new(RecordingEngine::default());
        (AlertArbiter::new(config, engine.clone()), engine)
    }

    fn arbiter() -> (AlertArbiter, Arc<RecordingEngine>) {
        arbiter_with(AlertConfig::default())
    }

    fn complete(arbiter: &AlertArbiter, engine: &RecordingEngine) {
        arbiter.on_speech_event(SpeechEvent {
            utterance_id: engine.last_id(),
            outcome: SpeechOutcome::Done,
        });
    }

    #[test]
    fn test_idle_submit_speaks_immediately() {
        let (arbiter, engine) = arbiter();

        assert_eq!(arbiter.submit(AlertRequest::normal("Lane departure")), Submitted::Started);
        assert!(arbiter.is_speaking());
        assert_eq!(engine.texts(), vec!["Lane departure"]);

        complete(&arbiter, &engine);
        assert!(!arbiter.is_speaking());
    }

    #[test]
    fn test_normal_requests_fifo() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("one"));
        assert_eq!(arbiter.submit(AlertRequest::normal("two")), Submitted::Queued);
        assert_eq!(arbiter.submit(AlertRequest::normal("three")), Submitted::Queued);
        assert_eq!(engine.texts().len(), 1);

        complete(&arbiter, &engine);
        complete(&arbiter, &engine);
        assert_eq!(engine.texts(), vec!["one", "two", "three"]);

        complete(&arbiter, &engine);
        assert!(!arbiter.is_speaking());
    }

    #[test]
    fn test_urgent_preempts_queue_not_active() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("speed"));
        arbiter.submit(AlertRequest::normal("lane"));
        arbiter.submit(AlertRequest::urgent("collision"));

        // active utterance not interrupted
        assert_eq!(engine.stops.load(Ordering::SeqCst), 0);
        assert_eq!(engine.texts(), vec!["speed"]);

        complete(&arbiter, &engine);
        assert_eq!(engine.texts(), vec!["speed", "collision"]);

        complete(&arbiter, &engine);
        assert_eq!(engine.texts(), vec!["speed", "collision", "lane"]);
    }

    #[test]
    fn test_speech_parameters() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::urgent("brake"));
        complete(&arbiter, &engine);
        arbiter.submit(AlertRequest::normal("slow down"));

        let spoken = engine.spoken.lock();
        assert_eq!((spoken[0].rate, spoken[0].volume), (1.1, 1.0));
        assert!(spoken[0].urgent);
        assert_eq!((spoken[1].rate, spoken[1].volume), (0.9, 0.8));
    }

    #[test]
    fn test_sound_played_when_spoken() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("first"));
        arbiter.submit(AlertRequest::normal("Speed limit exceeded").with_sound(SoundKind::SpeedLimit));
        assert!(engine.sounds.lock().is_empty());

        complete(&arbiter, &engine);
        assert_eq!(*engine.sounds.lock(), vec![SoundKind::SpeedLimit]);
    }

    #[test]
    fn test_error_event_advances_queue() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("one"));
        arbiter.submit(AlertRequest::normal("two"));

        arbiter.on_speech_event(SpeechEvent {
            utterance_id: engine.last_id(),
            outcome: SpeechOutcome::Error("audio focus lost".to_string()),
        });

        assert_eq!(engine.texts(), vec!["one", "two"]);
        assert_eq!(arbiter.stats().failed, 1);
    }

    #[test]
    fn test_failed_start_advances_queue() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("one"));
        arbiter.submit(AlertRequest::normal("two"));
        arbiter.submit(AlertRequest::normal("three"));

        *engine.fail_next.lock() = Some(SpeechError::Engine("synth crashed".to_string()));
        complete(&arbiter, &engine);

        // "two" failed to start, "three" follows without a completion event
        assert_eq!(engine.texts(), vec!["one", "three"]);
        assert!(arbiter.is_speaking());
    }

    #[test]
    fn test_alerts_held_until_engine_ready() {
        let (arbiter, engine) = arbiter();
        engine.not_ready.store(true, Ordering::SeqCst);

        arbiter.submit(AlertRequest::urgent("collision").with_sound(SoundKind::Collision));
        arbiter.submit(AlertRequest::normal("speed"));
        assert!(!arbiter.is_speaking());
        let held: Vec<_> = arbiter.pending().into_iter().map(|r| r.message).collect();
        assert_eq!(held, vec!["collision", "speed"]);

        engine.not_ready.store(false, Ordering::SeqCst);
        arbiter.on_engine_ready();
        assert_eq!(engine.texts(), vec!["collision"]);

        complete(&arbiter, &engine);
        assert_eq!(engine.texts(), vec!["collision", "speed"]);
        assert_eq!(arbiter.stats().failed, 0);
        assert_eq!(arbiter.stats().dropped, 0);
    }

    #[test]
    fn test_held_alerts_retried_on_next_submit() {
        let (arbiter, engine) = arbiter();
        engine.not_ready.store(true, Ordering::SeqCst);
        arbiter.submit(AlertRequest::urgent("collision"));
        arbiter.submit(AlertRequest::normal("speed"));

        engine.not_ready.store(false, Ordering::SeqCst);
        assert_eq!(arbiter.submit(AlertRequest::normal("later")), Submitted::Queued);
        complete(&arbiter, &engine);
        complete(&arbiter, &engine);

        assert_eq!(engine.texts(), vec!["collision", "speed", "later"]);
    }

    #[test]
    fn test_urgent_submit_ahead_of_held_normal() {
        let (arbiter, engine) = arbiter();
        engine.not_ready.store(true, Ordering::SeqCst);
        arbiter.submit(AlertRequest::normal("speed"));

        engine.not_ready.store(false, Ordering::SeqCst);
        assert_eq!(arbiter.submit(AlertRequest::urgent("collision")), Submitted::Started);
        complete(&arbiter, &engine);

        assert_eq!(engine.texts(), vec!["collision", "speed"]);
    }

    #[test]
    fn test_ready_signal_through_channel() {
        let (sink, events) = speech_channel();
        let engine = Arc::new(RecordingEngine::default());
        engine.not_ready.store(true, Ordering::SeqCst);
        let arbiter = Arc::new(AlertArbiter::new(AlertConfig::default(), engine.clone()));
        arbiter.attach(events).unwrap();

        arbiter.submit(AlertRequest::urgent("collision"));
        engine.not_ready.store(false, Ordering::SeqCst);
        assert!(sink.ready());

        let deadline = Instant::now() + Duration::from_secs(5);
        while engine.texts().is_empty() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(2));
        }
        assert_eq!(engine.texts(), vec!["collision"]);
        arbiter.shutdown();
    }

    /// Engine whose sound effect blocks until the test releases it
    struct GatedEngine {
        log: Mutex<Vec<String>>,
        entered: Barrier,
        release: Barrier,
    }

    impl SpeechEngine for GatedEngine {
        fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
            self.log.lock().push(format!("speak:{}", utterance.text));
            Ok(())
        }

        fn play_sound(&self, _kind: SoundKind) {
            self.entered.wait();
            self.release.wait();
        }

        fn stop(&self) {
            self.log.lock().push("stop".to_string());
        }
    }

    #[test]
    fn test_no_utterance_starts_after_shutdown() {
        let engine = Arc::new(GatedEngine {
            log: Mutex::new(Vec::new()),
            entered: Barrier::new(2),
            release: Barrier::new(2),
        });
        let arbiter = Arc::new(AlertArbiter::new(AlertConfig::default(), engine.clone()));

        arbiter.submit(AlertRequest::normal("one"));
        arbiter.submit(AlertRequest::normal("two").with_sound(SoundKind::SpeedLimit));
        let first = arbiter.active_utterance().unwrap();

        let completer = {
            let arbiter = arbiter.clone();
            thread::spawn(move || {
                arbiter.on_speech_event(SpeechEvent {
                    utterance_id: first,
                    outcome: SpeechOutcome::Done,
                })
            })
        };

        // completion is inside play_sound for "two"
        engine.entered.wait();
        arbiter.shutdown();
        engine.release.wait();
        completer.join().unwrap();

        assert_eq!(*engine.log.lock(), vec!["speak:one", "stop"]);
        assert!(!arbiter.is_speaking());
        assert_eq!(arbiter.stats().spoken, 1);
    }

    #[test]
    fn test_stale_completion_ignored() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("one"));
        arbiter.submit(AlertRequest::normal("two"));
        let first = engine.last_id();

        complete(&arbiter, &engine);
        // duplicate callback for the finished utterance
        arbiter.on_speech_event(SpeechEvent {
            utterance_id: first,
            outcome: SpeechOutcome::Done,
        });

        assert!(arbiter.is_speaking());
        assert_eq!(arbiter.active_utterance(), Some(engine.last_id()));
    }

    #[test]
    fn test_queue_bound_drops_oldest_normal() {
        let config = AlertConfig {
            max_pending: 2,
            ..Default::default()
        };
        let (arbiter, _engine) = arbiter_with(config);
        arbiter.submit(AlertRequest::normal("active"));
        arbiter.submit(AlertRequest::normal("a"));
        arbiter.submit(AlertRequest::normal("b"));
        assert_eq!(arbiter.submit(AlertRequest::urgent("c")), Submitted::Queued);

        let pending: Vec<_> = arbiter.pending().into_iter().map(|r| r.message).collect();
        assert_eq!(pending, vec!["c", "b"]);
        assert_eq!(arbiter.stats().dropped, 1);
    }

    #[test]
    fn test_queue_full_of_urgent() {
        let config = AlertConfig {
            max_pending: 2,
            ..Default::default()
        };
        let (arbiter, _engine) = arbiter_with(config);
        arbiter.submit(AlertRequest::normal("active"));
        arbiter.submit(AlertRequest::urgent("u1"));
        arbiter.submit(AlertRequest::urgent("u2"));

        assert_eq!(arbiter.submit(AlertRequest::normal("n")), Submitted::Dropped);
        assert_eq!(arbiter.submit(AlertRequest::urgent("u3")), Submitted::Queued);

        let pending: Vec<_> = arbiter.pending().into_iter().map(|r| r.message).collect();
        assert_eq!(pending, vec!["u2", "u3"]);
        assert_eq!(arbiter.pending_len(), 2);
    }

    #[test]
    fn test_shutdown_drains_and_stops() {
        let (arbiter, engine) = arbiter();
        arbiter.submit(AlertRequest::normal("one"));
        arbiter.submit(AlertRequest::normal("two"));

        arbiter.shutdown();
        assert_eq!(engine.stops.load(Ordering::SeqCst), 1);
        assert_eq!(arbiter.pending_len(), 0);
        assert!(!arbiter.is_speaking());

        assert_eq!(arbiter.submit(AlertRequest::urgent("late")), Submitted::Closed);
        // late completion after shutdown is a no-op
        complete(&arbiter, &engine);
        assert_eq!(engine.texts(), vec!["one"]);

        arbiter.shutdown();
        assert_eq!(engine.stops.load(Ordering::SeqCst), 1);
    }

    /// Engine that completes every utterance on its own thread
    struct ThreadedEngine {
        sink: CompletionSink,
        active: Arc<AtomicUsize>,
        max_active: AtomicUsize,
        spoken: AtomicUsize,
    }

    impl SpeechEngine for ThreadedEngine {
        fn speak(&self, utterance: &Utterance) -> Result<(), SpeechError> {
            let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_active.fetch_max(now_active, Ordering::SeqCst);
            self.spoken.fetch_add(1, Ordering::SeqCst);

            let id = utterance.id;
            let sink = self.sink.clone();
            let active = self.active.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_micros(200));
                active.fetch_sub(1, Ordering::SeqCst);
                sink.done(id);
            });
            Ok(())
        }

        fn play_sound(&self, _kind: SoundKind) {}

        fn stop(&self) {}
    }

    #[test]
    fn test_single_speaker_under_concurrent_submitters() {
        let (sink, events) = speech_channel();
        let engine = Arc::new(ThreadedEngine {
            sink,
            active: Arc::new(AtomicUsize::new(0)),
            max_active: AtomicUsize::new(0),
            spoken: AtomicUsize::new(0),
        });
        let config = AlertConfig {
            max_pending: 1000,
            ..Default::default()
        };
        let arbiter = Arc::new(AlertArbiter::new(config, engine.clone()));
        arbiter.attach(events).unwrap();

        let submitters: Vec<_> = (0..4)
            .map(|t| {
                let arbiter = arbiter.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        let request = if i % 5 == 0 {
                            AlertRequest::urgent(format!("urgent {}-{}", t, i))
                        } else {
                            AlertRequest::normal(format!("normal {}-{}", t, i))
                        };
                        arbiter.submit(request);
                    }
                })
            })
            .collect();
        for submitter in submitters {
            submitter.join().unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while (arbiter.is_speaking() || arbiter.pending_len() > 0) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert_eq!(engine.spoken.load(Ordering::SeqCst), 100);
        assert_eq!(engine.max_active.load(Ordering::SeqCst), 1);
        arbiter.shutdown();
    }
}
