//! Sensor Fusion Coordinator
//!
//! Owns the pipeline: frame buffer, consumer thread, sensor slots, frame
//! rate monitor and alert arbiter. Producers call in from any thread.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use adas::{
    ClosingSpeedTracker, DetectionAggregator, LaneDetector, LocationSample, NoTracking,
    ObjectDetector, RiskAssessment, SignReading, SignRecognizer, Unloaded,
};
use alerting::{AlertArbiter, ArbiterStats, SpeechEngine, SpeechEvents};
use camera_capture::{decode_jpeg, FrameStamper, VideoFrame};
use frame_buffer::{FrameBuffer, Offer};
use parking_lot::Mutex;
use rate_monitor::RateMonitor;
use tracing::{debug, info};

use crate::cycle::{FusionCycle, SensorSlots};
use crate::{FusionConfig, FusionError, Observable, PipelineStats, StatsSnapshot, SubscriptionId};

/// Perception models driven by the consumer thread
pub struct Collaborators {
    pub detector: Box<dyn ObjectDetector>,
    pub tracker: Box<dyn ClosingSpeedTracker>,
    pub lane: Box<dyn LaneDetector>,
    pub signs: Box<dyn SignRecognizer>,
}

impl Collaborators {
    /// No models loaded: every cycle degrades to empty results
    pub fn unloaded() -> Self {
        Self {
            detector: Box::new(Unloaded),
            tracker: Box::new(NoTracking),
            lane: Box::new(Unloaded),
            signs: Box::new(Unloaded),
        }
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::unloaded()
    }
}

/// Top-level owner of the fusion pipeline
pub struct SensorFusionCoordinator {
    frames: Arc<FrameBuffer<VideoFrame>>,
    stamper: FrameStamper,
    slots: Arc<SensorSlots>,
    risk: Arc<Observable<RiskAssessment>>,
    frame_rate: Arc<Observable<u64>>,
    stats: Arc<PipelineStats>,
    arbiter: Arc<AlertArbiter>,
    rate: Arc<RateMonitor>,
    consumer: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl SensorFusionCoordinator {
    /// Start the pipeline.
    ///
    /// `speech_events` is the receiving half of the channel whose sink was
    /// handed to `engine`.
    pub fn spawn(
        config: FusionConfig,
        collaborators: Collaborators,
        engine: Arc<dyn SpeechEngine>,
        speech_events: SpeechEvents,
    ) -> Result<Self, FusionError> {
        info!("Starting sensor fusion with config: {:?}", config);

        let arbiter = Arc::new(AlertArbiter::new(config.alerts.clone(), engine));
        arbiter.attach(speech_events)?;

        let frames = Arc::new(FrameBuffer::new(config.frame_capacity));
        let slots = Arc::new(SensorSlots::new());
        let risk = Arc::new(Observable::default());
        let frame_rate = Arc::new(Observable::new(0u64));
        let stats = Arc::new(PipelineStats::new());

        let published = frame_rate.clone();
        let rate = Arc::new(RateMonitor::new(config.rate_period(), move |fps| {
            debug!("Frame rate: {} fps", fps);
            published.publish(fps);
        }));

        let Collaborators {
            detector,
            tracker,
            lane,
            signs,
        } = collaborators;
        let mut cycle = FusionCycle::new(
            detector,
            tracker,
            lane,
            signs,
            DetectionAggregator::new(config.adas.clone()),
            &config.alerts,
            slots.clone(),
            risk.clone(),
            arbiter.clone(),
            stats.clone(),
        );

        let consumer_frames = frames.clone();
        let consumer_rate = rate.clone();
        let consumer = thread::Builder::new()
            .name("fusion-consumer".to_string())
            .spawn(move || {
                while let Ok(frame) = consumer_frames.take() {
                    cycle.process(frame);
                    consumer_rate.on_event();
                }
                debug!("Fusion consumer stopped");
            })
            .map_err(|e| FusionError::Spawn("consumer", e))?;

        rate.start();

        Ok(Self {
            frames,
            stamper: FrameStamper::new(),
            slots,
            risk,
            frame_rate,
            stats,
            arbiter,
            rate,
            consumer: Mutex::new(Some(consumer)),
            closed: AtomicBool::new(false),
        })
    }

    /// Offer a frame to the consumer. Never blocks.
    ///
    /// `Ok(Offer::EvictedOldest)` when the oldest buffered frame made room.
    pub fn submit_frame(&self, frame: VideoFrame) -> Result<Offer, FusionError> {
        self.ensure_open()?;

        let offer = self.frames.offer(frame);
        match offer {
            Offer::Accepted => self.stats.inc(&self.stats.frames_offered),
            Offer::EvictedOldest => {
                self.stats.inc(&self.stats.frames_offered);
                self.stats.inc(&self.stats.frames_evicted);
            }
            Offer::Closed => return Err(FusionError::ShutDown),
        }
        Ok(offer)
    }

    /// Stamp raw RGB data with the next sequence number and offer it
    pub fn submit_rgb(&self, data: Vec<u8>, width: u32, height: u32) -> Result<Offer, FusionError> {
        self.ensure_open()?;
        let frame = self.stamper.stamp(data, width, height)?;
        self.submit_frame(frame)
    }

    /// Decode a JPEG image and offer it
    pub fn submit_jpeg(&self, jpeg: &[u8]) -> Result<Offer, FusionError> {
        self.ensure_open()?;
        let (data, width, height) = decode_jpeg(jpeg)?;
        self.submit_rgb(data, width, height)
    }

    /// Replace the latest location sample
    pub fn submit_location(&self, sample: LocationSample) -> Result<(), FusionError> {
        self.ensure_open()?;
        self.slots.set_location(sample);
        Ok(())
    }

    /// Replace the latest sign reading
    pub fn submit_sign_reading(&self, reading: SignReading) -> Result<(), FusionError> {
        self.ensure_open()?;
        self.slots.set_sign(reading);
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), FusionError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(FusionError::ShutDown);
        }
        Ok(())
    }

    /// Call `callback` with the current assessment and every later one
    pub fn observe_risk_assessment<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&RiskAssessment) + Send + Sync + 'static,
    {
        self.risk.subscribe(callback)
    }

    pub fn risk(&self) -> &Observable<RiskAssessment> {
        &self.risk
    }

    /// Frames processed per sampling period
    pub fn frame_rate(&self) -> &Observable<u64> {
        &self.frame_rate
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub fn alert_stats(&self) -> ArbiterStats {
        self.arbiter.stats()
    }

    pub fn arbiter(&self) -> &AlertArbiter {
        &self.arbiter
    }

    pub fn is_shut_down(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Stop the pipeline: release buffered frames, stop the consumer and
    /// the rate monitor, drain alerts. Idempotent.
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        let released = self.frames.shutdown();
        self.rate.stop();

        if let Some(consumer) = self.consumer.lock().take() {
            if consumer.thread().id() != thread::current().id() {
                let _ = consumer.join();
            }
        }

        self.arbiter.shutdown();
        info!("Sensor fusion shut down ({} buffered frames released)", released);
    }
}

impl Drop for SensorFusionCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}
