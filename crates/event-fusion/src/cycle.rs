//! One fusion cycle: frame in, risk assessment and alerts out

use std::sync::Arc;
use std::time::Instant;

use adas::{
    AdasError, ClosingSpeedTracker, Detection, DetectionAggregator, FusionInputs, LaneDetector,
    LocationSample, ObjectDetector, RiskAssessment, SignReading, SignRecognizer,
};
use alerting::{AlertArbiter, AlertConfig, AlertGate, AlertRequest, SoundKind, Submitted};
use camera_capture::VideoFrame;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::{Observable, PipelineStats};

pub const COLLISION_MESSAGE: &str = "Warning! Vehicle approaching fast";
pub const LANE_DEPARTURE_MESSAGE: &str = "Lane departure detected";

/// Last-write-wins slots for the positioning and sign feeds
pub struct SensorSlots {
    location: watch::Sender<Option<LocationSample>>,
    sign: watch::Sender<Option<SignReading>>,
}

impl SensorSlots {
    pub fn new() -> Self {
        Self {
            location: watch::channel(None).0,
            sign: watch::channel(None).0,
        }
    }

    pub fn set_location(&self, sample: LocationSample) {
        self.location.send_replace(Some(sample));
    }

    pub fn set_sign(&self, reading: SignReading) {
        self.sign.send_replace(Some(reading));
    }

    pub fn location(&self) -> Option<LocationSample> {
        self.location.borrow().clone()
    }

    pub fn sign(&self) -> Option<SignReading> {
        self.sign.borrow().clone()
    }
}

impl Default for SensorSlots {
    fn default() -> Self {
        Self::new()
    }
}

/// Alerts implied by an assessment, in submission order
pub fn alerts_for(assessment: &RiskAssessment) -> Vec<AlertRequest> {
    let mut alerts = Vec::new();
    if assessment.collision_risk {
        alerts.push(AlertRequest::urgent(COLLISION_MESSAGE).with_sound(SoundKind::Collision));
    }
    if assessment.speed_violation {
        let message = match assessment.speed_limit {
            Some(limit) => format!("Speed limit {} exceeded", limit),
            None => "Speed limit exceeded".to_string(),
        };
        alerts.push(AlertRequest::normal(message).with_sound(SoundKind::SpeedLimit));
    }
    if assessment.lane_departure {
        alerts.push(AlertRequest::normal(LANE_DEPARTURE_MESSAGE).with_sound(SoundKind::LaneDeparture));
    }
    alerts
}

/// Consumer-side state: collaborators, aggregator and alert gates.
/// Runs only on the consumer thread.
pub struct FusionCycle {
    detector: Box<dyn ObjectDetector>,
    tracker: Box<dyn ClosingSpeedTracker>,
    lane: Box<dyn LaneDetector>,
    signs: Box<dyn SignRecognizer>,
    aggregator: DetectionAggregator,
    slots: Arc<SensorSlots>,
    risk: Arc<Observable<RiskAssessment>>,
    arbiter: Arc<AlertArbiter>,
    stats: Arc<PipelineStats>,
    gate: AlertGate<SoundKind>,
    urgent_gate: AlertGate<SoundKind>,
}

impl FusionCycle {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        detector: Box<dyn ObjectDetector>,
        tracker: Box<dyn ClosingSpeedTracker>,
        lane: Box<dyn LaneDetector>,
        signs: Box<dyn SignRecognizer>,
        aggregator: DetectionAggregator,
        alerts: &AlertConfig,
        slots: Arc<SensorSlots>,
        risk: Arc<Observable<RiskAssessment>>,
        arbiter: Arc<AlertArbiter>,
        stats: Arc<PipelineStats>,
    ) -> Self {
        Self {
            detector,
            tracker,
            lane,
            signs,
            aggregator,
            slots,
            risk,
            arbiter,
            stats,
            gate: AlertGate::new(alerts.cooldown()),
            urgent_gate: AlertGate::new(alerts.urgent_cooldown()),
        }
    }

    /// Run detection and fusion on one frame; the frame is dropped afterwards
    pub fn process(&mut self, frame: VideoFrame) -> RiskAssessment {
        let now = Instant::now();
        let config = self.aggregator.config().clone();

        let detections = self.detect(&frame);
        let detections = self.tracker.enrich(&frame, detections);

        let lane_departure = config.lane_departure_enabled && self.lane_departure(&frame);

        if config.sign_detection_enabled {
            self.recognize_sign(&frame, config.sign_roi);
        }

        let location = self.slots.location();
        let sign = self.slots.sign();
        if let Some(sample) = &location {
            if sample.age(now) > config.staleness_budget() {
                self.stats.inc(&self.stats.stale_location_cycles);
            }
        }

        let assessment = self.aggregator.assess(&FusionInputs {
            detections: &detections,
            location: location.as_ref(),
            sign: sign.as_ref(),
            lane_departure,
            now,
        });

        debug!(
            "Frame {} assessed: collision={} speed_violation={} lane={} speed={:.1}km/h limit={:?}",
            frame.sequence,
            assessment.collision_risk,
            assessment.speed_violation,
            assessment.lane_departure,
            assessment.current_speed_kmh,
            assessment.speed_limit
        );

        self.risk.publish(assessment.clone());
        self.dispatch_alerts(&assessment, now);
        self.stats.inc(&self.stats.frames_processed);
        assessment
    }

    fn detect(&mut self, frame: &VideoFrame) -> Vec<Detection> {
        match self.detector.detect(frame) {
            Ok(detections) => detections,
            Err(e) => {
                self.stats.inc(&self.stats.inference_failures);
                log_degraded("Object detection", frame.sequence, &e);
                Vec::new()
            }
        }
    }

    fn lane_departure(&mut self, frame: &VideoFrame) -> bool {
        match self.lane.detect_departure(frame) {
            Ok(departure) => departure,
            Err(e) => {
                self.stats.inc(&self.stats.lane_failures);
                log_degraded("Lane detection", frame.sequence, &e);
                false
            }
        }
    }

    fn recognize_sign(&mut self, frame: &VideoFrame, roi: Option<[u32; 4]>) {
        let cropped = roi.and_then(|[x, y, w, h]| {
            let crop = frame.crop(x, y, w, h);
            if crop.is_none() {
                debug!("Sign ROI {:?} outside {}x{} frame", roi, frame.width, frame.height);
            }
            crop
        });

        match self.signs.recognize(cropped.as_ref().unwrap_or(frame)) {
            Ok(Some(reading)) => {
                debug!("Sign recognized: {} ({:.2})", reading.label, reading.confidence);
                self.slots.set_sign(reading);
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.inc(&self.stats.sign_failures);
                log_degraded("Sign recognition", frame.sequence, &e);
            }
        }
    }

    /// Submit alerts on the rising edge of each signal, then once per cooldown
    fn dispatch_alerts(&mut self, assessment: &RiskAssessment, now: Instant) {
        let asserted = [
            (SoundKind::Collision, assessment.collision_risk),
            (SoundKind::SpeedLimit, assessment.speed_violation),
            (SoundKind::LaneDeparture, assessment.lane_departure),
        ];
        for (kind, active) in asserted {
            if !active {
                self.gate_for(kind).release(&kind);
            }
        }

        for request in alerts_for(assessment) {
            let Some(kind) = request.sound else { continue };
            if !self.gate_for(kind).should_fire(&kind, now) {
                self.stats.inc(&self.stats.alerts_suppressed);
                continue;
            }

            // only an accepted alert starts the cooldown
            match self.arbiter.submit(request) {
                Submitted::Started | Submitted::Queued => {
                    self.gate_for(kind).record_fire(kind, now);
                    self.stats.inc(&self.stats.alerts_submitted);
                }
                Submitted::Dropped => {
                    self.stats.inc(&self.stats.alerts_dropped);
                    debug!("{:?} alert dropped by full queue", kind);
                }
                Submitted::Closed => {
                    self.stats.inc(&self.stats.alerts_dropped);
                    debug!("{:?} alert after arbiter shutdown", kind);
                }
            }
        }
    }

    fn gate_for(&mut self, kind: SoundKind) -> &mut AlertGate<SoundKind> {
        match kind {
            SoundKind::Collision => &mut self.urgent_gate,
            SoundKind::SpeedLimit | SoundKind::LaneDeparture => &mut self.gate,
        }
    }
}

fn log_degraded(stage: &str, sequence: u64, error: &AdasError) {
    match error {
        AdasError::ModelUnavailable(_) => debug!("{} skipped for frame {}: {}", stage, sequence, error),
        _ => warn!("{} failed for frame {}: {}", stage, sequence, error),
    }
}
