//! Detection aggregation into risk decisions

use std::time::Instant;

use tracing::debug;

use crate::{AdasConfig, Detection, LocationSample, RiskAssessment, SignReading};

/// Inputs of one fusion cycle
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a> {
    /// Detections for the processed frame (already tracker-enriched)
    pub detections: &'a [Detection],
    /// Latest location sample, if any arrived
    pub location: Option<&'a LocationSample>,
    /// Latest sign reading, if any arrived
    pub sign: Option<&'a SignReading>,
    /// Lane collaborator signal for the processed frame
    pub lane_departure: bool,
    /// Decision instant used for staleness checks
    pub now: Instant,
}

#[derive(Debug, Clone, Copy)]
struct RetainedLimit {
    limit: u32,
    observed_at: Instant,
}

/// Turns detections, speed and signs into a `RiskAssessment`.
///
/// The only state carried between cycles is the sticky speed limit: a limit
/// adopted from a fresh sign keeps applying until a newer fresh sign
/// supersedes it (or the optional retention period runs out).
#[derive(Debug, Clone)]
pub struct DetectionAggregator {
    config: AdasConfig,
    retained: Option<RetainedLimit>,
}

impl DetectionAggregator {
    pub fn new(config: AdasConfig) -> Self {
        Self {
            config,
            retained: None,
        }
    }

    /// Assess one fusion cycle
    pub fn assess(&mut self, inputs: &FusionInputs<'_>) -> RiskAssessment {
        let collision_risk = self.collision_risk(inputs.detections);
        let speed_limit = self.resolve_speed_limit(inputs.sign, inputs.now);

        let (current_speed_kmh, speed_fresh) = match inputs.location {
            Some(sample) => {
                let fresh = sample.age(inputs.now) <= self.config.staleness_budget();
                if !fresh {
                    debug!(
                        "Location sample stale ({:?} old), ignored for speed check",
                        sample.age(inputs.now)
                    );
                }
                (sample.speed_kmh(), fresh)
            }
            None => (0.0, false),
        };

        let speed_violation = speed_fresh
            && speed_limit.map_or(false, |limit| current_speed_kmh > limit as f32);

        RiskAssessment {
            collision_risk,
            speed_violation,
            lane_departure: inputs.lane_departure,
            current_speed_kmh,
            speed_limit,
        }
    }

    /// Currently retained speed limit
    pub fn retained_speed_limit(&self) -> Option<u32> {
        self.retained.map(|r| r.limit)
    }

    pub fn config(&self) -> &AdasConfig {
        &self.config
    }

    fn collision_risk(&self, detections: &[Detection]) -> bool {
        detections
            .iter()
            .filter(|d| d.confidence() >= self.config.object_confidence)
            .any(|d| match d {
                Detection::Vehicle { closing_speed, .. } => {
                    *closing_speed > self.config.closing_speed_threshold_mps
                }
                Detection::Person { .. } => false,
            })
    }

    fn resolve_speed_limit(&mut self, sign: Option<&SignReading>, now: Instant) -> Option<u32> {
        if let Some(reading) = sign {
            if let Some(limit) = reading.derived_speed_limit {
                let fresh = reading.age(now) <= self.config.staleness_budget();
                let confident = reading.confidence >= self.config.sign_confidence;
                let newer = self
                    .retained
                    .map_or(true, |r| reading.observed_at >= r.observed_at);

                if fresh && confident && newer {
                    if self.retained.map(|r| r.limit) != Some(limit) {
                        debug!("Speed limit now {} km/h (sign '{}')", limit, reading.label);
                    }
                    self.retained = Some(RetainedLimit {
                        limit,
                        observed_at: reading.observed_at,
                    });
                } else if !fresh {
                    debug!("Sign '{}' stale, keeping retained limit", reading.label);
                }
            }
        }

        if let (Some(retained), Some(retention)) =
            (self.retained, self.config.speed_limit_retention())
        {
            if now.saturating_duration_since(retained.observed_at) > retention {
                debug!("Retained speed limit {} km/h expired", retained.limit);
                self.retained = None;
            }
        }

        self.retained.map(|r| r.limit)
    }
}

impl Default for DetectionAggregator {
    fn default() -> Self {
        Self::new(AdasConfig::default())
    }
}
