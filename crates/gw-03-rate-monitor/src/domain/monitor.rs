//! # Rate Monitor
//!
//! Keeps a 10 second arrival history per source and derives two signals:
//! the instantaneous rate (arrivals in the trailing second) and the
//! sustained rate (arrivals over the full window divided by its length).
//! A burst past the hard ceiling is scored High; sustained overage past the
//! adaptive threshold is scored Medium. Traffic under the normal floor is
//! never flagged no matter what the ratios say.

use parking_lot::RwLock;
use shared_types::{DetectionResult, MissionPhase, Severity, SourceId, VehicleState};
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

/// Full observation window.
const WINDOW: Duration = Duration::from_secs(10);
/// Sub-window for instantaneous rate.
const BURST_WINDOW: Duration = Duration::from_secs(1);
/// Sustained-threshold multiplier during bulk mission upload.
const MISSION_UPLOAD_MULTIPLIER: f64 = 2.5;

struct SourceRate {
    arrivals: VecDeque<Instant>,
    last_seen: Instant,
}

/// Per-source flood detector.
pub struct RateMonitor {
    state: RwLock<HashMap<SourceId, SourceRate>>,
    sustained_threshold: f64,
    burst_threshold: u32,
    normal_floor: f64,
    max_sources: usize,
}

impl RateMonitor {
    /// Monitor with the configured thresholds, tracking at most
    /// `max_sources` distinct sources.
    #[must_use]
    pub fn new(
        sustained_threshold: f64,
        burst_threshold: u32,
        normal_floor: f64,
        max_sources: usize,
    ) -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            sustained_threshold,
            burst_threshold,
            normal_floor,
            max_sources,
        }
    }

    /// Record one arrival from `source` and score the resulting rate.
    pub fn observe(&self, source: &SourceId, vehicle: &VehicleState) -> DetectionResult {
        self.observe_at(source, vehicle, Instant::now())
    }

    fn observe_at(
        &self,
        source: &SourceId,
        vehicle: &VehicleState,
        now: Instant,
    ) -> DetectionResult {
        let started = Instant::now();
        let (instantaneous, sustained) = self.record_arrival(source, now);

        let effective_threshold = if vehicle.mission == MissionPhase::MissionUpload {
            self.sustained_threshold * MISSION_UPLOAD_MULTIPLIER
        } else {
            self.sustained_threshold
        };

        // Below the floor nothing is suspicious, whatever the ratios say.
        if f64::from(instantaneous) <= self.normal_floor && sustained <= self.normal_floor {
            return DetectionResult::clear("rate within normal floor", started.elapsed());
        }

        if instantaneous > self.burst_threshold {
            let overage = f64::from(instantaneous) / f64::from(self.burst_threshold);
            let confidence = (0.75 + 0.15 * overage).min(1.0);
            tracing::debug!(source = %source, instantaneous, "burst detected");
            return DetectionResult::flagged(
                confidence,
                Severity::High,
                format!(
                    "burst: {instantaneous} commands in 1s (ceiling {})",
                    self.burst_threshold
                ),
                started.elapsed(),
            );
        }

        if sustained > effective_threshold {
            let ratio = sustained / effective_threshold;
            let confidence = (0.4 + 0.3 * ratio).min(0.85);
            return DetectionResult::flagged(
                confidence,
                Severity::Medium,
                format!(
                    "sustained {sustained:.1} cmd/s over threshold {effective_threshold:.1}"
                ),
                started.elapsed(),
            );
        }

        DetectionResult::clear("rate nominal", started.elapsed())
    }

    /// Push the arrival, prune the window, and return
    /// (instantaneous count, sustained rate).
    fn record_arrival(&self, source: &SourceId, now: Instant) -> (u32, f64) {
        let mut state = self.state.write();

        if !state.contains_key(source) && state.len() >= self.max_sources {
            if let Some(stalest) = state
                .iter()
                .min_by_key(|(_, s)| s.last_seen)
                .map(|(k, _)| k.clone())
            {
                state.remove(&stalest);
            }
        }

        let entry = state.entry(source.clone()).or_insert_with(|| SourceRate {
            arrivals: VecDeque::new(),
            last_seen: now,
        });
        entry.last_seen = now;
        entry.arrivals.push_back(now);
        while let Some(front) = entry.arrivals.front() {
            if now.duration_since(*front) > WINDOW {
                entry.arrivals.pop_front();
            } else {
                break;
            }
        }

        let instantaneous = entry
            .arrivals
            .iter()
            .rev()
            .take_while(|t| now.duration_since(**t) <= BURST_WINDOW)
            .count() as u32;
        let sustained = entry.arrivals.len() as f64 / WINDOW.as_secs_f64();
        (instantaneous, sustained)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn monitor() -> RateMonitor {
        RateMonitor::new(20.0, 50, 5.0, 64)
    }

    fn source() -> SourceId {
        SourceId::new("gcs-1")
    }

    /// Feed `count` arrivals spread evenly across `span`, returning the last
    /// observation.
    fn feed(
        monitor: &RateMonitor,
        vehicle: &VehicleState,
        count: u32,
        span: Duration,
    ) -> DetectionResult {
        let start = Instant::now();
        let step = span / count.max(1);
        let mut last = None;
        for i in 0..count {
            last = Some(monitor.observe_at(&source(), vehicle, start + step * i));
        }
        last.unwrap()
    }

    #[test]
    fn test_slow_traffic_is_clear() {
        let result = feed(
            &monitor(),
            &VehicleState::grounded(),
            4,
            Duration::from_secs(1),
        );
        assert!(!result.detected);
    }

    #[test]
    fn test_burst_flagged_high_with_strong_confidence() {
        let result = feed(
            &monitor(),
            &VehicleState::in_flight(50.0, 10.0),
            60,
            Duration::from_millis(900),
        );
        assert!(result.detected);
        assert_eq!(result.severity, Severity::High);
        assert!(result.confidence >= 0.9);
    }

    #[test]
    fn test_confidence_monotone_in_rate() {
        let at_55 = feed(
            &monitor(),
            &VehicleState::grounded(),
            55,
            Duration::from_millis(900),
        );
        let at_80 = feed(
            &monitor(),
            &VehicleState::grounded(),
            80,
            Duration::from_millis(900),
        );
        assert!(at_80.confidence >= at_55.confidence);
    }

    #[test]
    fn test_sustained_overage_flagged_medium() {
        // 30 cmd/s sustained over 10s -> 300 arrivals, no 1s burst over 50.
        let result = feed(
            &monitor(),
            &VehicleState::grounded(),
            300,
            Duration::from_secs(9),
        );
        assert!(result.detected);
        assert_eq!(result.severity, Severity::Medium);
    }

    #[test]
    fn test_mission_upload_raises_threshold() {
        let mut vehicle = VehicleState::in_flight(50.0, 5.0);
        vehicle.mission = MissionPhase::MissionUpload;
        // 30 cmd/s sustained: over the base 20/s threshold but under the
        // upload-adjusted 50/s.
        let result = feed(&monitor(), &vehicle, 300, Duration::from_secs(9));
        assert!(!result.detected);
    }

    #[test]
    fn test_floor_suppresses_flagging() {
        let monitor = RateMonitor::new(2.0, 50, 5.0, 64);
        // 4 cmd/s exceeds the tiny sustained threshold but sits under the floor.
        let result = feed(
            &monitor,
            &VehicleState::grounded(),
            4,
            Duration::from_millis(900),
        );
        assert!(!result.detected);
    }

    #[test]
    fn test_sources_rated_independently() {
        let monitor = monitor();
        let vehicle = VehicleState::grounded();
        let start = Instant::now();
        for i in 0..60 {
            monitor.observe_at(
                &SourceId::new("noisy"),
                &vehicle,
                start + Duration::from_millis(i * 15),
            );
        }
        let quiet = monitor.observe_at(&SourceId::new("quiet"), &vehicle, start);
        assert!(!quiet.detected);
    }

    #[test]
    fn test_source_cap_bounds_map() {
        let monitor = RateMonitor::new(20.0, 50, 5.0, 2);
        let vehicle = VehicleState::grounded();
        for name in ["a", "b", "c", "d"] {
            monitor.observe(&SourceId::new(name), &vehicle);
        }
        assert!(monitor.state.read().len() <= 2);
    }

    #[test]
    fn test_old_arrivals_age_out() {
        let monitor = monitor();
        let vehicle = VehicleState::grounded();
        let start = Instant::now();
        for i in 0..60 {
            monitor.observe_at(&source(), &vehicle, start + Duration::from_millis(i * 15));
        }
        // Same source, 30 seconds later: history expired.
        let result = monitor.observe_at(&source(), &vehicle, start + Duration::from_secs(30));
        assert!(!result.detected);
    }
}
