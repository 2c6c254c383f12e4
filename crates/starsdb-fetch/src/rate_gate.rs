use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Sliding-window request rate tracker.
///
/// Keeps the timestamps of recent events and reports the implied rate over the
/// trailing minute. It never blocks; callers poll it and back off themselves,
/// so short bursts above the target are possible and correct themselves as
/// the window slides.
#[derive(Clone)]
pub struct RateGate {
    events: Arc<Mutex<VecDeque<Instant>>>,
    window: Duration,
}

impl RateGate {
    pub fn new() -> Self {
        Self::with_window(WINDOW)
    }

    pub fn with_window(window: Duration) -> Self {
        Self {
            events: Arc::new(Mutex::new(VecDeque::new())),
            window,
        }
    }

    /// Append an event. Timestamps are expected in non-decreasing order.
    pub fn record(&self, now: Instant) {
        self.events.lock().push_back(now);
    }

    /// Events per minute over the trailing window.
    ///
    /// 0 with fewer than two samples. Two or more samples with no time since
    /// the oldest give `f64::INFINITY`.
    pub fn current_rate_per_minute(&self, now: Instant) -> f64 {
        let mut events = self.events.lock();
        Self::prune(&mut events, now, self.window);
        Self::rate(&events, now)
    }

    /// Record `now` only if the current rate is below `target_per_minute`.
    ///
    /// The check and the append happen under one lock so concurrent callers
    /// cannot both slip in on the same reading.
    pub fn admit_below(&self, target_per_minute: f64, now: Instant) -> bool {
        let mut events = self.events.lock();
        Self::prune(&mut events, now, self.window);
        if Self::rate(&events, now) < target_per_minute {
            events.push_back(now);
            true
        } else {
            false
        }
    }

    /// Number of events inside the trailing window.
    pub fn recent_count(&self, now: Instant) -> usize {
        let mut events = self.events.lock();
        Self::prune(&mut events, now, self.window);
        events.len()
    }

    fn prune(events: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(oldest) = events.front() {
            if now.saturating_duration_since(*oldest) > window {
                events.pop_front();
            } else {
                break;
            }
        }
    }

    fn rate(events: &VecDeque<Instant>, now: Instant) -> f64 {
        if events.len() < 2 {
            return 0.0;
        }
        let Some(oldest) = events.front() else {
            return 0.0;
        };
        let elapsed = now.saturating_duration_since(*oldest).as_secs_f64();
        if elapsed <= 0.0 {
            return f64::INFINITY;
        }
        events.len() as f64 * 60.0 / elapsed
    }
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_spacing_reports_count_per_minute() {
        let gate = RateGate::new();
        let base = Instant::now();
        for i in 0..60 {
            gate.record(base + Duration::from_secs(i));
        }

        let rate = gate.current_rate_per_minute(base + Duration::from_secs(60));
        assert!((rate - 60.0).abs() < 1.5, "rate was {}", rate);
    }

    #[test]
    fn test_old_events_are_excluded() {
        let gate = RateGate::new();
        let base = Instant::now();
        for i in 0..30 {
            gate.record(base + Duration::from_secs(i));
        }
        for i in 100..130 {
            gate.record(base + Duration::from_secs(i));
        }

        let now = base + Duration::from_secs(160);
        assert_eq!(gate.recent_count(now), 30);

        let rate = gate.current_rate_per_minute(now);
        assert!((rate - 30.0).abs() < 1.0, "rate was {}", rate);
    }

    #[test]
    fn test_fewer_than_two_samples_is_zero() {
        let gate = RateGate::new();
        let base = Instant::now();
        assert_eq!(gate.current_rate_per_minute(base), 0.0);

        gate.record(base);
        assert_eq!(gate.current_rate_per_minute(base + Duration::from_secs(5)), 0.0);
    }

    #[test]
    fn test_samples_at_one_instant_are_an_infinite_rate() {
        let gate = RateGate::new();
        let base = Instant::now();
        gate.record(base);
        gate.record(base);

        assert!(gate.current_rate_per_minute(base).is_infinite());
        assert!(gate.current_rate_per_minute(base + Duration::from_secs(1)).is_finite());
    }

    #[test]
    fn test_admit_below_throttles_bursts() {
        let gate = RateGate::new();
        let base = Instant::now();

        assert!(gate.admit_below(10.0, base));
        assert!(gate.admit_below(10.0, base));
        // Two events in zero time is an unbounded rate.
        assert!(!gate.admit_below(10.0, base));
        // 2 events over 13s is ~9.2/min.
        assert!(gate.admit_below(10.0, base + Duration::from_secs(13)));
        assert_eq!(gate.recent_count(base + Duration::from_secs(13)), 3);
    }

    #[test]
    fn test_clones_share_the_log() {
        let gate = RateGate::new();
        let other = gate.clone();
        let base = Instant::now();
        other.record(base);
        assert_eq!(gate.recent_count(base), 1);
    }
}
