use std::time::Duration;
use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Nominal tick period of the virtual playback clock.
pub const DEFAULT_TICK: Duration = Duration::from_millis(100);

/// Periodic driver for `Synchronizer::tick`.
///
/// Each `next_delta` waits for the next interval tick and returns the measured
/// seconds since the previous one, so a stalled or suspended process hands the
/// synchronizer one large delta (which it clamps) instead of losing time.
#[derive(Debug)]
pub struct TickDriver {
    interval: Interval,
    period: Duration,
    last: Option<Instant>,
}

impl TickDriver {
    pub fn new(period: Duration) -> Self {
        let period = if period.is_zero() { DEFAULT_TICK } else { period };
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            interval,
            period,
            last: None,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Restart measuring from now. Call when playback resumes so paused
    /// wall-clock time is not counted.
    pub fn restart(&mut self) {
        self.interval.reset();
        self.last = Some(Instant::now());
    }

    /// Wait for the next tick and return the elapsed seconds.
    pub async fn next_delta(&mut self) -> f64 {
        self.interval.tick().await;
        // `tick` yields the scheduled deadline; measure real time instead.
        let now = Instant::now();
        let delta = match self.last {
            Some(prev) => now.saturating_duration_since(prev).as_secs_f64(),
            None => self.period.as_secs_f64(),
        };
        self.last = Some(now);
        delta
    }
}

impl Default for TickDriver {
    fn default() -> Self {
        Self::new(DEFAULT_TICK)
    }
}

pub fn sanitize_position(p: f64) -> f64 {
    if p.is_nan() || !p.is_finite() {
        0.0
    } else if p < 0.0 {
        // Negative positions are not meaningful; clamp to zero.
        0.0
    } else {
        p
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn sanitize_clamps_bad_positions() {
        assert_eq!(sanitize_position(f64::NAN), 0.0);
        assert_eq!(sanitize_position(f64::INFINITY), 0.0);
        assert_eq!(sanitize_position(-3.0), 0.0);
        assert_eq!(sanitize_position(4.5), 4.5);
    }

    #[tokio::test(start_paused = true)]
    async fn driver_reports_measured_deltas() {
        let mut driver = TickDriver::new(Duration::from_millis(100));
        driver.restart();
        let first = driver.next_delta().await;
        assert_relative_eq!(first, 0.1, epsilon = 1e-3);
        let second = driver.next_delta().await;
        assert_relative_eq!(second, 0.1, epsilon = 1e-3);
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_driver_reports_one_large_delta() {
        let mut driver = TickDriver::new(Duration::from_millis(100));
        driver.restart();
        driver.next_delta().await;
        tokio::time::advance(Duration::from_secs(5)).await;
        let delta = driver.next_delta().await;
        assert!(delta >= 5.0, "delta was {}", delta);
    }

    #[tokio::test]
    async fn zero_period_falls_back_to_default() {
        assert_eq!(TickDriver::new(Duration::ZERO).period(), DEFAULT_TICK);
    }
}
