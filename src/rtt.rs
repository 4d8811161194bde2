//! Jacobson/Karels RTT estimator, with the sender's retransmission
//! timeout derived from it.
//!
//! Deviation is always computed against the *old* estimate before the
//! estimate itself is updated; getting this order backwards is a common
//! bug when porting this formula.

use std::time::Duration;

const ALPHA_NUM: i64 = 1;
const ALPHA_DEN: i64 = 8; // alpha = 0.125
const BETA_NUM: i64 = 1;
const BETA_DEN: i64 = 4; // beta = 0.25

const INITIAL_ESTIMATE_US: i64 = 1_000_000;
const INITIAL_DEVIATION_US: i64 = 200;
const TERMINAL_CAP_US: i64 = 10_000_000;
const MIN_TIMEOUT_US: i64 = 10_000;

#[derive(Debug, Clone, Copy)]
pub struct RttEstimator {
    estimate_us: i64,
    deviation_us: i64,
}

impl Default for RttEstimator {
    fn default() -> Self {
        RttEstimator {
            estimate_us: INITIAL_ESTIMATE_US,
            deviation_us: INITIAL_DEVIATION_US,
        }
    }
}

impl RttEstimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a fresh round-trip sample, in microseconds. Must not be
    /// called for duplicate/retransmitted acks (Karn's algorithm).
    pub fn sample(&mut self, rtt_us: i64) {
        let diff = (rtt_us - self.estimate_us).abs();
        self.deviation_us =
            (BETA_NUM * diff + (BETA_DEN - BETA_NUM) * self.deviation_us) / BETA_DEN;
        self.estimate_us =
            (ALPHA_NUM * rtt_us + (ALPHA_DEN - ALPHA_NUM) * self.estimate_us) / ALPHA_DEN;
    }

    /// Socket receive timeout derived from the current estimate, floored
    /// so a tightly converged estimate (e.g. over loopback) never drives
    /// `set_recv_timeout` down to a zero duration, which some sockets
    /// treat as "block forever" rather than "poll".
    pub fn timeout(&self) -> Duration {
        let us = self.estimate_us + 4 * self.deviation_us;
        Duration::from_micros(us.max(MIN_TIMEOUT_US) as u64)
    }

    /// Doubles the estimate after a burst-wide timeout, the step the
    /// reference sender computes but never actually calls; without it
    /// the terminal cap below can never trigger.
    pub fn double_on_timeout(&mut self) {
        self.estimate_us *= 2;
    }

    /// Returns an error if the estimate has grown past the terminal cap.
    pub fn check_terminal_cap(&self) -> Result<(), (Duration, Duration)> {
        if self.estimate_us > TERMINAL_CAP_US {
            Err((
                Duration::from_micros(self.estimate_us as u64),
                Duration::from_micros(TERMINAL_CAP_US as u64),
            ))
        } else {
            Ok(())
        }
    }

    pub fn estimate(&self) -> Duration {
        Duration::from_micros(self.estimate_us.max(0) as u64)
    }
}
