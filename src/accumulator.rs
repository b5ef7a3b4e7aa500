/// Rolling average accumulator for compensated probe readings
use log::warn;

use crate::models::{Diagnostics, Reading};

/// Fixed-capacity circular buffer of readings between drains
///
/// Writes advance a single position; when acquisition outpaces draining the
/// position wraps back to the start and the rollover flag latches so the
/// oldest samples are overwritten instead of growing the buffer. Only a
/// drain resets the position and the flag.
pub struct RollingBuffer {
    readings: Vec<Reading>,
    position: usize,
    rolled_over: bool,
    min_internal: f64,
    max_internal: f64,
}

impl RollingBuffer {
    pub fn new(capacity: usize) -> Self {
        RollingBuffer {
            readings: vec![
                Reading {
                    compensated: 0.0,
                    cold_junction: 0.0
                };
                capacity
            ],
            position: 0,
            rolled_over: false,
            min_internal: f64::INFINITY,
            max_internal: f64::NEG_INFINITY,
        }
    }

    pub fn capacity(&self) -> usize {
        self.readings.len()
    }

    /// True iff no samples have been stored since the last drain
    pub fn is_empty(&self) -> bool {
        self.position == 0 && !self.rolled_over
    }

    /// Store a reading at the current write position
    ///
    /// Wraps to the start and latches the rollover flag once more samples
    /// arrive than the buffer holds. The overrun is logged; it means the
    /// drain cadence is not keeping up with acquisition.
    pub fn push(&mut self, reading: Reading) {
        if self.position >= self.readings.len() {
            warn!(
                "Accumulator rolled over after {} samples without a drain",
                self.readings.len()
            );
            self.position = 0;
            self.rolled_over = true;
        }

        self.readings[self.position] = reading;
        self.position += 1;

        if reading.cold_junction < self.min_internal {
            self.min_internal = reading.cold_junction;
        }
        if reading.cold_junction > self.max_internal {
            self.max_internal = reading.cold_junction;
        }
    }

    /// Average the stored window and reset for the next acquisition cycle
    ///
    /// Returns the arithmetic mean over the valid region: the whole buffer
    /// when rolled over, otherwise everything written so far. Refuses on an
    /// empty buffer rather than dividing by zero.
    pub fn drain_average(&mut self) -> Option<f64> {
        if self.is_empty() {
            warn!("Drain requested on an empty accumulator");
            return None;
        }

        let count = if self.rolled_over {
            self.readings.len()
        } else {
            self.position
        };
        let sum: f64 = self.readings[..count].iter().map(|r| r.compensated).sum();

        self.position = 0;
        self.rolled_over = false;

        Some(sum / count as f64)
    }

    /// Snapshot of accumulator internals for the debug broadcast payload
    ///
    /// Captured before a drain resets position and rollover. The error
    /// counter is filled in by the state machine.
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            min_internal: self.min_internal,
            max_internal: self.max_internal,
            rolled_over: self.rolled_over,
            position: self.position,
            buffer: self.readings.iter().map(|r| r.compensated).collect(),
            capacity: self.readings.len(),
            read_errors: 0,
        }
    }
}
