/// Acquisition/broadcast state machine
use log::{debug, error, info};
use time::OffsetDateTime;

use crate::accumulator::RollingBuffer;
use crate::linearize::linearize;
use crate::models::{AveragedWindow, Reading};
use crate::sensor::ProbeSensor;
use crate::trigger::TickEvents;
use crate::utils::format_datetime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    Idle,
    Acquiring,
    ReadyToBroadcast,
}

/// Owns the accumulator and serializes every transition of the pipeline
///
/// One tick consumes the pending trigger events, handles a broadcast request
/// first (a drain must never wait on a sample), then starts or continues
/// acquisition. A successful drain is handed back to the caller for
/// transmission; the machine itself never touches the network.
pub struct ProbeStateMachine {
    state: TriggerState,
    accumulator: RollingBuffer,
    broadcast_done: bool,
    last_read_failed: bool,
    read_errors: u32,
    last_supply_voltage: f64,
}

impl ProbeStateMachine {
    pub fn new(buffer_capacity: usize) -> Self {
        ProbeStateMachine {
            state: TriggerState::Idle,
            accumulator: RollingBuffer::new(buffer_capacity),
            broadcast_done: false,
            last_read_failed: false,
            read_errors: 0,
            last_supply_voltage: 0.0,
        }
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn read_errors(&self) -> u32 {
        self.read_errors
    }

    /// Run one tick of the poll loop
    ///
    /// Returns the drained window when a broadcast request was honored this
    /// tick; the caller transmits it.
    pub async fn tick<S: ProbeSensor>(
        &mut self,
        events: TickEvents,
        sensor: &mut S,
    ) -> Option<AveragedWindow> {
        let mut want_acquire = events.acquire;
        let mut want_broadcast = events.broadcast;

        // An edge means "stop and broadcast" while acquiring, "start" otherwise
        if events.edge {
            if self.state == TriggerState::Acquiring {
                want_broadcast = true;
            } else {
                want_acquire = true;
            }
        }

        let drained = if want_broadcast {
            self.on_broadcast_request()
        } else {
            None
        };

        if want_acquire {
            self.begin_acquisition();
        }

        if self.state == TriggerState::Acquiring {
            self.sample(sensor).await;
        }

        drained
    }

    fn begin_acquisition(&mut self) {
        info!(
            "Acquisition started at: {}",
            format_datetime(&OffsetDateTime::now_utc())
        );
        self.broadcast_done = false;
        self.state = TriggerState::Acquiring;
    }

    /// Honor a broadcast request, or refuse it
    ///
    /// Idempotent per acquisition cycle: once a drain succeeded, repeats are
    /// no-ops until the next acquire. An empty accumulator or a failed most
    /// recent read suppresses the whole cycle's broadcast.
    fn on_broadcast_request(&mut self) -> Option<AveragedWindow> {
        if self.broadcast_done {
            debug!("Broadcast already performed for this acquisition cycle");
            return None;
        }

        if self.state == TriggerState::Acquiring {
            info!(
                "Acquisition stopped at: {}",
                format_datetime(&OffsetDateTime::now_utc())
            );
        }
        self.state = TriggerState::ReadyToBroadcast;

        if self.last_read_failed {
            error!("Broadcast suppressed: most recent sensor read failed");
            return None;
        }
        if self.accumulator.is_empty() {
            error!("Broadcast suppressed: no readings accumulated");
            return None;
        }

        let mut diagnostics = self.accumulator.diagnostics();
        diagnostics.read_errors = self.read_errors;
        let samples = if diagnostics.rolled_over {
            diagnostics.capacity
        } else {
            diagnostics.position
        };

        let average = self.accumulator.drain_average()?;
        self.broadcast_done = true;
        self.state = TriggerState::Idle;

        Some(AveragedWindow {
            average,
            samples,
            supply_voltage: self.last_supply_voltage,
            diagnostics,
        })
    }

    async fn sample<S: ProbeSensor>(&mut self, sensor: &mut S) {
        let raw = match sensor.read_raw().await {
            Ok(raw) => raw,
            Err(e) => {
                self.record_read_failure(&e);
                return;
            }
        };

        if raw.cold_junction.is_nan() || raw.probe.is_nan() {
            self.record_read_failure("sensor returned NaN");
            return;
        }

        match linearize(raw.cold_junction, raw.probe) {
            Some(compensated) => {
                self.last_read_failed = false;
                self.last_supply_voltage = raw.supply_voltage;
                self.accumulator.push(Reading {
                    compensated,
                    cold_junction: raw.cold_junction,
                });
                debug!(
                    "Sample {:.2} C (cold junction {:.2} C)",
                    compensated, raw.cold_junction
                );
            }
            None => self.record_read_failure("reading outside linearization range"),
        }
    }

    // Transient by definition: the next acquiring tick retries
    fn record_read_failure(&mut self, reason: &str) {
        self.read_errors += 1;
        self.last_read_failed = true;
        error!("Sensor read failed: {}", reason);
    }
}
