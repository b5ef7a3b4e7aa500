/// Sensor adapter abstraction for thermocouple sampling
use crate::models::RawSample;

/// Source of raw sample pairs from the measurement circuit
///
/// A sample carries the cold-junction (reference) temperature, the raw
/// probe temperature, and the supply voltage reported alongside readings.
pub trait ProbeSensor {
    async fn read_raw(&mut self) -> Result<RawSample, String>;
}
