pub mod hwmon;
pub mod probe;

pub use hwmon::HwmonProbe;
pub use probe::ProbeSensor;
