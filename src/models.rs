#[derive(Debug, Clone, Copy)]
pub struct RawSample {
    pub cold_junction: f64,
    pub probe: f64,
    pub supply_voltage: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct Reading {
    pub compensated: f64,
    pub cold_junction: f64,
}

#[derive(Debug, Clone)]
pub struct AveragedWindow {
    pub average: f64,
    pub samples: usize,
    pub supply_voltage: f64,
    pub diagnostics: Diagnostics,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub min_internal: f64,
    pub max_internal: f64,
    pub rolled_over: bool,
    pub position: usize,
    pub buffer: Vec<f64>,
    pub capacity: usize,
    pub read_errors: u32,
}
