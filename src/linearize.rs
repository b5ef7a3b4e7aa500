/// Cold-junction compensation for type K thermocouple readings
use log::warn;

// Type K thermocouple constants (NIST ITS-90)
const SENSITIVITY_MV_PER_C: f64 = 0.041276; // Seebeck coefficient near room temperature
const VOLTAGE_LOW_MV: f64 = -5.891; // Lower bound of the inverse tables
const VOLTAGE_MID_MV: f64 = 20.644; // 0 mV..this: 0..500 C inverse range
const VOLTAGE_HIGH_MV: f64 = 54.886; // Upper bound of the inverse tables

// Direct polynomial, T < 0 C (temperature in C -> thermoelectric voltage in mV)
const DIRECT_NEGATIVE: [f64; 11] = [
    0.000000000000E+00,
    0.394501280250E-01,
    0.236223735980E-04,
    -0.328589067840E-06,
    -0.499048287770E-08,
    -0.675090591730E-10,
    -0.574103274280E-12,
    -0.310888728940E-14,
    -0.104516093650E-16,
    -0.198892668780E-19,
    -0.163226974860E-22,
];

// Direct polynomial, 0 C <= T <= 1372 C, plus an exponential correction term
const DIRECT_POSITIVE: [f64; 10] = [
    -0.176004136860E-01,
    0.389212049750E-01,
    0.185587700320E-04,
    -0.994575928740E-07,
    0.318409457190E-09,
    -0.560728448890E-12,
    0.560750590590E-15,
    -0.320207200030E-18,
    0.971511471520E-22,
    -0.121047212750E-25,
];
const EXP_A0: f64 = 0.118597600000E+00;
const EXP_A1: f64 = -0.118343200000E-03;
const EXP_A2: f64 = 0.126968600000E+03;

// Inverse polynomials (voltage in mV -> temperature in C), three disjoint ranges
const INVERSE_NEGATIVE: [f64; 10] = [
    0.0000000E+00,
    2.5173462E+01,
    -1.1662878E+00,
    -1.0833638E+00,
    -8.9773540E-01,
    -3.7342377E-01,
    -8.6632643E-02,
    -1.0450598E-02,
    -5.1920577E-04,
    0.0000000E+00,
];
const INVERSE_MID: [f64; 10] = [
    0.000000E+00,
    2.508355E+01,
    7.860106E-02,
    -2.503131E-01,
    8.315270E-02,
    -1.228034E-02,
    9.804036E-04,
    -4.413030E-05,
    1.057734E-06,
    -1.052755E-08,
];
const INVERSE_HIGH: [f64; 10] = [
    -1.318058E+02,
    4.830222E+01,
    -1.646031E+00,
    5.464731E-02,
    -9.650715E-04,
    8.802193E-06,
    -3.110810E-08,
    0.0,
    0.0,
    0.0,
];

/// Compensate a raw probe reading for cold-junction drift
///
/// Converts the probe/cold-junction difference to an equivalent thermocouple
/// voltage, adds the cold junction's own thermoelectric voltage, and inverts
/// the sum back to a temperature using the published inverse tables.
///
/// # Arguments
/// * `cold_junction` - Cold-junction (reference) temperature in C
/// * `probe` - Raw probe temperature in C
///
/// # Returns
/// Some(compensated temperature in C), or None if the summed voltage falls
/// outside the inverse table range
pub fn linearize(cold_junction: f64, probe: f64) -> Option<f64> {
    let thermocouple_voltage = (probe - cold_junction) * SENSITIVITY_MV_PER_C;
    let total_voltage = thermocouple_voltage + cold_junction_voltage(cold_junction);
    inverse_temperature(total_voltage)
}

/// Thermoelectric voltage of the cold junction itself, in mV
fn cold_junction_voltage(cold_junction: f64) -> f64 {
    if cold_junction < 0.0 {
        polynomial(&DIRECT_NEGATIVE, cold_junction)
    } else {
        let exponential =
            EXP_A0 * (EXP_A1 * (cold_junction - EXP_A2) * (cold_junction - EXP_A2)).exp();
        polynomial(&DIRECT_POSITIVE, cold_junction) + exponential
    }
}

/// Invert a summed thermocouple voltage back to a temperature
fn inverse_temperature(voltage_mv: f64) -> Option<f64> {
    let coefficients = if (VOLTAGE_LOW_MV..0.0).contains(&voltage_mv) {
        &INVERSE_NEGATIVE
    } else if (0.0..VOLTAGE_MID_MV).contains(&voltage_mv) {
        &INVERSE_MID
    } else if (VOLTAGE_MID_MV..=VOLTAGE_HIGH_MV).contains(&voltage_mv) {
        &INVERSE_HIGH
    } else {
        warn!("Voltage {:.3} mV outside linearization range", voltage_mv);
        return None;
    };
    Some(polynomial(coefficients, voltage_mv))
}

// Horner evaluation, coefficients ordered by ascending power
fn polynomial(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cold_junction_voltage_matches_reference_table() {
        // NIST table: E(25 C) = 1.000 mV, E(-10 C) = -0.392 mV
        assert!((cold_junction_voltage(25.0) - 1.0002).abs() < 5e-4);
        assert!((cold_junction_voltage(-10.0) - (-0.3919)).abs() < 5e-4);
    }

    #[test]
    fn linearize_matches_reference_near_room_temperature() {
        let compensated = linearize(25.0, 25.5).expect("in range");
        assert!((compensated - 25.5).abs() < 0.01);
    }

    #[test]
    fn linearize_is_near_identity_at_zero() {
        let compensated = linearize(0.0, 0.0).expect("in range");
        assert!(compensated.abs() < 0.01);
    }

    #[test]
    fn inverse_ranges_meet_at_500_degrees() {
        let boundary = inverse_temperature(VOLTAGE_MID_MV).expect("in range");
        assert!((boundary - 500.0).abs() < 0.1);
    }

    #[test]
    fn out_of_range_voltage_is_rejected() {
        // 2000 C difference pushes the summed voltage far past the table end
        assert!(linearize(25.0, 2000.0).is_none());
        assert!(linearize(25.0, -2000.0).is_none());
        assert!(inverse_temperature(VOLTAGE_HIGH_MV + 0.001).is_none());
    }

    #[test]
    fn linearize_is_deterministic() {
        assert_eq!(linearize(22.3, 147.9), linearize(22.3, 147.9));
    }
}
