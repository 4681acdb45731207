use crate::constants::{BAROMETRIC_EXPONENT, BAROMETRIC_SCALE_M};

/// Altitude in meters above the reference level for a pressure in hPa
///
/// Simplified international barometric formula:
/// `44330 * (1 - (p / p0)^0.19)`.
pub fn pressure_to_altitude(pressure_hpa: f64, sea_level_hpa: f64) -> f64 {
    BAROMETRIC_SCALE_M * (1.0 - (pressure_hpa / sea_level_hpa).powf(BAROMETRIC_EXPONENT))
}

/// Inverse of [`pressure_to_altitude`]
pub fn altitude_to_pressure(altitude_m: f64, sea_level_hpa: f64) -> f64 {
    sea_level_hpa * (1.0 - altitude_m / BAROMETRIC_SCALE_M).powf(1.0 / BAROMETRIC_EXPONENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::SEA_LEVEL_PRESSURE_HPA;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_sea_level_is_zero() {
        assert_abs_diff_eq!(
            pressure_to_altitude(SEA_LEVEL_PRESSURE_HPA, SEA_LEVEL_PRESSURE_HPA),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_lower_pressure_is_higher() {
        let alt = pressure_to_altitude(900.0, SEA_LEVEL_PRESSURE_HPA);
        assert!(alt > 950.0 && alt < 1100.0, "altitude {alt}");
    }

    #[test]
    fn test_inverse() {
        for altitude in [-200.0, 0.0, 500.0, 1500.0, 4000.0] {
            let p = altitude_to_pressure(altitude, SEA_LEVEL_PRESSURE_HPA);
            assert_abs_diff_eq!(
                pressure_to_altitude(p, SEA_LEVEL_PRESSURE_HPA),
                altitude,
                epsilon = 1e-6
            );
        }
    }
}
