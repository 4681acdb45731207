use crate::config::{CurveKind, CurveSpec, MappingConfig};
use crate::error::{Result, VarioError};
use crate::tone::PiecewiseLinear;

/// Climb-rate (m/s) to tone frequency (Hz), piecewise-linear preset
const FREQUENCY_TABLE: [(f64, f64); 20] = [
    (0.00, 300.0),
    (0.20, 350.0),
    (0.40, 400.0),
    (0.60, 450.0),
    (0.80, 500.0),
    (1.00, 550.0),
    (1.25, 600.0),
    (1.50, 650.0),
    (1.75, 700.0),
    (2.00, 750.0),
    (2.25, 800.0),
    (2.50, 850.0),
    (3.50, 950.0),
    (4.24, 1050.0),
    (5.00, 1150.0),
    (6.00, 1300.0),
    (7.00, 1450.0),
    (8.00, 1600.0),
    (9.00, 1700.0),
    (10.00, 1800.0),
];

/// Climb-rate (m/s) to beep cycle length (ms); finer steps in weak lift
const CYCLE_TABLE: [(f64, f64); 20] = [
    (0.00, 400.0),
    (0.20, 380.0),
    (0.40, 360.0),
    (0.60, 340.0),
    (0.80, 320.0),
    (1.00, 300.0),
    (1.25, 280.0),
    (1.50, 260.0),
    (1.75, 240.0),
    (2.00, 220.0),
    (2.25, 200.0),
    (2.50, 180.0),
    (3.50, 160.0),
    (4.24, 140.0),
    (5.00, 120.0),
    (6.00, 100.0),
    (7.00, 90.0),
    (8.00, 80.0),
    (9.00, 70.0),
    (10.00, 60.0),
];

const DUTY_TABLE: [(f64, f64); 4] = [(0.0, 0.40), (2.0, 0.50), (5.0, 0.60), (10.0, 0.70)];

const FREQUENCY_POLY: [f64; 4] = [440.0, 120.0, -4.0, 0.1];
const CYCLE_POLY: [f64; 3] = [500.0, -60.0, 2.2];
const DUTY_POLY: [f64; 3] = [0.35, 0.04, -0.0015];

const FIXED_FREQUENCY_HZ: f64 = 700.0;
const FIXED_CYCLE_MS: f64 = 300.0;
const FIXED_DUTY: f64 = 0.5;

/// Scalar mapping from climb rate to one tone parameter
///
/// The tone controller only ever calls [`value_at`](Self::value_at), so the
/// shape of each mapping can be swapped without touching the state machine
/// or the synthesizer.
#[derive(Debug, Clone)]
pub enum Curve {
    LinearTable(PiecewiseLinear),
    /// Coefficients, lowest order first
    Polynomial(Vec<f64>),
    Fixed(f64),
}

impl Curve {
    pub fn value_at(&self, x: f64) -> f64 {
        match self {
            Self::LinearTable(table) => table.value_at(x),
            Self::Polynomial(coefficients) => coefficients
                .iter()
                .rev()
                .fold(0.0, |acc, &c| acc * x + c),
            Self::Fixed(value) => *value,
        }
    }

    pub fn from_spec(spec: &CurveSpec) -> Result<Self> {
        match spec {
            CurveSpec::Table { points } => {
                let table = PiecewiseLinear::from_points(points.iter().map(|p| (p[0], p[1])));
                if table.is_empty() {
                    return Err(VarioError::Config("curve table has no usable points".into()));
                }
                Ok(Self::LinearTable(table))
            }
            CurveSpec::Polynomial { coefficients } => {
                if coefficients.is_empty() || coefficients.iter().any(|c| !c.is_finite()) {
                    return Err(VarioError::Config(
                        "polynomial needs finite coefficients".into(),
                    ));
                }
                Ok(Self::Polynomial(coefficients.clone()))
            }
            CurveSpec::Fixed { value } => {
                if !value.is_finite() {
                    return Err(VarioError::Config("fixed curve value must be finite".into()));
                }
                Ok(Self::Fixed(*value))
            }
        }
    }
}

/// Raw tone parameters for one climb rate, before clamping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneParameters {
    pub frequency_hz: f64,
    pub cycle_ms: f64,
    pub duty: f64,
}

/// The three curves that shape the climb tone
#[derive(Debug, Clone)]
pub struct ToneMapping {
    pub frequency: Curve,
    pub cycle_ms: Curve,
    pub duty: Curve,
}

impl ToneMapping {
    pub fn preset(kind: CurveKind) -> Self {
        match kind {
            CurveKind::Table => Self {
                frequency: Curve::LinearTable(PiecewiseLinear::from_points(FREQUENCY_TABLE)),
                cycle_ms: Curve::LinearTable(PiecewiseLinear::from_points(CYCLE_TABLE)),
                duty: Curve::LinearTable(PiecewiseLinear::from_points(DUTY_TABLE)),
            },
            CurveKind::Polynomial => Self {
                frequency: Curve::Polynomial(FREQUENCY_POLY.to_vec()),
                cycle_ms: Curve::Polynomial(CYCLE_POLY.to_vec()),
                duty: Curve::Polynomial(DUTY_POLY.to_vec()),
            },
            CurveKind::Fixed => Self {
                frequency: Curve::Fixed(FIXED_FREQUENCY_HZ),
                cycle_ms: Curve::Fixed(FIXED_CYCLE_MS),
                duty: Curve::Fixed(FIXED_DUTY),
            },
        }
    }

    pub fn from_config(config: &MappingConfig) -> Result<Self> {
        Ok(Self {
            frequency: Curve::from_spec(&config.frequency)?,
            cycle_ms: Curve::from_spec(&config.cycle_ms)?,
            duty: Curve::from_spec(&config.duty)?,
        })
    }

    pub fn evaluate(&self, vario: f64) -> ToneParameters {
        ToneParameters {
            frequency_hz: self.frequency.value_at(vario),
            cycle_ms: self.cycle_ms.value_at(vario),
            duty: self.duty.value_at(vario),
        }
    }
}
