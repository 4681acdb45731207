use crate::error::{Result, VarioError};

/// Control point of a piecewise-linear curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub x: f64,
    pub y: f64,
}

/// Piecewise-linear function over control points sorted by `x`
///
/// Between neighbours the value is interpolated linearly; outside the
/// covered domain it is held flat at the first/last point's `y`. Points on
/// the axes (`x == 0` or `y == 0`) are ordinary points, so a "zero climb
/// maps to the baseline frequency" anchor works as expected.
///
/// # Example
/// ```
/// use variotone::tone::PiecewiseLinear;
///
/// let curve = PiecewiseLinear::from_points([(0.0, 300.0), (10.0, 1800.0)]);
/// assert_eq!(curve.value_at(5.0), 1050.0);
/// assert_eq!(curve.value_at(-1.0), 300.0);
/// assert_eq!(curve.value_at(42.0), 1800.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct PiecewiseLinear {
    points: Vec<ControlPoint>,
    fallback: f64,
}

impl PiecewiseLinear {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_points<I>(points: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut curve = Self::new();
        for (x, y) in points {
            curve.add_point(x, y);
        }
        curve
    }

    /// Value returned by [`value_at`](Self::value_at) on an empty curve in
    /// release builds
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Insert a point, keeping `x` strictly increasing
    ///
    /// A point at an existing `x` replaces that point's `y`. Returns `false`
    /// (and leaves the curve unchanged) for non-finite coordinates.
    pub fn add_point(&mut self, x: f64, y: f64) -> bool {
        if !(x.is_finite() && y.is_finite()) {
            return false;
        }

        let point = ControlPoint { x, y };
        match self.points.binary_search_by(|p| p.x.total_cmp(&x)) {
            Ok(index) => self.points[index] = point,
            Err(index) => self.points.insert(index, point),
        }
        true
    }

    /// Evaluate the curve, failing on an empty curve
    pub fn try_value_at(&self, x: f64) -> Result<f64> {
        let (first, last) = match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => (first, last),
            _ => return Err(VarioError::InterpolationDomainEmpty),
        };
        if x.is_nan() {
            return Err(VarioError::NonFiniteInput("curve input"));
        }

        if x <= first.x {
            return Ok(first.y);
        }
        if x >= last.x {
            return Ok(last.y);
        }

        // First knot strictly right of x; x > first.x guarantees index >= 1
        let upper = self.points.partition_point(|p| p.x <= x);
        let p0 = self.points[upper - 1];
        let p1 = self.points[upper];

        let ratio = (x - p0.x) / (p1.x - p0.x);
        Ok(p0.y + ratio * (p1.y - p0.y))
    }

    /// Evaluate the curve
    ///
    /// Querying an empty curve is a programming error: it panics in debug
    /// builds and returns the fallback value in release builds.
    pub fn value_at(&self, x: f64) -> f64 {
        debug_assert!(!self.points.is_empty(), "value_at on an empty curve");
        self.try_value_at(x).unwrap_or(self.fallback)
    }

    pub fn points(&self) -> &[ControlPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
