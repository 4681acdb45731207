use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Latest vertical speed shared between the sensor and audio threads
///
/// Holds the `f64` bit pattern in an atomic; the reader always sees the most
/// recent value and intermediate updates are simply overwritten. NaN marks
/// "nothing published yet".
#[derive(Clone, Debug)]
pub struct VarioHandle {
    bits: Arc<AtomicU64>,
}

impl VarioHandle {
    pub fn new() -> Self {
        Self {
            bits: Arc::new(AtomicU64::new(f64::NAN.to_bits())),
        }
    }

    /// Publish a new value; non-finite values are ignored
    pub fn publish(&self, vario: f64) {
        if vario.is_finite() {
            self.bits.store(vario.to_bits(), Ordering::Relaxed);
        }
    }

    pub fn latest(&self) -> Option<f64> {
        let value = f64::from_bits(self.bits.load(Ordering::Relaxed));
        (!value.is_nan()).then_some(value)
    }

    /// Back to "nothing published"
    pub fn clear(&self) {
        self.bits.store(f64::NAN.to_bits(), Ordering::Relaxed);
    }
}

impl Default for VarioHandle {
    fn default() -> Self {
        Self::new()
    }
}
