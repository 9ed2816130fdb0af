//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Convert a usize to f64 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    cast::<usize, f64>(value).unwrap_or(0.0)
}

/// Convert a u64 to f64 while allowing precision loss in a single location.
#[must_use]
pub fn u64_to_f64(value: u64) -> f64 {
    cast::<u64, f64>(value).unwrap_or(0.0)
}

/// Floor a f64 and clamp it to the u32 range, returning 0 for non-finite values.
#[must_use]
pub fn floor_f64_to_u32(value: f64) -> u32 {
    if !value.is_finite() {
        return 0;
    }
    let clamped = value.clamp(0.0, f64::from(u32::MAX)).floor();
    cast::<f64, u32>(clamped).unwrap_or(0)
}

/// Map a unit-interval sample onto `0..len`, never returning `len` itself.
///
/// Returns 0 for an empty range or a non-finite sample.
#[must_use]
pub fn unit_to_index(sample: f64, len: usize) -> usize {
    if len == 0 || !sample.is_finite() {
        return 0;
    }
    let scaled = (sample.max(0.0) * usize_to_f64(len)).floor();
    cast::<f64, usize>(scaled).unwrap_or(0).min(len - 1)
}

/// `numerator / denominator`, or 0.0 when the denominator is zero.
#[must_use]
pub fn ratio(numerator: u32, denominator: u32) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        f64::from(numerator) / f64::from(denominator)
    }
}
