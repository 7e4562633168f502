//! Numeric conversion helpers centralizing safe numeric casts.

use num_traits::cast::cast;

/// Clamp an i64 into the `u32` range (negative values become zero).
#[must_use]
pub fn clamp_i64_to_u32(value: i64) -> u32 {
    let max = i64::from(u32::MAX);
    cast::<i64, u32>(value.clamp(0, max)).unwrap_or(0)
}

/// Floor a f32 into the `usize` range, returning 0 for NaN or negative values.
#[must_use]
pub fn floor_f32_to_usize(value: f32) -> usize {
    if value.is_nan() || value <= 0.0 {
        return 0;
    }
    cast::<f32, usize>(value.floor()).unwrap_or(usize::MAX)
}

/// Round a f32 and clamp it to the u32 range, returning 0 for non-finite values.
#[must_use]
pub fn round_f32_to_u32(value: f32) -> u32 {
    if !value.is_finite() || value <= 0.0 {
        return 0;
    }
    cast::<f32, u32>(value.round()).unwrap_or(u32::MAX)
}

/// Convert a u32 to f32 while allowing precision loss in a single location.
#[must_use]
pub fn u32_to_f32(value: u32) -> f32 {
    cast::<u32, f32>(value).unwrap_or(0.0)
}

/// Convert a usize to f32 while allowing precision loss in a single location.
#[must_use]
pub fn usize_to_f32(value: usize) -> f32 {
    cast::<usize, f32>(value).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_floors_negatives_and_caps_large_values() {
        assert_eq!(clamp_i64_to_u32(-7), 0);
        assert_eq!(clamp_i64_to_u32(42), 42);
        assert_eq!(clamp_i64_to_u32(i64::MAX), u32::MAX);
    }

    #[test]
    fn floor_handles_nan_and_negatives() {
        assert_eq!(floor_f32_to_usize(f32::NAN), 0);
        assert_eq!(floor_f32_to_usize(-3.2), 0);
        assert_eq!(floor_f32_to_usize(5.99), 5);
    }

    #[test]
    fn rounders_cover_ranges() {
        assert_eq!(round_f32_to_u32(1.6), 2);
        assert_eq!(round_f32_to_u32(f32::INFINITY), 0);
        assert_eq!(round_f32_to_u32(-1.0), 0);
    }
}
