//! # Scaled Field Codec
//!
//! Fixed-point packing of telemetry values into narrow bit fields.
//!
//! Two encodings are used by the legacy layouts:
//!
//! - **Linear**: `code = round(value * scale)`, stored in `width` bits
//!   (two's complement when signed).
//! - **Enscaled**: an exponent/mantissa form. Codes below `2^m` hold the
//!   value verbatim; larger values keep their top `m` bits plus a shift
//!   count in the `e` exponent bits. Signed fields add one sign bit and
//!   store the negated code in two's complement.
//!
//! Encoding rounds half away from zero and saturates. It never wraps: a
//! wrapped code would decode to a plausible but wrong value.
//!
//! Widths saturate too. A linear field is 1 to 32 bits wide; an enscaled
//! field keeps at most 30 mantissa bits and `mbits + ebits <= 31`, so the
//! signed form still fits in 32 bits. Larger widths are cut down to those
//! limits rather than overflowing a shift.

/// Widest field a `u32` code can hold
const MAX_WIDTH: u32 = 32;

/// Whether a field carries a sign
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signedness {
    Unsigned,
    Signed,
}

/// Result of encoding one value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaled {
    /// Field code, masked to the field width
    pub code: u32,
    /// Set when the input was out of range (or not a number) and got saturated
    pub clamped: bool,
}

/// Linear field width limited to 1..=32 bits
fn field_width(width: u32) -> u32 {
    width.clamp(1, MAX_WIDTH)
}

/// Mantissa and exponent widths limited so the signed field fits a `u32`
fn enscale_widths(mbits: u32, ebits: u32) -> (u32, u32) {
    let mbits = mbits.min(MAX_WIDTH - 2);
    (mbits, ebits.min(MAX_WIDTH - 1 - mbits))
}

fn mask(width: u32) -> u32 {
    if width >= 32 {
        u32::MAX
    } else {
        (1u32 << width) - 1
    }
}

/// Sign-extend the low `width` bits of `code`
pub fn sign_extend(code: u32, width: u32) -> i32 {
    let shift = MAX_WIDTH - field_width(width);
    ((code << shift) as i32) >> shift
}

/// Scale and round half away from zero; `None` for NaN
fn scale_round(value: f64, scale: f64) -> Option<f64> {
    let scaled = (value * scale).round();
    if scaled.is_nan() {
        None
    } else {
        Some(scaled)
    }
}

/// Encode `value` as a linear fixed-point field
///
/// # Examples
///
/// ```
/// use rf_legacy::legacy::scaled::{decode_scaled, encode_scaled, Signedness};
///
/// // -2.35 m/s at 0.1 m/s resolution in a 10-bit signed field
/// let scaled = encode_scaled(-2.35, 10, 10.0, Signedness::Signed);
/// assert!(!scaled.clamped);
/// assert_eq!(decode_scaled(scaled.code, 10, 10.0, Signedness::Signed), -2.4);
/// ```
pub fn encode_scaled(value: f64, width: u32, scale: f64, signedness: Signedness) -> Scaled {
    let width = field_width(width);
    let (min, max) = match signedness {
        Signedness::Signed => (-(1i64 << (width - 1)), (1i64 << (width - 1)) - 1),
        Signedness::Unsigned => (0, (1i64 << width) - 1),
    };

    let Some(raw) = scale_round(value, scale) else {
        return Scaled { code: 0, clamped: true };
    };

    let clamped = raw < min as f64 || raw > max as f64;
    let code = (raw as i64).clamp(min, max);

    Scaled {
        code: (code as u32) & mask(width),
        clamped,
    }
}

/// Decode a linear fixed-point field
pub fn decode_scaled(code: u32, width: u32, scale: f64, signedness: Signedness) -> f64 {
    let width = field_width(width);
    let raw = match signedness {
        Signedness::Signed => sign_extend(code & mask(width), width) as f64,
        Signedness::Unsigned => (code & mask(width)) as f64,
    };
    raw / scale
}

/// Largest magnitude code of an enscaled field
fn enscale_max_code(mbits: u32, ebits: u32) -> u32 {
    (1u32 << (mbits + ebits)) - 1
}

/// Exponent/mantissa encoding of a non-negative integer, saturating
fn enscale_magnitude(value: u64, mbits: u32, ebits: u32) -> (u32, bool) {
    let offset = 1u64 << mbits;
    if value < offset {
        return (value as u32, false);
    }

    let max_exp = (1u64 << ebits) - 1;
    let mut mantissa = offset.saturating_add(value);
    let mut exp = 0u64;
    while mantissa >= 2 * offset {
        mantissa >>= 1;
        exp += 1;
    }

    if exp > max_exp {
        return (enscale_max_code(mbits, ebits), true);
    }

    (((exp << mbits) | (mantissa - offset)) as u32, false)
}

fn descale_magnitude(code: u32, mbits: u32, ebits: u32) -> u64 {
    let code = code.min(enscale_max_code(mbits, ebits)) as u64;
    let offset = 1u64 << mbits;
    if code < offset {
        return code;
    }
    let exp = code >> mbits;
    let mantissa = (code & (offset - 1)) + offset;
    if exp + u64::from(mbits) + 1 > 64 {
        return u64::MAX;
    }
    (mantissa << exp) - offset
}

/// Encode `value` as an exponent/mantissa field
///
/// The field is `mbits + ebits` wide, plus one sign bit when signed.
///
/// # Examples
///
/// ```
/// use rf_legacy::legacy::scaled::{descale, enscale, Signedness};
///
/// // Ground speed, m/s times 10, enscaled(8,2)
/// let scaled = enscale(30.0, 8, 2, 10.0, Signedness::Unsigned);
/// assert_eq!(descale(scaled.code, 8, 2, 10.0, Signedness::Unsigned), 30.0);
/// ```
pub fn enscale(value: f64, mbits: u32, ebits: u32, scale: f64, signedness: Signedness) -> Scaled {
    let (mbits, ebits) = enscale_widths(mbits, ebits);
    let Some(raw) = scale_round(value, scale) else {
        return Scaled { code: 0, clamped: true };
    };

    match signedness {
        Signedness::Unsigned => {
            if raw < 0.0 {
                return Scaled { code: 0, clamped: true };
            }
            let (code, clamped) = enscale_magnitude(raw as u64, mbits, ebits);
            Scaled { code, clamped }
        }
        Signedness::Signed => {
            let width = mbits + ebits + 1;
            let (magnitude, clamped) = enscale_magnitude(raw.abs() as u64, mbits, ebits);
            let code = if raw < 0.0 {
                (-(magnitude as i32)) as u32
            } else {
                magnitude
            };
            Scaled {
                code: code & mask(width),
                clamped,
            }
        }
    }
}

/// Decode an exponent/mantissa field
pub fn descale(code: u32, mbits: u32, ebits: u32, scale: f64, signedness: Signedness) -> f64 {
    let (mbits, ebits) = enscale_widths(mbits, ebits);
    match signedness {
        Signedness::Unsigned => descale_magnitude(code & mask(mbits + ebits), mbits, ebits) as f64 / scale,
        Signedness::Signed => {
            let width = mbits + ebits + 1;
            let signed = sign_extend(code & mask(width), width);
            let magnitude = descale_magnitude(signed.unsigned_abs(), mbits, ebits) as f64;
            if signed < 0 {
                -magnitude / scale
            } else {
                magnitude / scale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_extend() {
        assert_eq!(sign_extend(0x1FF, 9), -1);
        assert_eq!(sign_extend(0x100, 9), -256);
        assert_eq!(sign_extend(0x0FF, 9), 255);
        assert_eq!(sign_extend(0x80, 8), -128);
    }

    #[test]
    fn test_linear_round_half_away_from_zero() {
        assert_eq!(encode_scaled(0.25, 8, 2.0, Signedness::Signed).code, 1);
        assert_eq!(encode_scaled(0.75, 8, 2.0, Signedness::Signed).code, 2);
        assert_eq!(encode_scaled(-0.25, 8, 2.0, Signedness::Signed).code, 0xFF);
        assert_eq!(encode_scaled(-0.75, 8, 2.0, Signedness::Signed).code, 0xFE);
    }

    #[test]
    fn test_linear_clamps_instead_of_wrapping() {
        let high = encode_scaled(60.0, 10, 10.0, Signedness::Signed);
        assert!(high.clamped);
        assert_eq!(high.code, 0x1FF);
        assert_eq!(decode_scaled(high.code, 10, 10.0, Signedness::Signed), 51.1);

        let low = encode_scaled(-60.0, 10, 10.0, Signedness::Signed);
        assert!(low.clamped);
        assert_eq!(low.code, 0x200);
        assert_eq!(decode_scaled(low.code, 10, 10.0, Signedness::Signed), -51.2);

        let negative = encode_scaled(-3.0, 13, 1.0, Signedness::Unsigned);
        assert!(negative.clamped);
        assert_eq!(negative.code, 0);

        let big = encode_scaled(9000.0, 13, 1.0, Signedness::Unsigned);
        assert!(big.clamped);
        assert_eq!(big.code, 8191);
    }

    #[test]
    fn test_linear_nan_is_clamped_to_zero() {
        let scaled = encode_scaled(f64::NAN, 10, 10.0, Signedness::Signed);
        assert!(scaled.clamped);
        assert_eq!(scaled.code, 0);
    }

    #[test]
    fn test_linear_infinity_saturates() {
        let scaled = encode_scaled(f64::INFINITY, 8, 1.0, Signedness::Signed);
        assert!(scaled.clamped);
        assert_eq!(scaled.code, 0x7F);
    }

    #[test]
    fn test_enscale_small_values_verbatim() {
        for value in 0..64u32 {
            let scaled = enscale(value as f64, 6, 2, 1.0, Signedness::Unsigned);
            assert_eq!(scaled.code, value);
            assert!(!scaled.clamped);
        }
    }

    #[test]
    fn test_enscale_known_codes() {
        // 100 in enscaled(6,2): 64 + 100 = 164 -> 82 after one shift -> code 64 | 18
        assert_eq!(enscale(100.0, 6, 2, 1.0, Signedness::Unsigned).code, 82);
        assert_eq!(descale(82, 6, 2, 1.0, Signedness::Unsigned), 100.0);

        // 1000 in enscaled(12,1) stays verbatim
        assert_eq!(enscale(1000.0, 12, 1, 1.0, Signedness::Unsigned).code, 1000);
    }

    #[test]
    fn test_enscale_saturates_at_max_code() {
        // largest value of enscaled(6,2): ((127) << 3) - 64 = 952
        assert_eq!(descale(0xFF, 6, 2, 1.0, Signedness::Unsigned), 952.0);

        let edge = enscale(952.0, 6, 2, 1.0, Signedness::Unsigned);
        assert_eq!(edge.code, 0xFF);
        assert!(!edge.clamped);

        let over = enscale(5000.0, 6, 2, 1.0, Signedness::Unsigned);
        assert_eq!(over.code, 0xFF);
        assert!(over.clamped);
    }

    #[test]
    fn test_enscale_is_monotonic() {
        let mut last = 0.0;
        for value in 0..4000u32 {
            let code = enscale(value as f64, 8, 2, 1.0, Signedness::Unsigned).code;
            let decoded = descale(code, 8, 2, 1.0, Signedness::Unsigned);
            assert!(decoded >= last, "value {} decoded to {} after {}", value, decoded, last);
            assert!(decoded <= value as f64);
            last = decoded;
        }
    }

    #[test]
    fn test_enscale_relative_error_bounded() {
        for value in 1..3800u32 {
            let code = enscale(value as f64, 8, 2, 1.0, Signedness::Unsigned).code;
            let decoded = descale(code, 8, 2, 1.0, Signedness::Unsigned);
            assert!((value as f64 - decoded) / (value as f64) < 1.0 / 256.0 + 1e-9);
        }
    }

    #[test]
    fn test_signed_enscale_twos_complement() {
        let positive = enscale(10.0, 6, 2, 10.0, Signedness::Signed);
        let negative = enscale(-10.0, 6, 2, 10.0, Signedness::Signed);
        assert_eq!(sign_extend(negative.code, 9), -sign_extend(positive.code, 9));
        assert_eq!(descale(negative.code, 6, 2, 10.0, Signedness::Signed), -10.0);
        assert_eq!(descale(positive.code, 6, 2, 10.0, Signedness::Signed), 10.0);
    }

    #[test]
    fn test_signed_enscale_extreme_climb() {
        let climb = enscale(150.0, 6, 2, 10.0, Signedness::Signed);
        assert!(climb.clamped);
        assert_eq!(climb.code, 0x0FF);
        assert_eq!(descale(climb.code, 6, 2, 10.0, Signedness::Signed), 95.2);

        let sink = enscale(-150.0, 6, 2, 10.0, Signedness::Signed);
        assert!(sink.clamped);
        assert_eq!(sink.code, 0x101);
        assert_eq!(descale(sink.code, 6, 2, 10.0, Signedness::Signed), -95.2);
    }

    #[test]
    fn test_unsigned_enscale_negative_clamps_to_zero() {
        let scaled = enscale(-1.0, 8, 2, 10.0, Signedness::Unsigned);
        assert!(scaled.clamped);
        assert_eq!(scaled.code, 0);
    }

    #[test]
    fn test_linear_width_saturates() {
        // zero width behaves as one bit
        assert_eq!(encode_scaled(1.0, 0, 1.0, Signedness::Unsigned).code, 1);
        assert_eq!(sign_extend(1, 0), -1);
        assert_eq!(decode_scaled(1, 0, 1.0, Signedness::Signed), -1.0);

        // anything wider than a u32 is 32 bits
        let wide = encode_scaled(-1.0, 33, 1.0, Signedness::Signed);
        assert_eq!(wide.code, u32::MAX);
        assert_eq!(decode_scaled(wide.code, 40, 1.0, Signedness::Signed), -1.0);
        assert_eq!(sign_extend(0x8000_0000, 64), i32::MIN);
    }

    #[test]
    fn test_enscale_width_saturates() {
        assert_eq!(enscale_widths(6, 2), (6, 2));
        assert_eq!(enscale_widths(20, 20), (20, 11));
        assert_eq!(enscale_widths(40, 0), (30, 0));
        assert_eq!(enscale_widths(40, 9), (30, 1));

        let scaled = enscale(1e12, 20, 20, 1.0, Signedness::Signed);
        assert!(!scaled.clamped);
        assert!(descale(scaled.code, 20, 20, 1.0, Signedness::Signed) > 0.0);

        // huge exponents saturate instead of overflowing the shift
        let top = descale(u32::MAX, 4, 31, 1.0, Signedness::Unsigned);
        assert_eq!(top, u64::MAX as f64);
    }

    #[test]
    fn test_descale_of_unused_negative_code() {
        // -256 is never produced; it saturates to the largest magnitude
        assert_eq!(descale(0x100, 6, 2, 1.0, Signedness::Signed), -952.0);
    }
}
