//! Fixed-point decimal helpers
//!
//! Decimal cells travel as canonical text with exactly `scale` fraction
//! digits (`"12.50"` at scale 2). Storage engines keep the scaled integer
//! (`1250`).

use crate::value::{parse_number, Number};

/// Parses decimal text into a scaled integer, rounding half away from zero.
pub fn to_scaled(text: &str, scale: u8) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    if body.contains(['e', 'E']) {
        let float = parse_number(text)?.as_f64();
        return float_to_scaled(float, scale);
    }
    let (int_part, frac_part) = match body.split_once('.') {
        Some((i, f)) => (i, f),
        None => (body, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let scale = usize::from(scale);
    let mut digits: i128 = 0;
    for b in int_part.bytes() {
        digits = digits.checked_mul(10)?.checked_add(i128::from(b - b'0'))?;
    }
    let mut frac = frac_part.bytes();
    for _ in 0..scale {
        let d = frac.next().map(|b| b - b'0').unwrap_or(0);
        digits = digits.checked_mul(10)?.checked_add(i128::from(d))?;
    }
    if let Some(next) = frac.next() {
        if next >= b'5' {
            digits += 1;
        }
    }
    if negative {
        digits = -digits;
    }
    i64::try_from(digits).ok()
}

/// Converts a float to a scaled integer.
pub fn float_to_scaled(value: f64, scale: u8) -> Option<i64> {
    let scaled = (value * 10f64.powi(i32::from(scale))).round();
    if scaled.is_finite() && scaled >= i64::MIN as f64 && scaled <= i64::MAX as f64 {
        Some(scaled as i64)
    } else {
        None
    }
}

/// Converts a numeric value to a scaled integer.
pub fn number_to_scaled(number: Number, scale: u8) -> Option<i64> {
    match number {
        Number::Int(i) => i.checked_mul(10i64.checked_pow(u32::from(scale))?),
        Number::Float(f) => float_to_scaled(f, scale),
    }
}

/// Formats a scaled integer as canonical decimal text.
pub fn from_scaled(scaled: i64, scale: u8) -> String {
    if scale == 0 {
        return scaled.to_string();
    }
    let scale = usize::from(scale);
    let digits = scaled.unsigned_abs().to_string();
    let padded = format!("{:0>width$}", digits, width = scale + 1);
    let (int_part, frac_part) = padded.split_at(padded.len() - scale);
    let sign = if scaled < 0 { "-" } else { "" };
    format!("{}{}.{}", sign, int_part, frac_part)
}
