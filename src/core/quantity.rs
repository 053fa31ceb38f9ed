//! Export quantity calculation
//!
//! `export_quantity = packaging_method × packaging_count × box_count`. The function is
//! total: absent or non-numeric inputs count as zero, and products saturate instead of
//! overflowing.

use serde_json::Value;

/// Computes the export quantity of one line
///
/// # Examples
///
/// ```
/// use packline::core::quantity::compute;
///
/// assert_eq!(compute(5, 2, 10), 100);
/// assert_eq!(compute(5, 0, 10), 0);
/// ```
pub fn compute(packaging_method: u32, packaging_count: u32, box_count: u32) -> u64 {
    u64::from(packaging_method)
        .saturating_mul(u64::from(packaging_count))
        .saturating_mul(u64::from(box_count))
}

/// Coerces free-form user input to a non-negative integer
///
/// Leading whitespace is ignored and the leading run of ASCII digits is taken, so
/// `"12 boxes"` is 12. Blank input, garbage and negative numbers are 0. Values beyond
/// `u32::MAX` saturate.
///
/// # Examples
///
/// ```
/// use packline::core::quantity::coerce;
///
/// assert_eq!(coerce("12"), 12);
/// assert_eq!(coerce(" 7pcs"), 7);
/// assert_eq!(coerce("-3"), 0);
/// assert_eq!(coerce("abc"), 0);
/// ```
pub fn coerce(input: &str) -> u32 {
    let trimmed = input.trim_start();
    let trimmed = trimmed.strip_prefix('+').unwrap_or(trimmed);

    let digits: &str = {
        let end = trimmed
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        &trimmed[..end]
    };

    if digits.is_empty() {
        return 0;
    }

    digits
        .bytes()
        .fold(0u64, |acc, b| {
            acc.saturating_mul(10)
                .saturating_add(u64::from(b - b'0'))
                .min(u64::from(u32::MAX))
        })
        .try_into()
        .unwrap_or(u32::MAX)
}

/// Coerces a JSON value from an imported document
///
/// Numbers are truncated toward zero, strings go through [`coerce`], everything else is 0.
pub fn coerce_value(value: &Value) -> u32 {
    match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                u32::try_from(u).unwrap_or(u32::MAX)
            } else if let Some(f) = n.as_f64() {
                if f.is_finite() && f > 0.0 {
                    // float-to-int `as` saturates
                    f.trunc() as u32
                } else {
                    0
                }
            } else {
                0
            }
        }
        Value::String(s) => coerce(s),
        _ => 0,
    }
}

/// Computes the export quantity directly from raw inputs
pub fn compute_lenient(packaging_method: &Value, packaging_count: &Value, box_count: &Value) -> u64 {
    compute(
        coerce_value(packaging_method),
        coerce_value(packaging_count),
        coerce_value(box_count),
    )
}
