//! Numeric coercion shared by severity and significance

use serde_json::Value;

/// Percent change above which an unmatched numeric change is raised to medium
pub const SIGNIFICANT_CHANGE_PERCENT: f64 = 20.0;

/// Coerce a scalar to a decimal.
///
/// Numbers are taken as-is. Strings are accepted when they look like
/// `[+-]digits[.digits]`. Everything else, including booleans, is not numeric.
pub fn coerce_decimal(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_decimal(s),
        _ => None,
    }
}

fn parse_decimal(s: &str) -> Option<f64> {
    let body = s.strip_prefix(|c| c == '+' || c == '-').unwrap_or(s);
    let (int_part, frac_part) = match body.split_once('.') {
        Some((int_part, frac_part)) => (int_part, Some(frac_part)),
        None => (body, None),
    };

    if int_part.is_empty() || !int_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if let Some(frac) = frac_part {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
    }

    s.parse().ok()
}

fn coerce_pair(from: Option<&Value>, to: Option<&Value>) -> Option<(f64, f64)> {
    Some((coerce_decimal(from?)?, coerce_decimal(to?)?))
}

/// Whether `from → to` moves by more than [`SIGNIFICANT_CHANGE_PERCENT`].
///
/// A zero baseline counts any non-zero new value as significant.
pub fn is_significant_numeric_change(from: Option<&Value>, to: Option<&Value>) -> bool {
    let Some((from, to)) = coerce_pair(from, to) else {
        return false;
    };

    if from == 0.0 {
        return to != 0.0;
    }

    let percent = (to - from) / from * 100.0;
    percent.abs() > SIGNIFICANT_CHANGE_PERCENT
}

/// Whether `from → to` moves by less than `threshold_percent`.
///
/// Non-numeric pairs are never below threshold. A zero baseline is below
/// threshold only when the new value is zero too.
pub fn is_below_threshold(from: Option<&Value>, to: Option<&Value>, threshold_percent: f64) -> bool {
    let Some((from, to)) = coerce_pair(from, to) else {
        return false;
    };

    if from == 0.0 {
        return to == 0.0;
    }

    let percent = ((to - from) / from * 100.0).abs();
    percent < threshold_percent
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_coerce_decimal() {
        assert_eq!(coerce_decimal(&json!(42)), Some(42.0));
        assert_eq!(coerce_decimal(&json!(-1.5)), Some(-1.5));
        assert_eq!(coerce_decimal(&json!("100")), Some(100.0));
        assert_eq!(coerce_decimal(&json!("+3.25")), Some(3.25));
        assert_eq!(coerce_decimal(&json!("-7")), Some(-7.0));
        assert_eq!(coerce_decimal(&json!("22.04.1")), None);
        assert_eq!(coerce_decimal(&json!("v1")), None);
        assert_eq!(coerce_decimal(&json!("")), None);
        assert_eq!(coerce_decimal(&json!("1.")), None);
        assert_eq!(coerce_decimal(&json!(true)), None);
        assert_eq!(coerce_decimal(&json!(null)), None);
        assert_eq!(coerce_decimal(&json!([1])), None);
    }

    #[test]
    fn test_significant_numeric_change() {
        assert!(is_significant_numeric_change(Some(&json!(100)), Some(&json!(125))));
        assert!(is_significant_numeric_change(Some(&json!(100)), Some(&json!(70))));
        assert!(!is_significant_numeric_change(Some(&json!(100)), Some(&json!(110))));
        assert!(!is_significant_numeric_change(Some(&json!(100)), Some(&json!(120))));
        assert!(is_significant_numeric_change(Some(&json!("100")), Some(&json!(150.0))));
    }

    #[test]
    fn test_zero_baseline() {
        assert!(is_significant_numeric_change(Some(&json!(0)), Some(&json!(1))));
        assert!(!is_significant_numeric_change(Some(&json!(0)), Some(&json!(0))));
        assert!(is_below_threshold(Some(&json!(0)), Some(&json!(0)), 10.0));
        assert!(!is_below_threshold(Some(&json!(0)), Some(&json!(5)), 10.0));
    }

    #[test]
    fn test_one_sided_or_non_numeric() {
        assert!(!is_significant_numeric_change(None, Some(&json!(5))));
        assert!(!is_significant_numeric_change(Some(&json!("abc")), Some(&json!(5))));
        assert!(!is_below_threshold(Some(&json!(1)), None, 50.0));
        assert!(!is_below_threshold(Some(&json!("up")), Some(&json!("down")), 50.0));
    }

    #[test]
    fn test_below_threshold() {
        assert!(is_below_threshold(Some(&json!(100)), Some(&json!(105)), 10.0));
        assert!(is_below_threshold(Some(&json!(100)), Some(&json!(95)), 10.0));
        assert!(!is_below_threshold(Some(&json!(100)), Some(&json!(110)), 10.0));
        assert!(!is_below_threshold(Some(&json!(100)), Some(&json!(130)), 25.0));
    }
}
