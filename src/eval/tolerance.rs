//! Numeric equality under relative and absolute tolerance.

pub const DEFAULT_RELATIVE_TOLERANCE: f64 = 1e-3;
pub const DEFAULT_ABSOLUTE_TOLERANCE: f64 = 1e-4;

/// True when the two values agree within the absolute bound or the relative
/// bound. The relative branch is symmetric in its arguments and degenerates
/// to exact equality against a zero gold value, where only the absolute
/// bound can succeed.
pub fn matches(predicted: f64, gold: f64, rel_tol: f64, abs_tol: f64) -> bool {
    let diff = (predicted - gold).abs();
    diff <= abs_tol || diff <= rel_tol * predicted.abs().max(gold.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_match(a: f64, b: f64) -> bool {
        matches(a, b, DEFAULT_RELATIVE_TOLERANCE, DEFAULT_ABSOLUTE_TOLERANCE)
    }

    #[test]
    fn boundary_cases() {
        assert!(default_match(60.94, 60.9401));
        assert!(default_match(100.0, 100.09));
        assert!(!default_match(100.0, 100.2));
    }

    #[test]
    fn symmetric_in_arguments() {
        let pairs = [
            (60.94, 60.9401),
            (100.0, 100.09),
            (100.0, 100.2),
            (-35.8, -35.79),
            (0.001, 0.0),
            (1e9, 1e9 + 1.0),
        ];
        for (a, b) in pairs {
            assert_eq!(default_match(a, b), default_match(b, a), "({a}, {b})");
        }
    }

    #[test]
    fn zero_gold_needs_absolute_bound() {
        assert!(default_match(0.0, 0.0));
        assert!(!default_match(0.001, 0.0));
        assert!(default_match(0.00005, 0.0));
    }

    #[test]
    fn negative_values() {
        assert!(default_match(-35.8, -35.8001));
        assert!(!default_match(-35.8, 35.8));
    }
}
