//! Kubernetes resource quantities (`500m`, `2Gi`, `1e3`, `0.5`).

use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

const KI: f64 = 1024.0;

// Binary suffixes first so "Mi" is not read as "M" followed by garbage
const SUFFIXES: [(&str, f64); 13] = [
    ("Ki", KI),
    ("Mi", KI * KI),
    ("Gi", KI * KI * KI),
    ("Ti", KI * KI * KI * KI),
    ("Pi", KI * KI * KI * KI * KI),
    ("Ei", KI * KI * KI * KI * KI * KI),
    ("m", 1e-3),
    ("k", 1e3),
    ("M", 1e6),
    ("G", 1e9),
    ("T", 1e12),
    ("P", 1e15),
    ("E", 1e18),
];

/// A parsed quantity, keeping the original text for error messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    raw: String,
    value: f64,
}

impl Quantity {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }

        let (number, multiplier) = SUFFIXES
            .iter()
            .find_map(|(suffix, multiplier)| {
                trimmed
                    .strip_suffix(suffix)
                    .map(|number| (number, *multiplier))
            })
            .unwrap_or((trimmed, 1.0));

        let value: f64 = number.parse().ok()?;
        if !value.is_finite() || value < 0.0 {
            return None;
        }

        Some(Self {
            raw: trimmed.to_string(),
            value: value * multiplier,
        })
    }

    /// Accepts both the string form and bare JSON numbers.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Self::parse(s),
            Value::Number(n) => Self::parse(&n.to_string()),
            _ => None,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

impl PartialOrd for Quantity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("500m", 0.5)]
    #[case("2", 2.0)]
    #[case("1.5", 1.5)]
    #[case("1k", 1000.0)]
    #[case("1Ki", 1024.0)]
    #[case("2Gi", 2.0 * 1024.0 * 1024.0 * 1024.0)]
    #[case("128Mi", 128.0 * 1024.0 * 1024.0)]
    #[case("1e3", 1000.0)]
    #[case("1E", 1e18)]
    fn test_parse_quantities(#[case] raw: &str, #[case] expected: f64) {
        let q = Quantity::parse(raw).unwrap();
        assert!((q.value() - expected).abs() < 1e-6, "{raw} => {}", q.value());
        assert_eq!(q.raw(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("abc")]
    #[case("10Xi")]
    #[case("-1")]
    fn test_rejects_malformed_quantities(#[case] raw: &str) {
        assert!(Quantity::parse(raw).is_none());
    }

    #[test]
    fn test_ordering_across_units() {
        let milli = Quantity::parse("1500m").unwrap();
        let cores = Quantity::parse("2").unwrap();
        assert!(milli < cores);

        let mem_a = Quantity::parse("1Gi").unwrap();
        let mem_b = Quantity::parse("1G").unwrap();
        assert!(mem_b < mem_a);
    }

    #[test]
    fn test_from_json_number() {
        let q = Quantity::from_json(&serde_json::json!(4)).unwrap();
        assert_eq!(q.value(), 4.0);
        assert!(Quantity::from_json(&serde_json::json!(true)).is_none());
    }
}
