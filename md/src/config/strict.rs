//! Strictly typed floating-point fields.
//!
//! A float field only accepts numbers written with a fractional part or an
//! exponent (`1.0`, `2.5e-3`); a bare integer such as `1` is rejected.

use serde::de::{self, Deserializer, Unexpected, Visitor};
use std::fmt;

struct RealVisitor;

impl<'de> Visitor<'de> for RealVisitor {
    type Value = f64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a floating-point number with an explicit fractional part (e.g. 1.0)")
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
        Ok(v)
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
        Err(E::invalid_type(Unexpected::Signed(v), &self))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
        Err(E::invalid_type(Unexpected::Unsigned(v), &self))
    }
}

pub fn real<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    deserializer.deserialize_any(RealVisitor)
}

pub fn option_real<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    real(deserializer).map(Some)
}

/// Command-line counterpart of [`real`]
pub fn parse_real(s: &str) -> Result<f64, String> {
    let s = s.trim();
    if !s.contains(['.', 'e', 'E']) {
        return Err(format!(
            "'{}' has no fractional part, write it as a float (e.g. {}.0)",
            s, s
        ));
    }
    s.parse::<f64>()
        .map_err(|e| format!("'{}' is not a number: {}", s, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Probe {
        #[serde(deserialize_with = "real")]
        value: f64,
        #[serde(default, deserialize_with = "option_real")]
        maybe: Option<f64>,
    }

    #[test]
    fn test_accepts_floats() {
        let probe: Probe = serde_yml::from_str("value: 1.0\nmaybe: 2.5e-1\n").unwrap();
        assert_eq!(probe.value, 1.0);
        assert_eq!(probe.maybe, Some(0.25));

        let probe: Probe = serde_yml::from_str("value: -0.75\n").unwrap();
        assert_eq!(probe.value, -0.75);
        assert_eq!(probe.maybe, None);
    }

    #[test]
    fn test_rejects_integers() {
        assert!(serde_yml::from_str::<Probe>("value: 1\n").is_err());
        assert!(serde_yml::from_str::<Probe>("value: 1.0\nmaybe: 3\n").is_err());
        assert!(serde_yml::from_str::<Probe>("value: one\n").is_err());
    }

    #[test]
    fn test_parse_real() {
        assert_eq!(parse_real("0.005"), Ok(0.005));
        assert_eq!(parse_real("5e-3"), Ok(0.005));
        assert!(parse_real("1").is_err());
        assert!(parse_real("1.x").is_err());
    }
}
