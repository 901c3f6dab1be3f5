//! Tolerant access to the intake record.
//!
//! The wizard stores partially completed applications, so any intermediate object may be
//! missing, `null`, or of an unexpected type. Every accessor here resolves those cases to
//! "absent" instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Read-only view over a resale certificate application as submitted by the wizard.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationData(Value);

impl ApplicationData {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Resolve a dotted path such as `disclosures.fees.unpaidFeesAmount`.
    ///
    /// Numeric segments index into arrays. `null` leaves are reported as absent.
    pub fn lookup(&self, path: &str) -> Option<&Value> {
        lookup_in(&self.0, path)
    }

    /// `true` when the value at `path` passes [`is_truthy`].
    pub fn flag(&self, path: &str) -> bool {
        self.lookup(path).map(is_truthy).unwrap_or(false)
    }

    /// Tri-state reading used by yes/no choice pairs.
    pub fn tri_state(&self, path: &str) -> Option<bool> {
        self.lookup(path).and_then(tri_state)
    }

    /// Elements of the array at `path`; anything that is not an array reads as empty.
    pub fn items(&self, path: &str) -> &[Value] {
        match self.lookup(path) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }
}

impl From<Value> for ApplicationData {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Path lookup relative to an arbitrary node, used for array rows.
pub fn lookup_in<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = root;
    for segment in path.split('.').filter(|segment| !segment.is_empty()) {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }

    match current {
        Value::Null => None,
        other => Some(other),
    }
}

/// Permissive boolean coercion.
///
/// `true`, the strings `"true"`, `"1"` and `"yes"` (trimmed, any case) and positive
/// numbers are true. Everything else, `null` included, is false.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(raw) => is_truthy_str(raw),
        Value::Number(number) => number.as_f64().map(|n| n > 0.0).unwrap_or(false),
        _ => false,
    }
}

pub fn is_truthy_str(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

/// Three-valued reading: explicit yes, explicit no, or unknown.
///
/// Only values that clearly say "no" (`false`, `"false"`, `"no"`, `"0"`, `0`) produce
/// `Some(false)`; blanks and unrecognised values stay `None`.
pub fn tri_state(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Number(number) => match number.as_f64() {
            Some(n) if n > 0.0 => Some(true),
            Some(n) if n == 0.0 => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn truthy_accepts_boolean_like_inputs() {
        for value in [
            json!(true),
            json!("true"),
            json!("True"),
            json!(" yes "),
            json!("1"),
            json!(1),
            json!(2.5),
        ] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
    }

    #[test]
    fn truthy_rejects_everything_else() {
        for value in [
            json!(false),
            json!("false"),
            json!("0"),
            json!(0),
            json!(-1),
            json!(null),
            json!(""),
            json!("no"),
            json!([true]),
            json!({ "value": true }),
        ] {
            assert!(!is_truthy(&value), "{value} should not be truthy");
        }
    }

    #[test]
    fn lookup_tolerates_missing_and_mistyped_intermediates() {
        let data = ApplicationData::new(json!({
            "disclosures": {
                "fees": null,
                "insurance": "not an object",
                "otherEntity": { "entities": [{ "name": "Acme HOA" }] }
            }
        }));

        assert!(data.lookup("disclosures.fees.unpaidFeesAmount").is_none());
        assert!(data.lookup("disclosures.insurance.policies").is_none());
        assert!(data.lookup("missing.entirely").is_none());
        assert_eq!(
            data.lookup("disclosures.otherEntity.entities.0.name"),
            Some(&json!("Acme HOA"))
        );
        assert!(data.lookup("disclosures.otherEntity.entities.3.name").is_none());
        assert!(data.items("disclosures.insurance.policies").is_empty());
        assert!(!data.flag("disclosures.fees.hasOtherFees"));
    }

    #[test]
    fn tri_state_keeps_unknown_values_unknown() {
        assert_eq!(tri_state(&json!(true)), Some(true));
        assert_eq!(tri_state(&json!("No")), Some(false));
        assert_eq!(tri_state(&json!(0)), Some(false));
        assert_eq!(tri_state(&json!("")), None);
        assert_eq!(tri_state(&json!("maybe")), None);

        let data = ApplicationData::new(json!({ "disclosures": {} }));
        assert_eq!(data.tri_state("disclosures.restraintsExist"), None);
    }

    #[test]
    fn non_object_root_reads_as_empty() {
        let data = ApplicationData::new(json!("garbage"));
        assert!(data.lookup("disclosures").is_none());
        assert!(data.items("disclosures.otherEntity.entities").is_empty());
    }
}
