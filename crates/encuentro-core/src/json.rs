//! JSON subset comparison for partial response-body assertions.
//!
//! Scenario expectations usually pin down only the fields they care about;
//! the server is free to return more. `is_subset` checks that everything
//! the expectation names is present and equal, recursively.

use serde_json::Value;

/// Returns true if `expected` is a structural subset of `actual`.
///
/// - Objects: every key in `expected` must exist in `actual` with a
///   subset-matching value; extra keys in `actual` are ignored.
/// - Arrays: must have equal length and match element-wise.
/// - Scalars: must be equal.
#[must_use]
pub fn is_subset(expected: &Value, actual: &Value) -> bool {
    match (expected, actual) {
        (Value::Object(exp), Value::Object(act)) => exp
            .iter()
            .all(|(key, value)| act.get(key).is_some_and(|other| is_subset(value, other))),
        (Value::Array(exp), Value::Array(act)) => {
            exp.len() == act.len()
                && exp
                    .iter()
                    .zip(act.iter())
                    .all(|(value, other)| is_subset(value, other))
        }
        (exp, act) => exp == act,
    }
}
