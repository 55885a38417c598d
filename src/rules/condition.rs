use serde_json::Value;
use std::cmp::Ordering;

use super::error::RuleError;

/// Evaluate a condition tree against a business document.
///
/// Conditions are JSON objects: keys starting with `$` are logical
/// operators (`$and`, `$or`, `$not`), everything else is a field
/// condition on a dot-separated path. A field condition is either an
/// implicit equality (`{ "entity_type": "llc" }`) or an operator object
/// (`{ "employee_count": { "$gte": 5 } }`). Multiple keys in one object
/// are implicitly ANDed. `null` and `{}` match everything.
pub fn evaluate(condition: &Value, document: &Value) -> Result<bool, RuleError> {
    match condition {
        Value::Null => Ok(true),
        Value::Object(obj) => {
            for (key, value) in obj {
                let matched = if key.starts_with('$') {
                    evaluate_logical(key, value, document)?
                } else {
                    evaluate_field(key, value, document)?
                };
                if !matched {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Err(RuleError::InvalidCondition(
            "condition must be an object".to_string(),
        )),
    }
}

/// Validate a condition tree without a document, enforcing `max_depth`.
/// Used on rule create/update so bad rules are rejected before storage.
pub fn validate(condition: &Value, max_depth: u32) -> Result<(), RuleError> {
    validate_at(condition, max_depth, 0)
}

fn validate_at(condition: &Value, max_depth: u32, depth: u32) -> Result<(), RuleError> {
    if depth > max_depth {
        return Err(RuleError::DepthExceeded(max_depth));
    }
    match condition {
        Value::Null => Ok(()),
        Value::Object(obj) => {
            for (key, value) in obj {
                if key.starts_with('$') {
                    match key.as_str() {
                        "$and" | "$or" => {
                            let arr = value.as_array().ok_or_else(|| {
                                RuleError::InvalidCondition(format!("{} requires an array", key))
                            })?;
                            for sub in arr {
                                validate_at(sub, max_depth, depth + 1)?;
                            }
                        }
                        "$not" => validate_at(value, max_depth, depth + 1)?,
                        other => return Err(RuleError::UnsupportedOperator(other.to_string())),
                    }
                } else if let Value::Object(ops) = value {
                    for (op, operand) in ops {
                        validate_operator(op, operand)?;
                    }
                }
                // Non-object field values are implicit equality, always valid
            }
            Ok(())
        }
        _ => Err(RuleError::InvalidCondition(
            "condition must be an object".to_string(),
        )),
    }
}

fn validate_operator(op: &str, operand: &Value) -> Result<(), RuleError> {
    match op {
        "$eq" | "$ne" | "$gt" | "$gte" | "$lt" | "$lte" | "$contains" => Ok(()),
        "$in" | "$nin" => operand
            .as_array()
            .map(|_| ())
            .ok_or_else(|| RuleError::InvalidCondition(format!("{} requires an array", op))),
        "$exists" => operand
            .as_bool()
            .map(|_| ())
            .ok_or_else(|| RuleError::InvalidCondition("$exists requires a boolean".to_string())),
        other => Err(RuleError::UnsupportedOperator(other.to_string())),
    }
}

fn evaluate_logical(op: &str, value: &Value, document: &Value) -> Result<bool, RuleError> {
    match op {
        "$and" => {
            let arr = value.as_array().ok_or_else(|| {
                RuleError::InvalidCondition("$and requires an array".to_string())
            })?;
            for sub in arr {
                if !evaluate(sub, document)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        "$or" => {
            let arr = value.as_array().ok_or_else(|| {
                RuleError::InvalidCondition("$or requires an array".to_string())
            })?;
            for sub in arr {
                if evaluate(sub, document)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        "$not" => Ok(!evaluate(value, document)?),
        other => Err(RuleError::UnsupportedOperator(other.to_string())),
    }
}

fn evaluate_field(path: &str, value: &Value, document: &Value) -> Result<bool, RuleError> {
    let field = lookup_path(document, path);

    if let Value::Object(ops) = value {
        for (op, operand) in ops {
            if !apply_operator(op, field, operand)? {
                return Ok(false);
            }
        }
        Ok(true)
    } else {
        // Implicit equality: { field: value }
        Ok(apply_operator("$eq", field, value)?)
    }
}

/// Dot-separated path lookup into nested objects. Missing segments yield None.
fn lookup_path<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = document;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn apply_operator(op: &str, field: Option<&Value>, operand: &Value) -> Result<bool, RuleError> {
    match op {
        "$exists" => {
            let expected = operand.as_bool().ok_or_else(|| {
                RuleError::InvalidCondition("$exists requires a boolean".to_string())
            })?;
            Ok(field.is_some() == expected)
        }
        "$eq" => Ok(field.is_some_and(|f| values_equal(f, operand))),
        "$ne" => Ok(!field.is_some_and(|f| values_equal(f, operand))),
        "$gt" => Ok(compare(field, operand).is_some_and(|o| o == Ordering::Greater)),
        "$gte" => Ok(compare(field, operand).is_some_and(|o| o != Ordering::Less)),
        "$lt" => Ok(compare(field, operand).is_some_and(|o| o == Ordering::Less)),
        "$lte" => Ok(compare(field, operand).is_some_and(|o| o != Ordering::Greater)),
        "$in" => {
            let arr = operand.as_array().ok_or_else(|| {
                RuleError::InvalidCondition("$in requires an array".to_string())
            })?;
            Ok(field.is_some_and(|f| arr.iter().any(|v| values_equal(f, v))))
        }
        "$nin" => {
            let arr = operand.as_array().ok_or_else(|| {
                RuleError::InvalidCondition("$nin requires an array".to_string())
            })?;
            Ok(!field.is_some_and(|f| arr.iter().any(|v| values_equal(f, v))))
        }
        "$contains" => Ok(field.is_some_and(|f| contains(f, operand))),
        other => Err(RuleError::UnsupportedOperator(other.to_string())),
    }
}

/// Equality with numeric coercion: 5 and 5.0 are equal
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

/// Ordering for numbers and strings; mismatched or missing values do not order
fn compare(field: Option<&Value>, operand: &Value) -> Option<Ordering> {
    let field = field?;
    if let (Some(x), Some(y)) = (field.as_f64(), operand.as_f64()) {
        return x.partial_cmp(&y);
    }
    if let (Some(x), Some(y)) = (field.as_str(), operand.as_str()) {
        return Some(x.cmp(y));
    }
    None
}

/// String substring or array membership
fn contains(field: &Value, operand: &Value) -> bool {
    match field {
        Value::String(s) => operand.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
        Value::Array(items) => items.iter().any(|v| values_equal(v, operand)),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "entity_type": "llc",
            "formation_state": "CA",
            "employee_count": 12,
            "status": "draft",
            "owners": ["alice", "bob"],
            "registered_agent": { "state": "CA", "name": "Agents Inc" }
        })
    }

    #[test]
    fn implicit_equality() {
        assert!(evaluate(&json!({ "entity_type": "llc" }), &doc()).unwrap());
        assert!(!evaluate(&json!({ "entity_type": "c_corp" }), &doc()).unwrap());
    }

    #[test]
    fn multiple_keys_are_anded() {
        let c = json!({ "entity_type": "llc", "formation_state": "CA" });
        assert!(evaluate(&c, &doc()).unwrap());
        let c = json!({ "entity_type": "llc", "formation_state": "NY" });
        assert!(!evaluate(&c, &doc()).unwrap());
    }

    #[test]
    fn comparison_operators() {
        assert!(evaluate(&json!({ "employee_count": { "$gt": 10 } }), &doc()).unwrap());
        assert!(evaluate(&json!({ "employee_count": { "$gte": 12 } }), &doc()).unwrap());
        assert!(!evaluate(&json!({ "employee_count": { "$lt": 12 } }), &doc()).unwrap());
        assert!(evaluate(&json!({ "employee_count": { "$lte": 12.0 } }), &doc()).unwrap());
    }

    #[test]
    fn string_ordering_is_lexicographic() {
        assert!(evaluate(&json!({ "formation_state": { "$lt": "NY" } }), &doc()).unwrap());
    }

    #[test]
    fn in_and_nin() {
        assert!(evaluate(&json!({ "formation_state": { "$in": ["CA", "NY"] } }), &doc()).unwrap());
        assert!(!evaluate(&json!({ "formation_state": { "$nin": ["CA"] } }), &doc()).unwrap());
        assert!(evaluate(&json!({ "formation_state": { "$nin": ["NY"] } }), &doc()).unwrap());
    }

    #[test]
    fn contains_on_strings_and_arrays() {
        assert!(evaluate(&json!({ "owners": { "$contains": "alice" } }), &doc()).unwrap());
        assert!(!evaluate(&json!({ "owners": { "$contains": "carol" } }), &doc()).unwrap());
        assert!(evaluate(&json!({ "entity_type": { "$contains": "ll" } }), &doc()).unwrap());
    }

    #[test]
    fn nested_paths() {
        assert!(evaluate(&json!({ "registered_agent.state": "CA" }), &doc()).unwrap());
        assert!(!evaluate(&json!({ "registered_agent.city": { "$exists": true } }), &doc()).unwrap());
    }

    #[test]
    fn missing_fields() {
        // Comparisons against a missing field are false
        assert!(!evaluate(&json!({ "ein": "12-3456789" }), &doc()).unwrap());
        assert!(!evaluate(&json!({ "ein": { "$gt": 0 } }), &doc()).unwrap());
        // ...except $exists:false, $ne, and $nin
        assert!(evaluate(&json!({ "ein": { "$exists": false } }), &doc()).unwrap());
        assert!(evaluate(&json!({ "ein": { "$ne": "12-3456789" } }), &doc()).unwrap());
        assert!(evaluate(&json!({ "ein": { "$nin": ["12-3456789"] } }), &doc()).unwrap());
    }

    #[test]
    fn logical_operators() {
        let c = json!({
            "$or": [
                { "entity_type": "c_corp" },
                { "$and": [
                    { "entity_type": "llc" },
                    { "employee_count": { "$gte": 10 } }
                ]}
            ]
        });
        assert!(evaluate(&c, &doc()).unwrap());

        let c = json!({ "$not": { "status": "draft" } });
        assert!(!evaluate(&c, &doc()).unwrap());
    }

    #[test]
    fn empty_and_null_conditions_match() {
        assert!(evaluate(&json!({}), &doc()).unwrap());
        assert!(evaluate(&Value::Null, &doc()).unwrap());
    }

    #[test]
    fn numeric_coercion() {
        assert!(evaluate(&json!({ "employee_count": 12.0 }), &doc()).unwrap());
    }

    #[test]
    fn unknown_operator_errors() {
        let err = evaluate(&json!({ "entity_type": { "$regex": ".*" } }), &doc()).unwrap_err();
        assert!(matches!(err, RuleError::UnsupportedOperator(op) if op == "$regex"));
    }

    #[test]
    fn validate_rejects_bad_shapes() {
        assert!(validate(&json!({ "$and": { "not": "an array" } }), 5).is_err());
        assert!(validate(&json!({ "x": { "$in": "not an array" } }), 5).is_err());
        assert!(validate(&json!({ "x": { "$exists": "yes" } }), 5).is_err());
        assert!(validate(&json!("just a string"), 5).is_err());
        assert!(validate(&json!({ "x": { "$gte": 1 }, "$or": [{ "y": 2 }] }), 5).is_ok());
    }

    #[test]
    fn validate_enforces_depth() {
        let mut c = json!({ "x": 1 });
        for _ in 0..6 {
            c = json!({ "$not": c });
        }
        assert!(matches!(validate(&c, 5), Err(RuleError::DepthExceeded(5))));
        assert!(validate(&c, 10).is_ok());
    }
}
