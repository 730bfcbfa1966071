//! In-memory filter evaluator (C3, §4.3).
//!
//! Evaluates a `FilterNode` against a resource represented as
//! `serde_json::Value`. Attribute lookups are case-insensitive on every path
//! segment, matching the SCIM requirement that attribute names are
//! case-insensitive.

use serde_json::Value;

use crate::filter::ast::{CompareOp, FilterNode, LogicalOp};

pub fn evaluate(node: &FilterNode, resource: &Value) -> bool {
    match node {
        FilterNode::Compare {
            attr,
            op,
            value,
            namespace,
        } => match namespace {
            Some(ns) => evaluate_value_sub_filter(ns, attr, *op, value.as_ref(), resource),
            None => evaluate_compare(resource, attr, *op, value.as_ref()),
        },
        FilterNode::Logical { op, left, right } => match op {
            LogicalOp::And => evaluate(left, resource) && evaluate(right, resource),
            LogicalOp::Or => evaluate(left, resource) || evaluate(right, resource),
        },
        FilterNode::Negate(inner) => !evaluate(inner, resource),
    }
}

/// `members[value eq "u1"]`: true iff the list-typed attribute named by
/// `namespace` has at least one element for which `attr op value` holds
/// (§4.3 rule 1).
fn evaluate_value_sub_filter(
    namespace: &str,
    attr: &str,
    op: CompareOp,
    value: Option<&Value>,
    resource: &Value,
) -> bool {
    let Some(list) = lookup_case_insensitive(resource, namespace) else {
        return false;
    };
    let Value::Array(items) = list else {
        return false;
    };
    items
        .iter()
        .any(|item| evaluate_compare(item, attr, op, value))
}

fn evaluate_compare(resource: &Value, attr: &str, op: CompareOp, value: Option<&Value>) -> bool {
    let actual = lookup_path(resource, attr);
    match op {
        CompareOp::Pr => is_present(actual.as_ref()),
        _ => {
            let Some(actual) = actual else { return false };
            let Some(expected) = value else { return false };
            compare(&actual, op, expected)
        }
    }
}

fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(_) => true,
    }
}

fn compare(actual: &Value, op: CompareOp, expected: &Value) -> bool {
    match op {
        CompareOp::Eq => values_equal(actual, expected),
        CompareOp::Ne => !values_equal(actual, expected),
        CompareOp::Co => as_lower_str(actual)
            .zip(as_lower_str(expected))
            .is_some_and(|(a, e)| a.contains(&e)),
        CompareOp::Sw => as_lower_str(actual)
            .zip(as_lower_str(expected))
            .is_some_and(|(a, e)| a.starts_with(&e)),
        CompareOp::Ew => as_lower_str(actual)
            .zip(as_lower_str(expected))
            .is_some_and(|(a, e)| a.ends_with(&e)),
        CompareOp::Gt => ordering(actual, expected).is_some_and(|o| o.is_gt()),
        CompareOp::Ge => ordering(actual, expected).is_some_and(|o| !o.is_lt()),
        CompareOp::Lt => ordering(actual, expected).is_some_and(|o| o.is_lt()),
        CompareOp::Le => ordering(actual, expected).is_some_and(|o| !o.is_gt()),
        CompareOp::Pr => unreachable!("handled by evaluate_compare"),
    }
}

/// `eq`/`ne` compare strings case-insensitively (attribute *values* of type
/// string are compared case-insensitively per RFC 7644 §3.4.2.2 for a small,
/// fixed set of attributes; this crate applies it uniformly). Non-string
/// values fall back to direct JSON equality.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(a), Value::String(b)) => a.to_lowercase() == b.to_lowercase(),
        _ => a == b,
    }
}

fn as_lower_str(value: &Value) -> Option<String> {
    value.as_str().map(|s| s.to_lowercase())
}

fn ordering(a: &Value, b: &Value) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        _ => None,
    }
}

/// Resolve a dotted attribute path (`name.givenName`) case-insensitively
/// against nested objects.
fn lookup_path<'a>(resource: &'a Value, path: &str) -> Option<Value> {
    let mut current = resource;
    for segment in path.split('.') {
        current = lookup_case_insensitive(current, segment)?;
    }
    Some(current.clone())
}

fn lookup_case_insensitive<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    let Value::Object(map) = value else {
        return None;
    };
    if let Some(v) = map.get(key) {
        return Some(v);
    }
    map.iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::parser::parse_filter;
    use serde_json::json;

    fn eval(filter: &str, resource: &Value) -> bool {
        evaluate(&parse_filter(filter).unwrap(), resource)
    }

    #[test]
    fn eq_is_case_insensitive_on_value_and_attribute_name() {
        let resource = json!({"userName": "JDoe"});
        assert!(eval(r#"username eq "jdoe""#, &resource));
    }

    #[test]
    fn co_sw_ew_match_substrings_case_insensitively() {
        let resource = json!({"userName": "JohnDoe"});
        assert!(eval(r#"userName co "HND""#, &resource));
        assert!(eval(r#"userName sw "john""#, &resource));
        assert!(eval(r#"userName ew "DOE""#, &resource));
    }

    #[test]
    fn pr_is_false_for_missing_empty_and_null() {
        assert!(!eval("nickName pr", &json!({})));
        assert!(!eval("emails pr", &json!({"emails": []})));
        assert!(!eval("nickName pr", &json!({"nickName": null})));
        assert!(eval("nickName pr", &json!({"nickName": "Jo"})));
    }

    #[test]
    fn dotted_path_resolves_nested_object() {
        assert!(eval(
            r#"name.givenName eq "John""#,
            &json!({"name": {"givenName": "John"}})
        ));
    }

    #[test]
    fn value_sub_filter_matches_any_list_element() {
        let resource = json!({"members": [{"value": "u1"}, {"value": "u2"}]});
        assert!(eval(r#"members[value eq "u2"]"#, &resource));
        assert!(!eval(r#"members[value eq "u3"]"#, &resource));
    }

    #[test]
    fn and_or_not_compose() {
        let resource = json!({"userName": "jdoe", "active": true});
        assert!(eval(r#"userName eq "jdoe" and active eq true"#, &resource));
        assert!(eval(r#"userName eq "nobody" or active eq true"#, &resource));
        assert!(eval(r#"not (active eq false)"#, &resource));
    }

    #[test]
    fn numeric_comparisons_use_numeric_ordering() {
        let resource = json!({"age": 30});
        assert!(eval("age gt 10", &resource));
        assert!(eval("age le 30", &resource));
        assert!(!eval("age lt 30", &resource));
    }
}
