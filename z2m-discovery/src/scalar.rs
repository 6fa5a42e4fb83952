//! Heterogeneous JSON scalars
//!
//! `payload_on`/`payload_off` arrive as strings, booleans or numbers depending on
//! the bridge that published the discovery message. They are decoded once into
//! [`PayloadScalar`] and rendered to canonical text with [`PayloadScalar::render`].

use serde::Deserialize;
use serde_json::{Number, Value};

/// A JSON scalar as it appeared on the wire
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(from = "Value")]
pub enum PayloadScalar {
    String(String),
    Bool(bool),
    Number(Number),
    /// Absent, `null`, or a non-scalar (array/object)
    #[default]
    Null,
}

impl From<Value> for PayloadScalar {
    fn from(value: Value) -> Self {
        match value {
            Value::String(s) => PayloadScalar::String(s),
            Value::Bool(b) => PayloadScalar::Bool(b),
            Value::Number(n) => PayloadScalar::Number(n),
            Value::Null | Value::Array(_) | Value::Object(_) => PayloadScalar::Null,
        }
    }
}

impl PayloadScalar {
    /// Canonical text form: booleans as `true`/`false`, numbers in minimal
    /// decimal notation, everything else empty.
    pub fn render(&self) -> String {
        match self {
            PayloadScalar::String(s) => s.clone(),
            PayloadScalar::Bool(b) => b.to_string(),
            PayloadScalar::Number(n) => render_number(n),
            PayloadScalar::Null => String::new(),
        }
    }
}

/// Render a JSON number without exponent or trailing `.0`
pub fn render_number(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        // f64 Display never uses exponent notation and drops a zero fraction
        n.as_f64().map(|f| f.to_string()).unwrap_or_default()
    }
}

/// Render any JSON value the way identifiers are keyed: strings verbatim,
/// scalars in canonical form, containers as compact JSON.
pub fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => render_number(n),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(json!("ON"), "ON")]
    #[case(json!(true), "true")]
    #[case(json!(false), "false")]
    #[case(json!(1), "1")]
    #[case(json!(-3), "-3")]
    #[case(json!(1.5), "1.5")]
    #[case(json!(2.0), "2")]
    #[case(json!(null), "")]
    #[case(json!([1, 2]), "")]
    #[case(json!({"a": 1}), "")]
    fn test_render(#[case] wire: Value, #[case] expected: &str) {
        assert_eq!(PayloadScalar::from(wire).render(), expected);
    }

    #[test]
    fn test_deserialize_from_field() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(default)]
            on: PayloadScalar,
        }

        let holder: Holder = serde_json::from_str(r#"{"on": 1}"#).unwrap();
        assert_eq!(holder.on.render(), "1");

        let holder: Holder = serde_json::from_str("{}").unwrap();
        assert_eq!(holder.on, PayloadScalar::Null);
    }

    #[test]
    fn test_render_value_identifiers() {
        assert_eq!(render_value(&json!("0x00158d0001a2b3c4")), "0x00158d0001a2b3c4");
        assert_eq!(render_value(&json!(42)), "42");
        assert_eq!(render_value(&json!(["a"])), r#"["a"]"#);
    }
}
