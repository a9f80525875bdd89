//! Single-field query predicates over JSON document bodies.
//!
//! A [`Filter`] is `field op value`. Fields are dotted paths into the body
//! (`data.plan.name`). A document missing the field never matches, for any
//! operator. Ordering operators only match values of the same JSON type;
//! numbers compare numerically regardless of integer/float representation.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Comparison operator of a [`Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl Operator {
    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Ne => "!=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
        }
    }
}

impl FromStr for Operator {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "==" | "=" => Ok(Operator::Eq),
            "!=" => Ok(Operator::Ne),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Le),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Ge),
            other => Err(CoreError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A `field op value` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub op: Operator,
    pub value: Value,
}

impl Filter {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    /// Parse the operator from its textual form (`"=="`, `"<="`, ...).
    pub fn parse(
        field: impl Into<String>,
        op: &str,
        value: impl Into<Value>,
    ) -> Result<Self, CoreError> {
        Ok(Self::new(field, op.parse()?, value))
    }

    pub fn matches(&self, body: &Value) -> bool {
        let Some(actual) = lookup(body, &self.field) else {
            return false;
        };

        let ord = || json_cmp(actual, &self.value);
        match self.op {
            Operator::Eq => json_eq(actual, &self.value),
            Operator::Ne => !json_eq(actual, &self.value),
            Operator::Lt => ord() == Some(Ordering::Less),
            Operator::Le => matches!(ord(), Some(Ordering::Less | Ordering::Equal)),
            Operator::Gt => ord() == Some(Ordering::Greater),
            Operator::Ge => matches!(ord(), Some(Ordering::Greater | Ordering::Equal)),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op, self.value)
    }
}

fn lookup<'a>(body: &'a Value, field: &str) -> Option<&'a Value> {
    field
        .split('.')
        .try_fold(body, |node, key| node.as_object()?.get(key))
}

fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(_), Value::Number(_)) => json_cmp(a, b) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn json_cmp(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_i64(), y.as_i64()) {
            (Some(x), Some(y)) => Some(x.cmp(&y)),
            _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
        },
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn doc() -> Value {
        json!({
            "account_id": "acct-1",
            "data": {"seats": 5, "price": 9.5, "active": true, "plan": {"name": "pro"}},
            "note": null,
        })
    }

    #[test]
    fn test_operator_parse() {
        assert_eq!("==".parse::<Operator>().unwrap(), Operator::Eq);
        assert_eq!(">=".parse::<Operator>().unwrap(), Operator::Ge);
        assert!("~=".parse::<Operator>().is_err());
    }

    #[test]
    fn test_equality() {
        let d = doc();
        assert!(Filter::new("account_id", Operator::Eq, "acct-1").matches(&d));
        assert!(!Filter::new("account_id", Operator::Eq, "acct-2").matches(&d));
        assert!(Filter::new("account_id", Operator::Ne, "acct-2").matches(&d));
        assert!(Filter::new("note", Operator::Eq, Value::Null).matches(&d));
    }

    #[test]
    fn test_dotted_fields() {
        let d = doc();
        assert!(Filter::new("data.plan.name", Operator::Eq, "pro").matches(&d));
        assert!(Filter::new("data.seats", Operator::Ge, 5).matches(&d));
        assert!(!Filter::new("data.seats", Operator::Gt, 5).matches(&d));
    }

    #[test]
    fn test_numeric_mixed_repr() {
        let d = doc();
        assert!(Filter::new("data.seats", Operator::Eq, 5.0).matches(&d));
        assert!(Filter::new("data.price", Operator::Lt, 10).matches(&d));
    }

    #[test]
    fn test_missing_field_never_matches() {
        let d = doc();
        for op in [
            Operator::Eq,
            Operator::Ne,
            Operator::Lt,
            Operator::Le,
            Operator::Gt,
            Operator::Ge,
        ] {
            assert!(!Filter::new("data.missing", op, 1).matches(&d));
        }
    }

    #[test]
    fn test_type_mismatch_ordering() {
        let d = doc();
        assert!(!Filter::new("account_id", Operator::Lt, 10).matches(&d));
        assert!(!Filter::new("data.active", Operator::Gt, "a").matches(&d));
    }

    proptest! {
        #[test]
        fn integer_ordering_agrees(a in any::<i64>(), b in any::<i64>()) {
            let body = json!({"n": a});
            prop_assert_eq!(Filter::new("n", Operator::Lt, b).matches(&body), a < b);
            prop_assert_eq!(Filter::new("n", Operator::Ge, b).matches(&body), a >= b);
            prop_assert_eq!(Filter::new("n", Operator::Eq, b).matches(&body), a == b);
        }
    }
}
