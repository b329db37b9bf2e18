//! Declarative predicates over stored JSON documents.
//!
//! A query document looks like `{"selector": {...}, "limit": 10}`. The
//! selector is compiled once into a [`Selector`] tree so malformed input is
//! rejected before the store is touched, then evaluated per document.

use crate::error::{LedgerError, Result};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Nin(Vec<Value>),
    Exists(bool),
    Not(Box<Condition>),
    All(Vec<Condition>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selector {
    All(Vec<Selector>),
    Any(Vec<Selector>),
    NoneOf(Vec<Selector>),
    Not(Box<Selector>),
    Field {
        path: Vec<String>,
        condition: Condition,
    },
}

/// A parsed query document. Keys other than `selector`, `limit` and `skip`
/// are accepted and ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDocument {
    pub selector: Selector,
    pub limit: Option<usize>,
    pub skip: usize,
}

impl QueryDocument {
    pub fn parse(raw: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| LedgerError::InvalidQuery(format!("not a JSON document: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let doc = value
            .as_object()
            .ok_or_else(|| invalid("query document must be an object"))?;
        let selector = doc
            .get("selector")
            .ok_or_else(|| invalid("missing selector"))?
            .as_object()
            .ok_or_else(|| invalid("selector must be an object"))?;

        Ok(Self {
            selector: compile_selector(&[], selector)?,
            limit: optional_count(doc, "limit")?,
            skip: optional_count(doc, "skip")?.unwrap_or(0),
        })
    }

    /// `{"selector": {field: value}}`
    pub fn field_equals(field: &str, value: impl Into<Value>) -> Self {
        Self {
            selector: Selector::Field {
                path: split_path(&[], field),
                condition: Condition::Eq(value.into()),
            },
            limit: None,
            skip: 0,
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        self.selector.matches(doc)
    }
}

impl Selector {
    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Selector::All(clauses) => clauses.iter().all(|s| s.matches(doc)),
            Selector::Any(clauses) => clauses.iter().any(|s| s.matches(doc)),
            Selector::NoneOf(clauses) => !clauses.iter().any(|s| s.matches(doc)),
            Selector::Not(inner) => !inner.matches(doc),
            Selector::Field { path, condition } => condition.matches(lookup(doc, path)),
        }
    }
}

impl Condition {
    pub fn matches(&self, field: Option<&Value>) -> bool {
        match self {
            Condition::Exists(expected) => field.is_some() == *expected,
            Condition::Not(inner) => !inner.matches(field),
            Condition::All(conditions) => conditions.iter().all(|c| c.matches(field)),
            _ => match field {
                Some(value) => self.matches_value(value),
                None => false,
            },
        }
    }

    fn matches_value(&self, value: &Value) -> bool {
        match self {
            Condition::Eq(expected) => values_equal(value, expected),
            Condition::Ne(expected) => !values_equal(value, expected),
            Condition::Gt(bound) => compare(value, bound) == Some(Ordering::Greater),
            Condition::Gte(bound) => matches!(
                compare(value, bound),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Condition::Lt(bound) => compare(value, bound) == Some(Ordering::Less),
            Condition::Lte(bound) => {
                matches!(compare(value, bound), Some(Ordering::Less | Ordering::Equal))
            }
            Condition::In(options) => options.iter().any(|o| values_equal(value, o)),
            Condition::Nin(options) => !options.iter().any(|o| values_equal(value, o)),
            Condition::Exists(_) | Condition::Not(_) | Condition::All(_) => {
                self.matches(Some(value))
            }
        }
    }
}

fn invalid(msg: impl Into<String>) -> LedgerError {
    LedgerError::InvalidQuery(msg.into())
}

fn optional_count(doc: &Map<String, Value>, key: &str) -> Result<Option<usize>> {
    match doc.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| invalid(format!("{key} must be a non-negative integer"))),
    }
}

fn split_path(prefix: &[String], field: &str) -> Vec<String> {
    prefix
        .iter()
        .cloned()
        .chain(field.split('.').map(str::to_string))
        .collect()
}

fn compile_selector(prefix: &[String], obj: &Map<String, Value>) -> Result<Selector> {
    let mut clauses = Vec::with_capacity(obj.len());
    for (key, value) in obj {
        let clause = match key.as_str() {
            "$and" => Selector::All(compile_list(prefix, key, value)?),
            "$or" => Selector::Any(compile_list(prefix, key, value)?),
            "$nor" => Selector::NoneOf(compile_list(prefix, key, value)?),
            "$not" => {
                let inner = value
                    .as_object()
                    .ok_or_else(|| invalid("$not expects an object"))?;
                Selector::Not(Box::new(compile_selector(prefix, inner)?))
            }
            op if op.starts_with('$') => {
                return Err(invalid(format!("unknown combination operator {op}")));
            }
            field => compile_field(split_path(prefix, field), value)?,
        };
        clauses.push(clause);
    }

    if clauses.len() == 1 {
        Ok(clauses.remove(0))
    } else {
        Ok(Selector::All(clauses))
    }
}

fn compile_list(prefix: &[String], op: &str, value: &Value) -> Result<Vec<Selector>> {
    value
        .as_array()
        .ok_or_else(|| invalid(format!("{op} expects an array of selectors")))?
        .iter()
        .map(|item| {
            item.as_object()
                .ok_or_else(|| invalid(format!("{op} entries must be objects")))
                .and_then(|obj| compile_selector(prefix, obj))
        })
        .collect()
}

fn compile_field(path: Vec<String>, value: &Value) -> Result<Selector> {
    match value {
        Value::Object(map) if map.keys().any(|k| k.starts_with('$')) => Ok(Selector::Field {
            path,
            condition: compile_conditions(map)?,
        }),
        Value::Object(map) if !map.is_empty() => compile_selector(&path, map),
        literal => Ok(Selector::Field {
            path,
            condition: Condition::Eq(literal.clone()),
        }),
    }
}

fn compile_conditions(map: &Map<String, Value>) -> Result<Condition> {
    let mut conditions = map
        .iter()
        .map(|(op, arg)| compile_condition(op, arg))
        .collect::<Result<Vec<_>>>()?;
    if conditions.len() == 1 {
        Ok(conditions.remove(0))
    } else {
        Ok(Condition::All(conditions))
    }
}

fn compile_condition(op: &str, arg: &Value) -> Result<Condition> {
    let condition = match op {
        "$eq" => Condition::Eq(arg.clone()),
        "$ne" => Condition::Ne(arg.clone()),
        "$gt" => Condition::Gt(arg.clone()),
        "$gte" => Condition::Gte(arg.clone()),
        "$lt" => Condition::Lt(arg.clone()),
        "$lte" => Condition::Lte(arg.clone()),
        "$in" | "$nin" => {
            let options = arg
                .as_array()
                .ok_or_else(|| invalid(format!("{op} expects an array")))?
                .clone();
            if op == "$in" {
                Condition::In(options)
            } else {
                Condition::Nin(options)
            }
        }
        "$exists" => Condition::Exists(
            arg.as_bool()
                .ok_or_else(|| invalid("$exists expects a boolean"))?,
        ),
        "$not" => {
            let inner = arg
                .as_object()
                .ok_or_else(|| invalid("$not expects an object of operators"))?;
            Condition::Not(Box::new(compile_conditions(inner)?))
        }
        other if other.starts_with('$') => {
            return Err(invalid(format!("unknown operator {other}")));
        }
        other => {
            return Err(invalid(format!(
                "cannot mix field {other} with operators in one condition"
            )));
        }
    };
    Ok(condition)
}

fn lookup<'a>(doc: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(doc, |current, segment| current.get(segment))
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y) == Some(Ordering::Equal),
        _ => a == b,
    }
}

fn compare(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

/// Exact decimal comparison, falling back to `f64` outside `Decimal` range.
fn compare_numbers(x: &Number, y: &Number) -> Option<Ordering> {
    match (number_decimal(x), number_decimal(y)) {
        (Some(x), Some(y)) => Some(x.cmp(&y)),
        _ => x.as_f64()?.partial_cmp(&y.as_f64()?),
    }
}

fn number_decimal(n: &Number) -> Option<Decimal> {
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn brinks() -> Value {
        json!({
            "code": "BRINKS",
            "name": "Brinks",
            "amount": 100,
            "type": "ETV",
            "status": "ACTIVE",
            "type_entity": "ORGS",
            "meta": {"region": "RM"}
        })
    }

    fn query(doc: Value) -> QueryDocument {
        QueryDocument::from_value(&doc).unwrap()
    }

    #[test]
    fn test_equality_and_missing_fields() {
        let doc = brinks();
        assert!(query(json!({"selector": {"type_entity": "ORGS"}})).matches(&doc));
        assert!(!query(json!({"selector": {"type": "request"}})).matches(&doc));
        assert!(!query(json!({"selector": {"sender": "A"}})).matches(&doc));
        assert!(query(json!({"selector": {"amount": 100.0}})).matches(&doc));
    }

    #[test]
    fn test_numbers_compare_exactly() {
        let doc: Value =
            serde_json::from_str(r#"{"amount": 0.00000000000000000001, "total": 99.99999999999999999999}"#)
                .unwrap();
        assert!(query(json!({"selector": {"amount": {"$gt": 0}}})).matches(&doc));
        assert!(!query(json!({"selector": {"amount": 0}})).matches(&doc));
        assert!(query(json!({"selector": {"total": {"$lt": 100}}})).matches(&doc));
        assert!(query(json!({"selector": {"amount": {"$lte": 1e-20}}})).matches(&doc));
    }

    #[test]
    fn test_comparison_operators() {
        let doc = brinks();
        assert!(query(json!({"selector": {"amount": {"$gt": 50}}})).matches(&doc));
        assert!(query(json!({"selector": {"amount": {"$gte": 100, "$lt": 101}}})).matches(&doc));
        assert!(!query(json!({"selector": {"amount": {"$lt": 100}}})).matches(&doc));
        assert!(query(json!({"selector": {"type": {"$in": ["ETV", "ATM"]}}})).matches(&doc));
        assert!(!query(json!({"selector": {"type": {"$nin": ["ETV"]}}})).matches(&doc));
        assert!(query(json!({"selector": {"type": {"$ne": "ATM"}}})).matches(&doc));
        // Mismatched types never compare
        assert!(!query(json!({"selector": {"amount": {"$gt": "50"}}})).matches(&doc));
    }

    #[test]
    fn test_exists_and_not() {
        let doc = brinks();
        assert!(query(json!({"selector": {"sender": {"$exists": false}}})).matches(&doc));
        assert!(!query(json!({"selector": {"code": {"$exists": false}}})).matches(&doc));
        assert!(query(json!({"selector": {"amount": {"$not": {"$lt": 10}}}})).matches(&doc));
        assert!(query(json!({"selector": {"$not": {"type": "ATM"}}})).matches(&doc));
    }

    #[test]
    fn test_combinators_and_nesting() {
        let doc = brinks();
        assert!(
            query(json!({"selector": {"$or": [{"type": "ATM"}, {"type": "ETV"}]}})).matches(&doc)
        );
        assert!(
            !query(json!({"selector": {"$nor": [{"type": "ATM"}, {"type": "ETV"}]}})).matches(&doc)
        );
        assert!(
            query(json!({"selector": {"$and": [{"status": "ACTIVE"}, {"amount": {"$gte": 100}}]}}))
                .matches(&doc)
        );
        assert!(query(json!({"selector": {"meta.region": "RM"}})).matches(&doc));
        assert!(query(json!({"selector": {"meta": {"region": "RM"}}})).matches(&doc));
        assert!(!query(json!({"selector": {"meta": {"region": "V"}}})).matches(&doc));
    }

    #[test]
    fn test_limit_skip_and_ignored_keys() {
        let doc = query(json!({
            "selector": {"type": "send"},
            "limit": 5,
            "skip": 2,
            "use_index": ["_design/idx", "type"]
        }));
        assert_eq!(doc.limit, Some(5));
        assert_eq!(doc.skip, 2);
    }

    #[test]
    fn test_invalid_documents() {
        for raw in [
            "not json",
            "[]",
            r#"{"limit": 2}"#,
            r#"{"selector": "type"}"#,
            r#"{"selector": {"amount": {"$between": [1, 2]}}}"#,
            r#"{"selector": {"$xor": []}}"#,
            r#"{"selector": {"type": {"$in": "ETV"}}}"#,
            r#"{"selector": {"type": {"$exists": 1}}}"#,
            r#"{"selector": {"type": {"$eq": "ETV", "name": "x"}}}"#,
            r#"{"selector": {"type": "ETV"}, "limit": -1}"#,
        ] {
            assert!(
                matches!(QueryDocument::parse(raw), Err(LedgerError::InvalidQuery(_))),
                "expected {raw} to be rejected"
            );
        }
    }

    #[test]
    fn test_field_equals_constructor() {
        let doc = QueryDocument::field_equals("type_entity", "ORGS");
        assert_eq!(doc, query(json!({"selector": {"type_entity": "ORGS"}})));
    }
}
