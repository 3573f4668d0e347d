//! Derived values and visibility conditions for bound components.
//!
//! | name | array | object | scalar |
//! |---|---|---|---|
//! | `length` / `count` | element count | key count | string UTF-16 length, else 0 |
//! | `any` | some element truthy | some value truthy | truthiness |
//! | `all` | non-empty and every element truthy | non-empty and every value truthy | truthiness |
//! | `none` | `!any` | `!any` | `!truthy` |
//! | `sum` | sum of numeric elements | sum of numeric values | the number, else 0 |

use crate::pointer::DataModel;
use crate::value::DataValue;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

/// Named reduction applied to a resolved value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Expression {
    Length,
    /// Synonym of `Length`.
    Count,
    Any,
    All,
    None,
    Sum,
}

impl Expression {
    pub fn name(self) -> &'static str {
        match self {
            Expression::Length => "length",
            Expression::Count => "count",
            Expression::Any => "any",
            Expression::All => "all",
            Expression::None => "none",
            Expression::Sum => "sum",
        }
    }
}

impl FromStr for Expression {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "length" => Ok(Expression::Length),
            "count" => Ok(Expression::Count),
            "any" => Ok(Expression::Any),
            "all" => Ok(Expression::All),
            "none" => Ok(Expression::None),
            "sum" => Ok(Expression::Sum),
            other => Err(format!("unknown expression '{other}'")),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Iterate the members of a container; scalars have none.
fn members(value: &DataValue) -> Option<Box<dyn Iterator<Item = &DataValue> + '_>> {
    match value {
        DataValue::Array(items) => Some(Box::new(items.iter())),
        DataValue::Object(map) => Some(Box::new(map.values())),
        _ => None,
    }
}

fn any_truthy(value: &DataValue) -> bool {
    match members(value) {
        Some(mut it) => it.any(DataValue::is_truthy),
        None => value.is_truthy(),
    }
}

pub fn evaluate(expr: Expression, value: &DataValue) -> DataValue {
    match expr {
        Expression::Length | Expression::Count => {
            let n = match value {
                DataValue::Array(items) => items.len(),
                DataValue::Object(map) => map.len(),
                DataValue::Str(s) => s.encode_utf16().count(),
                _ => 0,
            };
            DataValue::Int(n as i64)
        }
        Expression::Any => DataValue::Bool(any_truthy(value)),
        Expression::None => DataValue::Bool(!any_truthy(value)),
        Expression::All => {
            let all = match value {
                DataValue::Array(items) => {
                    !items.is_empty() && items.iter().all(DataValue::is_truthy)
                }
                DataValue::Object(map) => !map.is_empty() && map.values().all(DataValue::is_truthy),
                _ => value.is_truthy(),
            };
            DataValue::Bool(all)
        }
        Expression::Sum => match members(value) {
            Some(it) => sum_numbers(it),
            None if value.is_number() => value.clone(),
            None => DataValue::Int(0),
        },
    }
}

/// Integer sums stay integers; any float member (or overflow) makes the
/// result a float.
fn sum_numbers<'a>(it: impl Iterator<Item = &'a DataValue>) -> DataValue {
    let mut int_total: Option<i64> = Some(0);
    let mut total = 0.0;
    for v in it {
        match v {
            DataValue::Int(n) => {
                int_total = int_total.and_then(|acc| acc.checked_add(*n));
                total += *n as f64;
            }
            DataValue::Float(f) => {
                int_total = None;
                total += f;
            }
            _ => {}
        }
    }
    match int_total {
        Some(n) => DataValue::Int(n),
        None => DataValue::Float(total),
    }
}

/// Apply an expression by name. Unknown names leave the value unchanged.
pub fn evaluate_named(name: &str, value: &DataValue) -> DataValue {
    match name.parse::<Expression>() {
        Ok(expr) => evaluate(expr, value),
        Err(_) => {
            tracing::debug!(expr = name, "unknown expression; using raw value");
            value.clone()
        }
    }
}

/// Structured visibility condition.
///
/// When several comparison operators are present only the first in the
/// order `eq`, `neq`, `gt`, `gte`, `lt`, `lte` is checked. An operator
/// written as `null` is present and compares against `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityCondition {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub eq: Option<DataValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub neq: Option<DataValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gt: Option<DataValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub gte: Option<DataValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lt: Option<DataValue>,
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub lte: Option<DataValue>,
}

/// A field that is written, even as `null`, is `Some`. Only an absent field
/// falls back to `None`.
fn present<'de, D>(deserializer: D) -> Result<Option<DataValue>, D::Error>
where
    D: Deserializer<'de>,
{
    DataValue::deserialize(deserializer).map(Some)
}

impl VisibilityCondition {
    pub fn truthy(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// `visibleIf` as written on a component: a bare pointer or a condition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VisibleIf {
    Path(String),
    Condition(VisibilityCondition),
}

/// `contentExpr` as written on a component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentExpr {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expr: Option<String>,
}

/// Value at `path` after `expr`. `None` only when the path is missing and no
/// expression was applied; a missing path never equals a stored `null`.
fn resolve_with_expr(model: &DataModel, path: &str, expr: Option<&str>) -> Option<DataValue> {
    let value = model.get(path);
    match expr {
        Some(name) => Some(evaluate_named(name, value.unwrap_or(&DataValue::Null))),
        None => value.cloned(),
    }
}

fn compare(value: Option<&DataValue>, operand: &DataValue, pred: fn(f64, f64) -> bool) -> bool {
    match (value.and_then(DataValue::as_f64), operand.as_f64()) {
        (Some(a), Some(b)) => pred(a, b),
        _ => false,
    }
}

pub fn resolve_visibility(condition: &VisibleIf, model: &DataModel) -> bool {
    let cond = match condition {
        VisibleIf::Path(path) => {
            return model.get(path).is_some_and(DataValue::is_truthy);
        }
        VisibleIf::Condition(cond) => cond,
    };

    let value = resolve_with_expr(model, &cond.path, cond.expr.as_deref());
    let value = value.as_ref();

    if let Some(operand) = &cond.eq {
        return value == Some(operand);
    }
    if let Some(operand) = &cond.neq {
        return value != Some(operand);
    }
    if let Some(operand) = &cond.gt {
        return compare(value, operand, |a, b| a > b);
    }
    if let Some(operand) = &cond.gte {
        return compare(value, operand, |a, b| a >= b);
    }
    if let Some(operand) = &cond.lt {
        return compare(value, operand, |a, b| a < b);
    }
    if let Some(operand) = &cond.lte {
        return compare(value, operand, |a, b| a <= b);
    }
    value.is_some_and(DataValue::is_truthy)
}

/// Missing paths resolve to `null`.
pub fn resolve_content(content: &ContentExpr, model: &DataModel) -> DataValue {
    resolve_with_expr(model, &content.path, content.expr.as_deref()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dv(v: serde_json::Value) -> DataValue {
        DataValue::from(v)
    }

    fn model(v: serde_json::Value) -> DataModel {
        DataModel::from_value(dv(v)).unwrap()
    }

    fn cond(v: serde_json::Value) -> VisibleIf {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn empty_collections_have_exact_results() {
        let empty = dv(json!([]));
        assert_eq!(evaluate(Expression::Length, &empty), DataValue::Int(0));
        assert_eq!(evaluate(Expression::Any, &empty), DataValue::Bool(false));
        assert_eq!(evaluate(Expression::All, &empty), DataValue::Bool(false));
        assert_eq!(evaluate(Expression::None, &empty), DataValue::Bool(true));
        assert_eq!(evaluate(Expression::Sum, &empty), DataValue::Int(0));

        let empty_obj = dv(json!({}));
        assert_eq!(evaluate(Expression::All, &empty_obj), DataValue::Bool(false));
        assert_eq!(evaluate(Expression::Count, &empty_obj), DataValue::Int(0));
    }

    #[test]
    fn count_is_a_length_synonym() {
        let v = dv(json!([0, false, "x", null]));
        assert_eq!(evaluate(Expression::Count, &v), DataValue::Int(4));
        assert_eq!(evaluate(Expression::Length, &v), DataValue::Int(4));
        assert_eq!(
            evaluate(Expression::Length, &dv(json!({"a": 1, "b": 0}))),
            DataValue::Int(2)
        );
        assert_eq!(evaluate(Expression::Length, &dv(json!("héllo"))), DataValue::Int(5));
        assert_eq!(evaluate(Expression::Length, &dv(json!("a😀"))), DataValue::Int(3));
        assert_eq!(evaluate(Expression::Length, &dv(json!(12))), DataValue::Int(0));
    }

    #[test]
    fn boolean_aggregates_over_arrays_objects_and_scalars() {
        let mixed = dv(json!([0, 1, ""]));
        assert_eq!(evaluate(Expression::Any, &mixed), DataValue::Bool(true));
        assert_eq!(evaluate(Expression::All, &mixed), DataValue::Bool(false));
        assert_eq!(evaluate(Expression::None, &mixed), DataValue::Bool(false));

        let flags = dv(json!({"a": true, "b": true}));
        assert_eq!(evaluate(Expression::All, &flags), DataValue::Bool(true));

        assert_eq!(evaluate(Expression::Any, &dv(json!("x"))), DataValue::Bool(true));
        assert_eq!(evaluate(Expression::All, &dv(json!(0))), DataValue::Bool(false));
        assert_eq!(evaluate(Expression::None, &DataValue::Null), DataValue::Bool(true));
    }

    #[test]
    fn sum_ignores_non_numbers() {
        assert_eq!(
            evaluate(Expression::Sum, &dv(json!([1, "2", 3, null, true]))),
            DataValue::Int(4)
        );
        assert_eq!(
            evaluate(Expression::Sum, &dv(json!({"a": 1.5, "b": 2}))),
            DataValue::Float(3.5)
        );
        assert_eq!(evaluate(Expression::Sum, &dv(json!(7))), DataValue::Int(7));
        assert_eq!(evaluate(Expression::Sum, &dv(json!("7"))), DataValue::Int(0));
    }

    #[test]
    fn unknown_expression_name_passes_value_through() {
        let v = dv(json!([1, 2]));
        assert_eq!(evaluate_named("median", &v), v);
        assert_eq!(evaluate_named("length", &v), DataValue::Int(2));
        assert_eq!("sum".parse::<Expression>(), Ok(Expression::Sum));
        assert_eq!(Expression::None.to_string(), "none");
    }

    #[test]
    fn string_condition_is_truthiness_of_pointer() {
        let m = model(json!({"flag": true, "off": false, "items": []}));
        assert!(resolve_visibility(&cond(json!("/flag")), &m));
        assert!(!resolve_visibility(&cond(json!("/off")), &m));
        assert!(resolve_visibility(&cond(json!("/items")), &m));
        assert!(!resolve_visibility(&cond(json!("/missing")), &m));
    }

    #[test]
    fn condition_applies_expr_before_comparison() {
        let m = model(json!({"items": [1, 2, 3], "todos": [{"done": true}]}));
        assert!(resolve_visibility(
            &cond(json!({"path": "/items", "expr": "length", "eq": 3})),
            &m
        ));
        assert!(resolve_visibility(
            &cond(json!({"path": "/items", "expr": "sum", "gte": 6})),
            &m
        ));
        assert!(!resolve_visibility(
            &cond(json!({"path": "/items", "expr": "length", "lt": 3})),
            &m
        ));
        assert!(resolve_visibility(
            &cond(json!({"path": "/todos", "expr": "any"})),
            &m
        ));
    }

    #[test]
    fn first_present_operator_wins() {
        let m = model(json!({"status": "open"}));
        assert!(resolve_visibility(
            &cond(json!({"path": "/status", "eq": "open", "neq": "open"})),
            &m
        ));
        assert!(!resolve_visibility(
            &cond(json!({"path": "/status", "eq": "closed", "neq": "closed"})),
            &m
        ));
    }

    #[test]
    fn ordering_operators_need_numbers() {
        let m = model(json!({"n": 5, "s": "9"}));
        assert!(resolve_visibility(&cond(json!({"path": "/n", "gt": 4})), &m));
        assert!(!resolve_visibility(&cond(json!({"path": "/s", "gt": 4})), &m));
        assert!(!resolve_visibility(&cond(json!({"path": "/n", "lte": "9"})), &m));
        assert!(!resolve_visibility(&cond(json!({"path": "/missing", "lt": 1})), &m));
    }

    #[test]
    fn null_operand_is_a_present_operator() {
        let m = model(json!({"sel": null, "n": 0}));
        assert!(resolve_visibility(&cond(json!({"path": "/sel", "eq": null})), &m));
        assert!(!resolve_visibility(&cond(json!({"path": "/sel", "neq": null})), &m));
        assert!(!resolve_visibility(&cond(json!({"path": "/n", "eq": null})), &m));
        assert!(resolve_visibility(&cond(json!({"path": "/n", "neq": null})), &m));
        assert!(!resolve_visibility(&cond(json!({"path": "/n", "gte": null})), &m));
    }

    #[test]
    fn missing_path_is_not_null() {
        let m = model(json!({}));
        assert!(!resolve_visibility(&cond(json!({"path": "/gone", "eq": null})), &m));
        assert!(resolve_visibility(&cond(json!({"path": "/gone", "neq": null})), &m));
        assert!(resolve_visibility(
            &cond(json!({"path": "/gone", "expr": "length", "eq": 0})),
            &m
        ));
    }

    #[test]
    fn null_operator_survives_serde_round_trip() {
        let VisibleIf::Condition(c) = cond(json!({"path": "/sel", "eq": null})) else {
            panic!("expected condition");
        };
        assert_eq!(c.eq, Some(DataValue::Null));
        assert_eq!(c.neq, None);
        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back, json!({"path": "/sel", "eq": null}));
    }

    #[test]
    fn eq_compares_deeply() {
        let m = model(json!({"sel": {"id": 1}}));
        assert!(resolve_visibility(
            &cond(json!({"path": "/sel", "eq": {"id": 1}})),
            &m
        ));
        assert!(resolve_visibility(
            &cond(json!({"path": "/sel/id", "neq": 2})),
            &m
        ));
    }

    #[test]
    fn content_expr_resolves_path_and_expr() {
        let m = model(json!({"cart": {"prices": [2, 3]}}));
        let content: ContentExpr =
            serde_json::from_value(json!({"path": "/cart/prices", "expr": "sum"})).unwrap();
        assert_eq!(resolve_content(&content, &m), DataValue::Int(5));
        let raw = ContentExpr {
            path: "/cart/missing".to_string(),
            expr: None,
        };
        assert_eq!(resolve_content(&raw, &m), DataValue::Null);
    }
}
