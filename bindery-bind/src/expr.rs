//! Boolean expressions over a bound value, as used by the `expr` validator.

use evalexpr::{ContextWithMutableVariables, HashMapContext, Value as ExprValue};
use serde_json::Value;

use bindery_core::BoxError;

use crate::registry::Validator;

/// Identifier `$` is rewritten to before evaluation.
const VALUE_IDENT: &str = "value";

/// Evaluates `expression` to a boolean.
///
/// When `value` is given, every `$` outside string literals refers to it.
/// JSON numbers, strings, booleans and arrays map onto expression values;
/// objects and `null` become the empty value.
///
/// # Errors
///
/// Returns the evaluation error when the expression is malformed or does not
/// produce a boolean.
pub fn eval_bool(expression: &str, value: Option<&Value>) -> Result<bool, BoxError> {
    let mut context = HashMapContext::new();
    let source = match value {
        Some(value) => {
            context
                .set_value(VALUE_IDENT.into(), to_expr(value))
                .map_err(|err| err.to_string())?;
            substitute_dollar(expression)
        }
        None => expression.to_owned(),
    };
    evalexpr::eval_boolean_with_context(&source, &context).map_err(|err| {
        BoxError::from(format!("cannot evaluate `{expression}`: {err}"))
    })
}

fn substitute_dollar(expression: &str) -> String {
    let mut out = String::with_capacity(expression.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    for c in expression.chars() {
        match c {
            '$' if !in_string => out.push_str(VALUE_IDENT),
            '"' if !escaped => {
                in_string = !in_string;
                out.push(c);
            }
            _ => out.push(c),
        }
        escaped = in_string && c == '\\' && !escaped;
    }
    out
}

fn to_expr(value: &Value) -> ExprValue {
    match value {
        Value::Null | Value::Object(_) => ExprValue::Empty,
        Value::Bool(b) => ExprValue::Boolean(*b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => ExprValue::Int(i),
            None => ExprValue::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(s) => ExprValue::String(s.clone()),
        Value::Array(items) => ExprValue::Tuple(items.iter().map(to_expr).collect()),
    }
}

/// Validator registered as `expr`: the rule is a boolean expression over `$`.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExprValidator;

impl Validator for ExprValidator {
    fn validate(&self, rule: &str, value: &Value) -> Result<bool, BoxError> {
        eval_bool(rule, Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn dollar_refers_to_the_value() {
        assert!(eval_bool("$ > 3", Some(&json!(5))).unwrap());
        assert!(!eval_bool("$ > 3 && $ < 5", Some(&json!(7))).unwrap());
        assert!(eval_bool("$ == 2.5", Some(&json!(2.5))).unwrap());
        assert!(eval_bool("len($) == 2", Some(&json!(["a", "b"]))).unwrap());
    }

    #[test]
    fn dollar_inside_string_literals_is_kept() {
        assert!(eval_bool(r#"$ == "a$b""#, Some(&json!("a$b"))).unwrap());
        assert!(eval_bool(r#"$ == "q\"$""#, Some(&json!("q\"$"))).unwrap());
    }

    #[test]
    fn expressions_without_value() {
        assert!(eval_bool("1 + 1 == 2", None).unwrap());
        assert!(eval_bool("1 +", None).is_err());
        assert!(eval_bool("1 + 1", None).is_err());
    }

    #[test]
    fn validator_delegates_to_eval() {
        let validator = ExprValidator;
        assert!(validator.validate("$ != \"\"", &json!("x")).unwrap());
        assert!(!validator.validate("$", &json!(false)).unwrap());
    }
}
