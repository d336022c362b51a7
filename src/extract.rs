//! Value extraction: tell a row column apart from a value to bind, and
//! compute captured values without invoking caller code.
//!
//! The interpreter is deliberately closed: literals and captured bindings
//! yield their value, member access reads a field of an evaluated record.
//! Anything else fails loudly, preserving the no-arbitrary-code-execution
//! guarantee.

use crate::error::{QueryError, QueryResult};
use crate::expr::Scalar;
use crate::value::Value;

/// True when the scalar transitively refers to the row parameter.
pub fn is_row_dependent(scalar: &Scalar) -> bool {
    match scalar {
        Scalar::Row => true,
        Scalar::Field { target, .. } => is_row_dependent(target),
        Scalar::Lit(_) | Scalar::Bind(_) => false,
    }
}

/// Evaluate a closed (non-row) scalar to the value that will be bound.
///
/// Extraction order must match the parse traversal order; callers evaluate
/// operands left-to-right, depth-first.
pub fn evaluate(scalar: &Scalar) -> QueryResult<Value> {
    match scalar {
        Scalar::Lit(v) | Scalar::Bind(v) => Ok(v.clone()),
        Scalar::Field { target, name } => {
            let base = evaluate(target)?;
            match base {
                Value::Record(fields) => fields.get(name).cloned().ok_or_else(|| {
                    QueryError::unsupported(format!("{} (no field '{}')", scalar, name))
                }),
                _ => Err(QueryError::unsupported(format!(
                    "{} (member access on non-record value)",
                    scalar
                ))),
            }
        }
        Scalar::Row => Err(QueryError::unsupported(scalar)),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::expr::{bind, col, lit};

    fn record(fields: &[(&str, Value)]) -> Value {
        Value::Record(
            fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }

    #[test]
    fn test_row_chain_is_column_dependent() {
        assert!(is_row_dependent(&col("Age")));
        assert!(is_row_dependent(&col("Address").field("City")));
        assert!(!is_row_dependent(&lit(5)));
        assert!(!is_row_dependent(&bind(5)));
    }

    #[test]
    fn test_evaluate_field_chain() {
        let settings = record(&[("Threshold", Value::Int(18))]);
        let captured = record(&[("Settings", settings)]);
        let scalar = bind(captured).field("Settings").field("Threshold");
        assert_eq!(evaluate(&scalar).unwrap(), Value::Int(18));
    }

    #[test]
    fn test_evaluate_missing_field_fails() {
        let scalar = bind(record(&[("A", Value::Int(1))])).field("B");
        let err = evaluate(&scalar).unwrap_err();
        assert!(err.to_string().contains("no field 'B'"));
    }

    #[test]
    fn test_evaluate_rejects_row() {
        assert!(evaluate(&Scalar::Row).is_err());
        assert!(evaluate(&col("Age")).is_err());
    }

    #[test]
    fn test_evaluate_rejects_member_of_scalar() {
        let scalar = bind(5).field("Anything");
        let err = evaluate(&scalar).unwrap_err();
        assert!(err.to_string().contains("non-record"));
    }
}
