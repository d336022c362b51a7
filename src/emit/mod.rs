//! Static dialect emitter: QueryDescriptor + dialect in, SQL text + ordered
//! parameter list out.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::query::{Operation, QueryDescriptor};
use crate::value::Value;

pub mod mutation;
pub mod predicate;
pub mod select;

pub use mutation::{delete_by_key, update_by_key};

/// The compiler's output: parameterized SQL text plus the values to bind.
/// Binding is positional-by-name; every name in `sql` appears exactly once
/// in `params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<(String, Value)>,
}

/// Collects bound parameters in emission order and enforces that parse-time
/// indices are consumed in the same order they were assigned.
pub(crate) struct ParamSink {
    params: Vec<(String, Value)>,
    consumed: usize,
}

impl ParamSink {
    pub(crate) fn new() -> Self {
        Self {
            params: Vec::new(),
            consumed: 0,
        }
    }

    /// Check off one parse-assigned index. Out-of-order consumption means
    /// the emitter walked the tree differently than the parser did.
    pub(crate) fn consume_index(&mut self, index: usize) -> QueryResult<()> {
        if index != self.consumed {
            return Err(QueryError::ParameterAlignmentViolation {
                expected: index,
                actual: self.consumed,
            });
        }
        self.consumed += 1;
        Ok(())
    }

    /// Bind a parse-indexed predicate parameter (`@p<n>`).
    pub(crate) fn bind_indexed(&mut self, index: usize, value: Value) -> QueryResult<String> {
        self.consume_index(index)?;
        let name = format!("@p{}", index);
        self.params.push((name.clone(), value));
        Ok(name)
    }

    /// Bind a parameter outside the predicate index space
    /// (`@p_u_<n>`, `@p<r>_<c>`, `@p_in_<n>_<i>`, `@dyn_<n>`).
    pub(crate) fn bind_named(&mut self, name: String, value: Value) {
        self.params.push((name, value));
    }

    pub(crate) fn into_params(self) -> Vec<(String, Value)> {
        self.params
    }
}

/// A WHERE fragment produced by the runtime translation fallback, substituted
/// for the descriptor's parsed predicate.
pub(crate) type WhereOverride = Option<(Option<String>, Vec<(String, Value)>)>;

/// Produce the WHERE fragment from the parsed predicate or the runtime
/// override, applying the NotExists filter negation where requested.
pub(crate) fn where_fragment(
    desc: &QueryDescriptor,
    generator: &dyn crate::dialect::SqlDialect,
    sink: &mut ParamSink,
    where_override: WhereOverride,
) -> QueryResult<Option<String>> {
    let base = match where_override {
        Some((sql, params)) => {
            for (name, value) in params {
                sink.bind_named(name, value);
            }
            sql
        }
        None => match &desc.predicate {
            Some(node) => Some(predicate::predicate_sql(node, generator, sink)?),
            None => None,
        },
    };
    Ok(match (base, desc.exists) {
        (Some(sql), Some(crate::query::ExistsKind::NotExists)) => Some(format!("NOT ({})", sql)),
        (base, _) => base,
    })
}

/// Compile a descriptor for the target dialect.
pub fn build_statement(desc: &QueryDescriptor, dialect: Dialect) -> QueryResult<Statement> {
    build_statement_with_where(desc, dialect, None)
}

pub(crate) fn build_statement_with_where(
    desc: &QueryDescriptor,
    dialect: Dialect,
    where_override: WhereOverride,
) -> QueryResult<Statement> {
    debug!(table = %desc.table, operation = ?desc.operation, %dialect, "compiling statement");
    match desc.operation {
        Operation::Select => select::build_select(desc, dialect, where_override),
        Operation::Insert => mutation::build_insert(desc, dialect),
        Operation::Update => mutation::build_update(desc, dialect, where_override),
        Operation::Delete => mutation::build_delete(desc, dialect, where_override),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_rejects_out_of_order_index() {
        let mut sink = ParamSink::new();
        sink.bind_indexed(0, Value::Int(1)).unwrap();
        let err = sink.bind_indexed(2, Value::Int(2)).unwrap_err();
        assert!(matches!(
            err,
            QueryError::ParameterAlignmentViolation {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_sink_preserves_emission_order() {
        let mut sink = ParamSink::new();
        sink.bind_indexed(0, Value::Int(1)).unwrap();
        sink.bind_named("@p_u_0".to_string(), Value::Int(2));
        let params = sink.into_params();
        assert_eq!(params[0].0, "@p0");
        assert_eq!(params[1].0, "@p_u_0");
    }
}
