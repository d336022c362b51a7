//! Runtime translation fallback.
//!
//! Used when the query shape is only known while the program runs: a query
//! handle that accumulates filters across branches, or a predicate whose
//! shape is opaque until invoked. The translator walks the live expression
//! tree node-by-node and emits SQL text directly, without building a
//! predicate tree first. And/Or stay unflattened textual concatenation; this
//! path is not statically re-optimized. Every value is still bound as a
//! `@dyn_<n>` parameter, never interpolated.

use tracing::debug;

use crate::dialect::{Dialect, SqlDialect};
use crate::error::{QueryError, QueryResult};
use crate::expr::{CompareOp, FilterExpr, Scalar};
use crate::extract::{evaluate, is_row_dependent};
use crate::meta::EntityMeta;
use crate::value::Value;

pub struct RuntimeTranslator<'a> {
    meta: &'a EntityMeta,
    dialect: Dialect,
    clauses: Vec<String>,
    params: Vec<(String, Value)>,
    counter: usize,
}

impl<'a> RuntimeTranslator<'a> {
    pub fn new(meta: &'a EntityMeta, dialect: Dialect) -> Self {
        Self {
            meta,
            dialect,
            clauses: Vec::new(),
            params: Vec::new(),
            counter: 0,
        }
    }

    /// Translate one accumulated filter. Each call contributes one AND-ed
    /// clause, composing left-to-right in call order.
    pub fn push_filter(&mut self, expr: &FilterExpr) -> QueryResult<()> {
        debug!(filter = %expr, "runtime-translating filter");
        let generator = self.dialect.generator();
        let sql = self.walk(expr, generator.as_ref())?;
        self.clauses.push(sql);
        Ok(())
    }

    /// The combined WHERE fragment and its parameters.
    pub fn finish(self) -> (Option<String>, Vec<(String, Value)>) {
        let clause = if self.clauses.is_empty() {
            None
        } else {
            Some(self.clauses.join(" AND "))
        };
        (clause, self.params)
    }

    fn walk(&mut self, expr: &FilterExpr, generator: &dyn SqlDialect) -> QueryResult<String> {
        match expr {
            FilterExpr::And(l, r) => Ok(format!(
                "({} AND {})",
                self.walk(l, generator)?,
                self.walk(r, generator)?
            )),
            FilterExpr::Or(l, r) => Ok(format!(
                "({} OR {})",
                self.walk(l, generator)?,
                self.walk(r, generator)?
            )),
            FilterExpr::Compare { op, lhs, rhs } => self.compare(expr, *op, lhs, rhs, generator),
            FilterExpr::Match {
                kind,
                target,
                pattern,
            } => {
                let column = self.column_sql(target, generator)?;
                if is_row_dependent(pattern) {
                    return Err(QueryError::unsupported(expr));
                }
                let name = self.bind(evaluate(pattern)?);
                let (pre, post) = kind.wildcards();
                let mut parts: Vec<&str> = Vec::with_capacity(3);
                if pre {
                    parts.push("'%'");
                }
                parts.push(name.as_str());
                if post {
                    parts.push("'%'");
                }
                Ok(format!("{} LIKE {}", column, generator.string_concat(&parts)))
            }
            FilterExpr::InList { haystack, needle } => {
                self.in_list(expr, haystack, needle, false, generator)
            }
            FilterExpr::Not(inner) => match inner.as_ref() {
                FilterExpr::InList { haystack, needle } => {
                    self.in_list(expr, haystack, needle, true, generator)
                }
                _ => Err(QueryError::unsupported(expr)),
            },
        }
    }

    fn compare(
        &mut self,
        expr: &FilterExpr,
        op: CompareOp,
        lhs: &Scalar,
        rhs: &Scalar,
        generator: &dyn SqlDialect,
    ) -> QueryResult<String> {
        let (column_side, value_side, op) = match (is_row_dependent(lhs), is_row_dependent(rhs)) {
            (true, false) => (lhs, rhs, op),
            (false, true) => (rhs, lhs, op.flipped()),
            _ => return Err(QueryError::unsupported(expr)),
        };
        let column = self.column_sql(column_side, generator)?;

        // Same null semantics as the static path.
        if matches!(value_side, Scalar::Lit(Value::Null)) {
            return match op {
                CompareOp::Eq => Ok(format!("{} IS NULL", column)),
                CompareOp::Ne => Ok(format!("{} IS NOT NULL", column)),
                _ => Err(QueryError::unsupported(expr)),
            };
        }

        // Any non-column subtree is evaluated whole and bound as one
        // opaque parameter.
        let name = self.bind(evaluate(value_side)?);
        Ok(format!("{} {} {}", column, op.sql_symbol(), name))
    }

    fn in_list(
        &mut self,
        expr: &FilterExpr,
        haystack: &Scalar,
        needle: &Scalar,
        negated: bool,
        generator: &dyn SqlDialect,
    ) -> QueryResult<String> {
        let column = self.column_sql(needle, generator)?;
        if is_row_dependent(haystack) {
            return Err(QueryError::unsupported(expr));
        }
        let values = match evaluate(haystack)? {
            Value::List(vals) => vals,
            _ => return Err(QueryError::unsupported(expr)),
        };
        if values.is_empty() {
            return Ok(if negated { "1=1" } else { "0=1" }.to_string());
        }
        let names: Vec<String> = values.into_iter().map(|v| self.bind(v)).collect();
        Ok(format!(
            "{} {} ({})",
            column,
            if negated { "NOT IN" } else { "IN" },
            names.join(", ")
        ))
    }

    /// Column classification identical to the static path: a single-level
    /// property access on the row, resolved through metadata.
    fn column_sql(&self, scalar: &Scalar, generator: &dyn SqlDialect) -> QueryResult<String> {
        match scalar {
            Scalar::Field { target, name } if matches!(target.as_ref(), Scalar::Row) => self
                .meta
                .column_for(name)
                .map(|c| generator.quote_identifier(c))
                .ok_or_else(|| QueryError::unsupported(scalar)),
            _ => Err(QueryError::unsupported(scalar)),
        }
    }

    fn bind(&mut self, value: Value) -> String {
        let name = format!("@dyn_{}", self.counter);
        self.counter += 1;
        self.params.push((name.clone(), value));
        name
    }
}
