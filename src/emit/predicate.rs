//! Predicate tree to SQL. Exhaustive over every node kind; an unresolved
//! shape cannot reach here without a compile error upstream.

use crate::dialect::SqlDialect;
use crate::error::QueryResult;
use crate::predicate::{LikeTerm, Operand, PredicateNode};
use crate::value::Value;

use super::ParamSink;

pub(crate) fn predicate_sql(
    node: &PredicateNode,
    generator: &dyn SqlDialect,
    sink: &mut ParamSink,
) -> QueryResult<String> {
    match node {
        PredicateNode::Binary {
            column,
            op,
            operand,
        } => {
            let rhs = operand_sql(operand, generator, sink)?;
            Ok(format!(
                "{} {} {}",
                generator.quote_identifier(column),
                op.sql_symbol(),
                rhs
            ))
        }
        PredicateNode::Like(term) => like_sql(term, generator, sink),
        PredicateNode::LikeGroup(terms) => {
            let mut parts = Vec::with_capacity(terms.len());
            for term in terms {
                parts.push(like_sql(term, generator, sink)?);
            }
            Ok(format!("({})", parts.join(" OR ")))
        }
        PredicateNode::In {
            column,
            index,
            values,
        } => in_sql(column, *index, values, false, generator, sink),
        PredicateNode::NotIn {
            column,
            index,
            values,
        } => in_sql(column, *index, values, true, generator, sink),
        PredicateNode::IsNull { column } => {
            Ok(format!("{} IS NULL", generator.quote_identifier(column)))
        }
        PredicateNode::IsNotNull { column } => {
            Ok(format!("{} IS NOT NULL", generator.quote_identifier(column)))
        }
        PredicateNode::And(children) => join_children(children, " AND ", generator, sink),
        PredicateNode::Or(children) => join_children(children, " OR ", generator, sink),
    }
}

fn join_children(
    children: &[PredicateNode],
    sep: &str,
    generator: &dyn SqlDialect,
    sink: &mut ParamSink,
) -> QueryResult<String> {
    let mut parts = Vec::with_capacity(children.len());
    for child in children {
        let sql = predicate_sql(child, generator, sink)?;
        // Nested boolean groups keep their own parens for precedence.
        if matches!(child, PredicateNode::And(_) | PredicateNode::Or(_)) {
            parts.push(format!("({})", sql));
        } else {
            parts.push(sql);
        }
    }
    Ok(parts.join(sep))
}

fn operand_sql(
    operand: &Operand,
    generator: &dyn SqlDialect,
    sink: &mut ParamSink,
) -> QueryResult<String> {
    match operand {
        Operand::Const(v) => Ok(const_sql(v, generator)),
        Operand::Param { index, value } => sink.bind_indexed(*index, value.clone()),
    }
}

pub(crate) fn const_sql(value: &Value, generator: &dyn SqlDialect) -> String {
    match value {
        Value::Bool(b) => generator.bool_literal(*b),
        other => other.sql_literal(),
    }
}

fn like_sql(term: &LikeTerm, generator: &dyn SqlDialect, sink: &mut ParamSink) -> QueryResult<String> {
    let column = generator.quote_identifier(&term.column);
    let (pre, post) = term.kind.wildcards();
    match &term.pattern {
        Operand::Const(v) => {
            let body = match v {
                Value::String(s) => s.replace('\'', "''"),
                other => other.sql_literal(),
            };
            Ok(format!(
                "{} LIKE '{}{}{}'",
                column,
                if pre { "%" } else { "" },
                body,
                if post { "%" } else { "" }
            ))
        }
        Operand::Param { index, value } => {
            // Wildcards are assembled in SQL around the bound fragment,
            // using the dialect's concatenation operator.
            let name = sink.bind_indexed(*index, value.clone())?;
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
    }
}

fn in_sql(
    column: &str,
    index: usize,
    values: &[Value],
    negated: bool,
    generator: &dyn SqlDialect,
    sink: &mut ParamSink,
) -> QueryResult<String> {
    // The group still occupies its parse-assigned index slot even when empty.
    sink.consume_index(index)?;
    if values.is_empty() {
        // An empty collection matches nothing (or everything when negated),
        // never a syntax error.
        return Ok(if negated { "1=1" } else { "0=1" }.to_string());
    }
    let mut names = Vec::with_capacity(values.len());
    for (i, value) in values.iter().enumerate() {
        let name = format!("@p_in_{}_{}", index, i);
        sink.bind_named(name.clone(), value.clone());
        names.push(name);
    }
    Ok(format!(
        "{} {} ({})",
        generator.quote_identifier(column),
        if negated { "NOT IN" } else { "IN" },
        names.join(", ")
    ))
}
