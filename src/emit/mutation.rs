//! INSERT / UPDATE / DELETE SQL generation.
//!
//! Predicate-based Update and Delete compile to a single statement over a
//! potentially unbounded row set. Entity-keyed mutations compile to one
//! statement per entity; the execution collaborator runs them in a loop and
//! sums the affected-row counts.

use crate::dialect::Dialect;
use crate::error::{QueryError, QueryResult};
use crate::meta::EntityMeta;
use crate::predicate::Operand;
use crate::query::QueryDescriptor;
use crate::value::Value;

use super::{ParamSink, Statement, WhereOverride, predicate::const_sql, where_fragment};

/// One multi-row INSERT, one positional parameter per column per row.
pub(crate) fn build_insert(desc: &QueryDescriptor, dialect: Dialect) -> QueryResult<Statement> {
    let generator = dialect.generator();
    let mut sink = ParamSink::new();

    if desc.rows.is_empty() {
        return Err(QueryError::unsupported("insert with no rows"));
    }

    let columns: Vec<String> = desc
        .row_columns
        .iter()
        .map(|c| generator.quote_identifier(c))
        .collect();

    let mut tuples = Vec::with_capacity(desc.rows.len());
    for (r, row) in desc.rows.iter().enumerate() {
        if row.len() != desc.row_columns.len() {
            return Err(QueryError::unsupported(format!(
                "row {} has {} values for {} columns",
                r,
                row.len(),
                desc.row_columns.len()
            )));
        }
        let mut names = Vec::with_capacity(row.len());
        for (c, value) in row.iter().enumerate() {
            let name = format!("@p{}_{}", r, c);
            sink.bind_named(name.clone(), value.clone());
            names.push(name);
        }
        tuples.push(format!("({})", names.join(", ")));
    }

    Ok(Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES {}",
            generator.quote_identifier(&desc.table),
            columns.join(", "),
            tuples.join(", ")
        ),
        params: sink.into_params(),
    })
}

/// Predicate-based UPDATE: single statement, SET payload then WHERE.
pub(crate) fn build_update(
    desc: &QueryDescriptor,
    dialect: Dialect,
    where_override: WhereOverride,
) -> QueryResult<Statement> {
    let generator = dialect.generator();
    let mut sink = ParamSink::new();

    if desc.updates.is_empty() {
        return Err(QueryError::unsupported("update with no SET payload"));
    }

    let mut sets = Vec::with_capacity(desc.updates.len());
    for update in &desc.updates {
        let value_sql = match &update.operand {
            Operand::Const(v) => const_sql(v, generator.as_ref()),
            Operand::Param { index, value } => {
                let name = format!("@p_u_{}", index);
                sink.bind_named(name.clone(), value.clone());
                name
            }
        };
        sets.push(format!(
            "{} = {}",
            generator.quote_identifier(&update.column),
            value_sql
        ));
    }

    let mut sql = format!(
        "UPDATE {} SET {}",
        generator.quote_identifier(&desc.table),
        sets.join(", ")
    );
    if let Some(w) = where_fragment(desc, generator.as_ref(), &mut sink, where_override)? {
        sql.push_str(" WHERE ");
        sql.push_str(&w);
    }

    Ok(Statement {
        sql,
        params: sink.into_params(),
    })
}

/// Predicate-based DELETE: single statement over whatever the filter matches.
pub(crate) fn build_delete(
    desc: &QueryDescriptor,
    dialect: Dialect,
    where_override: WhereOverride,
) -> QueryResult<Statement> {
    let generator = dialect.generator();
    let mut sink = ParamSink::new();

    let mut sql = format!("DELETE FROM {}", generator.quote_identifier(&desc.table));
    if let Some(w) = where_fragment(desc, generator.as_ref(), &mut sink, where_override)? {
        sql.push_str(" WHERE ");
        sql.push_str(&w);
    }

    Ok(Statement {
        sql,
        params: sink.into_params(),
    })
}

/// Entity-keyed UPDATE: one statement per row, SET over every non-key column,
/// addressed by the resolved primary key.
pub fn update_by_key(
    meta: &EntityMeta,
    rows: &[Vec<Value>],
    dialect: Dialect,
) -> QueryResult<Vec<Statement>> {
    let generator = dialect.generator();
    if meta.table.is_empty() {
        return Err(QueryError::MissingTableMapping(meta.entity.clone()));
    }
    let key = meta.primary_key();
    let columns = meta.column_names();
    let key_idx = key_index(meta, &key, &columns)?;
    if columns.len() < 2 {
        return Err(QueryError::unsupported(format!(
            "entity '{}' has no non-key columns to update",
            meta.entity
        )));
    }

    let mut statements = Vec::with_capacity(rows.len());
    for row in rows {
        check_row_width(meta, row, columns.len())?;
        let mut sink = ParamSink::new();
        let mut sets = Vec::with_capacity(columns.len() - 1);
        let mut u = 0;
        for (i, column) in columns.iter().enumerate() {
            if i == key_idx {
                continue;
            }
            let name = format!("@p_u_{}", u);
            u += 1;
            sink.bind_named(name.clone(), row[i].clone());
            sets.push(format!("{} = {}", generator.quote_identifier(column), name));
        }
        sink.bind_named("@p_key".to_string(), row[key_idx].clone());
        statements.push(Statement {
            sql: format!(
                "UPDATE {} SET {} WHERE {} = @p_key",
                generator.quote_identifier(&meta.table),
                sets.join(", "),
                generator.quote_identifier(&key)
            ),
            params: sink.into_params(),
        });
    }
    Ok(statements)
}

/// Entity-keyed DELETE: one statement per row.
pub fn delete_by_key(
    meta: &EntityMeta,
    rows: &[Vec<Value>],
    dialect: Dialect,
) -> QueryResult<Vec<Statement>> {
    let generator = dialect.generator();
    if meta.table.is_empty() {
        return Err(QueryError::MissingTableMapping(meta.entity.clone()));
    }
    let key = meta.primary_key();
    let columns = meta.column_names();
    let key_idx = key_index(meta, &key, &columns)?;

    let mut statements = Vec::with_capacity(rows.len());
    for row in rows {
        check_row_width(meta, row, columns.len())?;
        let mut sink = ParamSink::new();
        sink.bind_named("@p_key".to_string(), row[key_idx].clone());
        statements.push(Statement {
            sql: format!(
                "DELETE FROM {} WHERE {} = @p_key",
                generator.quote_identifier(&meta.table),
                generator.quote_identifier(&key)
            ),
            params: sink.into_params(),
        });
    }
    Ok(statements)
}

fn key_index(meta: &EntityMeta, key: &str, columns: &[&str]) -> QueryResult<usize> {
    columns.iter().position(|c| *c == key).ok_or_else(|| {
        QueryError::unsupported(format!(
            "entity '{}' has no value for key column '{}'",
            meta.entity, key
        ))
    })
}

fn check_row_width(meta: &EntityMeta, row: &[Value], expected: usize) -> QueryResult<()> {
    if row.len() != expected {
        return Err(QueryError::unsupported(format!(
            "entity '{}' row has {} values for {} columns",
            meta.entity,
            row.len(),
            expected
        )));
    }
    Ok(())
}
