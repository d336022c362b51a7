//! Query descriptor and the caller-facing builder.
//!
//! The builder accumulates filter/join/order/paging/projection/mutation
//! operations in call order and shapes them into a [`QueryDescriptor`]; it
//! holds no SQL knowledge. Which translation path runs the descriptor is
//! decided by the external classifier and passed in as a flag.

use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::emit::{self, Statement};
use crate::error::{QueryError, QueryResult};
use crate::expr::{FilterExpr, Scalar};
use crate::extract::evaluate;
use crate::meta::EntityMeta;
use crate::predicate::{Operand, PredicateNode, PredicateParser};
use crate::runtime::RuntimeTranslator;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
}

impl JoinKind {
    pub fn sql_keyword(&self) -> &'static str {
        match self {
            JoinKind::Inner => "INNER",
            JoinKind::Left => "LEFT",
            JoinKind::Right => "RIGHT",
        }
    }
}

/// One join: the inner table and the two key columns, already resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub table: String,
    pub outer_key: String,
    pub inner_key: String,
    pub kind: JoinKind,
}

/// One primary or secondary sort key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortKey {
    pub column: String,
    pub descending: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunc {
    Count,
    Max,
    Min,
    Sum,
    Avg,
}

impl std::fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AggregateFunc::Count => write!(f, "COUNT"),
            AggregateFunc::Max => write!(f, "MAX"),
            AggregateFunc::Min => write!(f, "MIN"),
            AggregateFunc::Sum => write!(f, "SUM"),
            AggregateFunc::Avg => write!(f, "AVG"),
        }
    }
}

/// EXISTS-shaped aggregation. `NotExists` negates the filter, not the
/// EXISTS itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExistsKind {
    Exists,
    NotExists,
}

/// One projected output: a plain column, a group key, or an aggregate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ProjectionEntry {
    Column {
        column: String,
        alias: Option<String>,
    },
    Key {
        column: String,
        alias: Option<String>,
    },
    Aggregate {
        func: AggregateFunc,
        column: Option<String>,
        alias: Option<String>,
    },
}

/// One SET assignment of an Update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateSet {
    pub column: String,
    pub operand: Operand,
}

/// The compiled shape of one query or mutation. Built once per call,
/// immutable after hand-off to the emitter, discarded afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    pub operation: Operation,
    pub table: String,
    pub predicate: Option<PredicateNode>,
    #[serde(default)]
    pub join: Option<JoinSpec>,
    #[serde(default)]
    pub group_by: Vec<String>,
    #[serde(default)]
    pub order_by: Vec<SortKey>,
    #[serde(default)]
    pub take: Option<u64>,
    #[serde(default)]
    pub skip: Option<u64>,
    #[serde(default)]
    pub distinct: bool,
    #[serde(default)]
    pub projection: Vec<ProjectionEntry>,
    #[serde(default)]
    pub exists: Option<ExistsKind>,
    #[serde(default)]
    pub updates: Vec<UpdateSet>,
    /// Column list for mutation rows, in metadata order.
    #[serde(default)]
    pub row_columns: Vec<String>,
    /// Mutation rows, values ordered like `row_columns`.
    #[serde(default)]
    pub rows: Vec<Vec<Value>>,
}

enum Pending {
    Column { property: String, alias: Option<String> },
    Key { property: String, alias: Option<String> },
    Aggregate {
        func: AggregateFunc,
        property: Option<String>,
        alias: Option<String>,
    },
}

/// Fluent accumulation surface. Methods consume and return `self`; the first
/// shaping error is kept and surfaced when the descriptor is built.
pub struct Query<'a> {
    meta: &'a EntityMeta,
    operation: Operation,
    filters: Vec<FilterExpr>,
    join: Option<JoinSpec>,
    group_props: Vec<String>,
    order: Vec<(String, bool)>,
    take: Option<u64>,
    skip: Option<u64>,
    distinct: bool,
    projection: Vec<Pending>,
    exists: Option<ExistsKind>,
    sets: Vec<(String, Scalar)>,
    rows: Vec<Vec<Value>>,
    error: Option<QueryError>,
}

impl<'a> Query<'a> {
    fn new(meta: &'a EntityMeta, operation: Operation) -> Self {
        Self {
            meta,
            operation,
            filters: Vec::new(),
            join: None,
            group_props: Vec::new(),
            order: Vec::new(),
            take: None,
            skip: None,
            distinct: false,
            projection: Vec::new(),
            exists: None,
            sets: Vec::new(),
            rows: Vec::new(),
            error: None,
        }
    }

    pub fn select(meta: &'a EntityMeta) -> Self {
        Self::new(meta, Operation::Select)
    }

    pub fn insert(meta: &'a EntityMeta) -> Self {
        Self::new(meta, Operation::Insert)
    }

    pub fn update(meta: &'a EntityMeta) -> Self {
        Self::new(meta, Operation::Update)
    }

    pub fn delete(meta: &'a EntityMeta) -> Self {
        Self::new(meta, Operation::Delete)
    }

    /// Add a filter. Multiple calls compose with AND in call order.
    pub fn filter(mut self, expr: FilterExpr) -> Self {
        self.filters.push(expr);
        self
    }

    /// Join another entity. Both key selectors are required; the inner
    /// entity's mapping is resolved here, while the metadata is in hand.
    pub fn join(
        mut self,
        inner: &EntityMeta,
        outer_key: impl AsRef<str>,
        inner_key: impl AsRef<str>,
        kind: JoinKind,
    ) -> Self {
        let outer_key = outer_key.as_ref();
        let inner_key = inner_key.as_ref();
        let outer = match self.meta.column_for(outer_key) {
            Some(c) => c.to_string(),
            None => return self.fail(QueryError::unsupported(outer_key)),
        };
        let inner_col = match inner.column_for(inner_key) {
            Some(c) => c.to_string(),
            None => return self.fail(QueryError::unsupported(inner_key)),
        };
        self.join = Some(JoinSpec {
            table: inner.table.clone(),
            outer_key: outer,
            inner_key: inner_col,
            kind,
        });
        self
    }

    pub fn inner_join(
        self,
        inner: &EntityMeta,
        outer_key: impl AsRef<str>,
        inner_key: impl AsRef<str>,
    ) -> Self {
        self.join(inner, outer_key, inner_key, JoinKind::Inner)
    }

    pub fn left_join(
        self,
        inner: &EntityMeta,
        outer_key: impl AsRef<str>,
        inner_key: impl AsRef<str>,
    ) -> Self {
        self.join(inner, outer_key, inner_key, JoinKind::Left)
    }

    pub fn order_by(mut self, property: impl AsRef<str>) -> Self {
        self.order.push((property.as_ref().to_string(), false));
        self
    }

    pub fn order_by_desc(mut self, property: impl AsRef<str>) -> Self {
        self.order.push((property.as_ref().to_string(), true));
        self
    }

    pub fn take(mut self, n: u64) -> Self {
        self.take = Some(n);
        self
    }

    pub fn skip(mut self, n: u64) -> Self {
        self.skip = Some(n);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    pub fn group_by<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_props
            .extend(properties.into_iter().map(|p| p.as_ref().to_string()));
        self
    }

    pub fn project<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.projection
            .extend(properties.into_iter().map(|p| Pending::Column {
                property: p.as_ref().to_string(),
                alias: None,
            }));
        self
    }

    pub fn project_as(mut self, property: impl AsRef<str>, alias: impl Into<String>) -> Self {
        self.projection.push(Pending::Column {
            property: property.as_ref().to_string(),
            alias: Some(alias.into()),
        });
        self
    }

    /// Project a group key.
    pub fn project_key(mut self, property: impl AsRef<str>) -> Self {
        self.projection.push(Pending::Key {
            property: property.as_ref().to_string(),
            alias: None,
        });
        self
    }

    /// COUNT(*) has no column argument.
    pub fn count(mut self, alias: impl Into<String>) -> Self {
        self.projection.push(Pending::Aggregate {
            func: AggregateFunc::Count,
            property: None,
            alias: Some(alias.into()),
        });
        self
    }

    /// MAX/MIN/SUM/AVG over a column.
    pub fn aggregate(
        mut self,
        func: AggregateFunc,
        property: impl AsRef<str>,
        alias: impl Into<String>,
    ) -> Self {
        self.projection.push(Pending::Aggregate {
            func,
            property: Some(property.as_ref().to_string()),
            alias: Some(alias.into()),
        });
        self
    }

    pub fn exists(mut self) -> Self {
        self.exists = Some(ExistsKind::Exists);
        self
    }

    pub fn not_exists(mut self) -> Self {
        self.exists = Some(ExistsKind::NotExists);
        self
    }

    /// SET assignment for an Update.
    pub fn set(mut self, property: impl AsRef<str>, value: impl Into<Scalar>) -> Self {
        self.sets.push((property.as_ref().to_string(), value.into()));
        self
    }

    /// Add one mutation row, values ordered like the metadata column list.
    pub fn row<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.rows
            .push(values.into_iter().map(|v| v.into()).collect());
        self
    }

    fn fail(mut self, err: QueryError) -> Self {
        if self.error.is_none() {
            self.error = Some(err);
        }
        self
    }

    /// Shape the accumulated operations into a descriptor. The predicate is
    /// parsed here unless the runtime path will translate the filters itself.
    fn build(self, parse_predicate: bool) -> QueryResult<(QueryDescriptor, Vec<FilterExpr>)> {
        if let Some(err) = self.error {
            return Err(err);
        }
        if self.meta.table.is_empty() {
            return Err(QueryError::MissingTableMapping(self.meta.entity.clone()));
        }

        let mut parser = PredicateParser::new(self.meta);
        let predicate = if parse_predicate {
            match combine_filters(&self.filters) {
                Some(expr) => Some(parser.parse(&expr)?),
                None => None,
            }
        } else {
            None
        };

        let mut group_by = Vec::with_capacity(self.group_props.len());
        for prop in &self.group_props {
            group_by.push(resolve(self.meta, prop)?);
        }

        let mut order_by = Vec::with_capacity(self.order.len());
        for (prop, descending) in &self.order {
            order_by.push(SortKey {
                column: resolve(self.meta, prop)?,
                descending: *descending,
            });
        }

        let mut projection = Vec::with_capacity(self.projection.len());
        for entry in &self.projection {
            projection.push(match entry {
                Pending::Column { property, alias } => ProjectionEntry::Column {
                    column: resolve(self.meta, property)?,
                    alias: alias.clone(),
                },
                Pending::Key { property, alias } => ProjectionEntry::Key {
                    column: resolve(self.meta, property)?,
                    alias: alias.clone(),
                },
                Pending::Aggregate {
                    func,
                    property,
                    alias,
                } => ProjectionEntry::Aggregate {
                    func: *func,
                    column: match property {
                        Some(p) => Some(resolve(self.meta, p)?),
                        None => None,
                    },
                    alias: alias.clone(),
                },
            });
        }

        // SET values get their own parameter space (@p_u_<n>).
        let mut updates = Vec::with_capacity(self.sets.len());
        for (i, (prop, scalar)) in self.sets.iter().enumerate() {
            let column = resolve(self.meta, prop)?;
            let operand = match scalar {
                Scalar::Lit(v) => Operand::Const(v.clone()),
                other => Operand::Param {
                    index: i,
                    value: evaluate(other)?,
                },
            };
            updates.push(UpdateSet { column, operand });
        }

        let desc = QueryDescriptor {
            operation: self.operation,
            table: self.meta.table.clone(),
            predicate,
            join: self.join,
            group_by,
            order_by,
            take: self.take,
            skip: self.skip,
            distinct: self.distinct,
            projection,
            exists: self.exists,
            updates,
            row_columns: self
                .meta
                .columns
                .iter()
                .map(|c| c.column.clone())
                .collect(),
            rows: self.rows,
        };
        Ok((desc, self.filters))
    }

    pub fn descriptor(self) -> QueryResult<QueryDescriptor> {
        self.build(true).map(|(desc, _)| desc)
    }

    /// Static path: parse the predicate ahead of emission.
    pub fn compile(self, dialect: Dialect) -> QueryResult<Statement> {
        let (desc, _) = self.build(true)?;
        emit::build_statement(&desc, dialect)
    }

    /// Runtime path: translate the accumulated filters by walking the live
    /// expression trees at call time.
    pub fn compile_runtime(self, dialect: Dialect) -> QueryResult<Statement> {
        let meta = self.meta;
        let (desc, filters) = self.build(false)?;
        let mut translator = RuntimeTranslator::new(meta, dialect);
        for filter in &filters {
            translator.push_filter(filter)?;
        }
        let (where_sql, params) = translator.finish();
        emit::build_statement_with_where(&desc, dialect, Some((where_sql, params)))
    }

    /// Dispatch on the external classifier's verdict: `true` means the shape
    /// was known ahead of time and the static path applies.
    pub fn compile_with(self, dialect: Dialect, static_shape: bool) -> QueryResult<Statement> {
        if static_shape {
            self.compile(dialect)
        } else {
            self.compile_runtime(dialect)
        }
    }
}

/// AND-fold filters in call order.
fn combine_filters(filters: &[FilterExpr]) -> Option<FilterExpr> {
    let mut iter = filters.iter().cloned();
    let first = iter.next()?;
    Some(iter.fold(first, |acc, next| acc.and(next)))
}

fn resolve(meta: &EntityMeta, property: &str) -> QueryResult<String> {
    meta.column_for(property)
        .map(str::to_string)
        .ok_or_else(|| QueryError::unsupported(property))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expr::{bind, col};

    fn users() -> EntityMeta {
        EntityMeta::new("User", "Users")
            .key_column("Id")
            .column("Name")
            .column("Age")
    }

    #[test]
    fn test_descriptor_shapes_in_call_order() {
        let meta = users();
        let desc = Query::select(&meta)
            .filter(col("Age").gt(bind(18)))
            .order_by("Name")
            .order_by_desc("Age")
            .take(10)
            .descriptor()
            .unwrap();
        assert_eq!(desc.operation, Operation::Select);
        assert_eq!(desc.table, "Users");
        assert!(desc.predicate.is_some());
        assert_eq!(
            desc.order_by,
            vec![
                SortKey {
                    column: "Name".to_string(),
                    descending: false
                },
                SortKey {
                    column: "Age".to_string(),
                    descending: true
                },
            ]
        );
        assert_eq!(desc.take, Some(10));
    }

    #[test]
    fn test_multiple_filters_flatten_to_one_and() {
        let meta = users();
        let desc = Query::select(&meta)
            .filter(col("Age").gt(bind(18)))
            .filter(col("Name").is_not_null())
            .filter(col("Age").lt(bind(65)))
            .descriptor()
            .unwrap();
        match desc.predicate.unwrap() {
            PredicateNode::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_table_mapping() {
        let meta = EntityMeta::new("Ghost", "");
        let err = Query::select(&meta).descriptor().unwrap_err();
        assert!(matches!(err, QueryError::MissingTableMapping(e) if e == "Ghost"));
    }

    #[test]
    fn test_join_resolves_both_keys() {
        let users = users();
        let orders = EntityMeta::new("Order", "Orders")
            .key_column("Id")
            .column("UserId");
        let desc = Query::select(&users)
            .inner_join(&orders, "Id", "UserId")
            .descriptor()
            .unwrap();
        assert_eq!(
            desc.join,
            Some(JoinSpec {
                table: "Orders".to_string(),
                outer_key: "Id".to_string(),
                inner_key: "UserId".to_string(),
                kind: JoinKind::Inner,
            })
        );
    }

    #[test]
    fn test_join_with_unmapped_key_fails_at_build() {
        let users = users();
        let orders = EntityMeta::new("Order", "Orders").key_column("Id");
        let err = Query::select(&users)
            .inner_join(&orders, "Id", "Nope")
            .descriptor()
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_update_set_operands() {
        let meta = users();
        let desc = Query::update(&meta)
            .set("Name", crate::expr::lit("fixed"))
            .set("Age", bind(30))
            .descriptor()
            .unwrap();
        assert_eq!(desc.updates.len(), 2);
        assert_eq!(
            desc.updates[0].operand,
            Operand::Const(Value::from("fixed"))
        );
        assert_eq!(
            desc.updates[1].operand,
            Operand::Param {
                index: 1,
                value: Value::Int(30)
            }
        );
    }

    #[test]
    fn test_unmapped_projection_property_fails() {
        let meta = users();
        let err = Query::select(&meta)
            .project(["Nope"])
            .descriptor()
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }
}
