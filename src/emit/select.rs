//! SELECT SQL generation.

use crate::dialect::{Dialect, SqlDialect};
use crate::error::{QueryError, QueryResult};
use crate::query::{AggregateFunc, ProjectionEntry, QueryDescriptor};

use super::{ParamSink, Statement, WhereOverride, where_fragment};

pub(crate) fn build_select(
    desc: &QueryDescriptor,
    dialect: Dialect,
    where_override: WhereOverride,
) -> QueryResult<Statement> {
    let generator = dialect.generator();
    let mut sink = ParamSink::new();

    // Skip of zero pages the same as no skip at all.
    let take = desc.take;
    let skip = desc.skip.filter(|s| *s > 0);

    let where_sql = where_fragment(desc, generator.as_ref(), &mut sink, where_override)?;

    if desc.exists.is_some() {
        let mut inner = format!("SELECT 1 FROM {}", generator.quote_identifier(&desc.table));
        inner.push_str(&join_sql(desc, generator.as_ref()));
        if let Some(w) = &where_sql {
            inner.push_str(" WHERE ");
            inner.push_str(w);
        }
        return Ok(Statement {
            sql: format!("SELECT CASE WHEN EXISTS ({}) THEN 1 ELSE 0 END", inner),
            params: sink.into_params(),
        });
    }

    let mut sql = String::from("SELECT ");
    if desc.distinct {
        sql.push_str("DISTINCT ");
    }
    if let Some(top) = generator.top_clause(take, skip) {
        sql.push_str(&top);
        sql.push(' ');
    }
    sql.push_str(&select_list(desc, generator.as_ref())?);

    sql.push_str(" FROM ");
    sql.push_str(&generator.quote_identifier(&desc.table));
    sql.push_str(&join_sql(desc, generator.as_ref()));

    if let Some(w) = &where_sql {
        sql.push_str(" WHERE ");
        sql.push_str(w);
    }

    if !desc.group_by.is_empty() {
        sql.push_str(" GROUP BY ");
        let keys: Vec<String> = desc
            .group_by
            .iter()
            .map(|k| generator.quote_identifier(k))
            .collect();
        sql.push_str(&keys.join(", "));
    }

    if !desc.order_by.is_empty() {
        sql.push_str(" ORDER BY ");
        let keys: Vec<String> = desc
            .order_by
            .iter()
            .map(|key| {
                let col = generator.quote_identifier(&key.column);
                if key.descending {
                    format!("{} DESC", col)
                } else {
                    col
                }
            })
            .collect();
        sql.push_str(&keys.join(", "));
    }

    sql.push_str(&generator.paging(take, skip));

    Ok(Statement {
        sql,
        params: sink.into_params(),
    })
}

fn select_list(desc: &QueryDescriptor, generator: &dyn SqlDialect) -> QueryResult<String> {
    if desc.projection.is_empty() {
        return Ok("*".to_string());
    }
    let mut parts = Vec::with_capacity(desc.projection.len());
    for entry in &desc.projection {
        let (expr, alias) = match entry {
            ProjectionEntry::Column { column, alias } | ProjectionEntry::Key { column, alias } => {
                (generator.quote_identifier(column), alias)
            }
            ProjectionEntry::Aggregate {
                func,
                column,
                alias,
            } => {
                let expr = match (func, column) {
                    (AggregateFunc::Count, _) => "COUNT(*)".to_string(),
                    (_, Some(col)) => format!("{}({})", func, generator.quote_identifier(col)),
                    (_, None) => {
                        return Err(QueryError::unsupported(format!(
                            "{} requires a column",
                            func
                        )));
                    }
                };
                (expr, alias)
            }
        };
        match alias {
            Some(a) => parts.push(format!("{} AS {}", expr, generator.quote_identifier(a))),
            None => parts.push(expr),
        }
    }
    Ok(parts.join(", "))
}

fn join_sql(desc: &QueryDescriptor, generator: &dyn SqlDialect) -> String {
    match &desc.join {
        Some(join) => {
            let inner = generator.quote_identifier(&join.table);
            format!(
                " {} JOIN {} ON {}.{} = {}.{}",
                join.kind.sql_keyword(),
                inner,
                generator.quote_identifier(&desc.table),
                generator.quote_identifier(&join.outer_key),
                inner,
                generator.quote_identifier(&join.inner_key)
            )
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::dialect::Dialect;
    use crate::expr::{bind, col};
    use crate::meta::EntityMeta;
    use crate::query::{AggregateFunc, JoinKind, Query};
    use crate::value::Value;

    fn users() -> EntityMeta {
        EntityMeta::new("User", "Users")
            .key_column("Id")
            .column("Name")
            .column("Age")
    }

    #[test]
    fn test_select_star_all_dialects() {
        for (dialect, expected) in [
            (Dialect::SqlServer, "SELECT * FROM [Users]"),
            (Dialect::MySql, "SELECT * FROM `Users`"),
            (Dialect::Postgres, "SELECT * FROM \"users\""),
            (Dialect::Sqlite, "SELECT * FROM \"Users\""),
        ] {
            let meta = users();
            let stmt = Query::select(&meta).compile(dialect).unwrap();
            assert_eq!(stmt.sql, expected);
            assert!(stmt.params.is_empty());
        }
    }

    #[test]
    fn test_end_to_end_scenario_all_dialects() {
        // Where(Age > 18).OrderBy(Name).Take(10)
        for (dialect, expected) in [
            (
                Dialect::SqlServer,
                "SELECT TOP 10 * FROM [Users] WHERE [Age] > @p0 ORDER BY [Name]",
            ),
            (
                Dialect::MySql,
                "SELECT * FROM `Users` WHERE `Age` > @p0 ORDER BY `Name` LIMIT 10",
            ),
            (
                Dialect::Postgres,
                "SELECT * FROM \"users\" WHERE \"age\" > @p0 ORDER BY \"name\" LIMIT 10",
            ),
            (
                Dialect::Sqlite,
                "SELECT * FROM \"Users\" WHERE \"Age\" > @p0 ORDER BY \"Name\" LIMIT 10",
            ),
        ] {
            let meta = users();
            let stmt = Query::select(&meta)
                .filter(col("Age").gt(bind(18)))
                .order_by("Name")
                .take(10)
                .compile(dialect)
                .unwrap();
            assert_eq!(stmt.sql, expected);
            assert_eq!(stmt.params, vec![("@p0".to_string(), Value::Int(18))]);
        }
    }

    #[test]
    fn test_paging_matrix_take_with_zero_skip() {
        for (dialect, suffix) in [
            (Dialect::SqlServer, "SELECT TOP 3 * FROM [Users]"),
            (Dialect::MySql, "SELECT * FROM `Users` LIMIT 3"),
            (Dialect::Postgres, "SELECT * FROM \"users\" LIMIT 3"),
            (Dialect::Sqlite, "SELECT * FROM \"Users\" LIMIT 3"),
        ] {
            let meta = users();
            let stmt = Query::select(&meta)
                .take(3)
                .skip(0)
                .compile(dialect)
                .unwrap();
            assert_eq!(stmt.sql, suffix);
        }
    }

    #[test]
    fn test_paging_matrix_take_and_skip() {
        for (dialect, expected) in [
            (
                Dialect::SqlServer,
                "SELECT * FROM [Users] OFFSET 5 ROWS FETCH NEXT 3 ROWS ONLY",
            ),
            (Dialect::MySql, "SELECT * FROM `Users` LIMIT 3 OFFSET 5"),
            (Dialect::Postgres, "SELECT * FROM \"users\" LIMIT 3 OFFSET 5"),
            (Dialect::Sqlite, "SELECT * FROM \"Users\" LIMIT 3 OFFSET 5"),
        ] {
            let meta = users();
            let stmt = Query::select(&meta)
                .take(3)
                .skip(5)
                .compile(dialect)
                .unwrap();
            assert_eq!(stmt.sql, expected);
        }
    }

    #[test]
    fn test_paging_matrix_skip_only() {
        for (dialect, expected) in [
            (Dialect::SqlServer, "SELECT * FROM [Users] OFFSET 5 ROWS"),
            (Dialect::MySql, "SELECT * FROM `Users` OFFSET 5"),
            (Dialect::Postgres, "SELECT * FROM \"users\" OFFSET 5"),
            (Dialect::Sqlite, "SELECT * FROM \"Users\" LIMIT -1 OFFSET 5"),
        ] {
            let meta = users();
            let stmt = Query::select(&meta).skip(5).compile(dialect).unwrap();
            assert_eq!(stmt.sql, expected);
        }
    }

    #[test]
    fn test_distinct_projection() {
        let meta = users();
        let stmt = Query::select(&meta)
            .distinct()
            .project(["Name"])
            .compile(Dialect::Sqlite)
            .unwrap();
        assert_eq!(stmt.sql, "SELECT DISTINCT \"Name\" FROM \"Users\"");
    }

    #[test]
    fn test_join_clause() {
        let meta = users();
        let orders = EntityMeta::new("Order", "Orders")
            .key_column("Id")
            .column("UserId")
            .column("Total");
        let stmt = Query::select(&meta)
            .join(&orders, "Id", "UserId", JoinKind::Left)
            .compile(Dialect::SqlServer)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT * FROM [Users] LEFT JOIN [Orders] ON [Users].[Id] = [Orders].[UserId]"
        );
    }

    #[test]
    fn test_group_by_with_aggregates() {
        let meta = users();
        let stmt = Query::select(&meta)
            .project_key("Age")
            .count("Total")
            .aggregate(AggregateFunc::Max, "Id", "Newest")
            .group_by(["Age"])
            .compile(Dialect::MySql)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT `Age`, COUNT(*) AS `Total`, MAX(`Id`) AS `Newest` FROM `Users` GROUP BY `Age`"
        );
    }

    #[test]
    fn test_exists_shape() {
        let meta = users();
        let stmt = Query::select(&meta)
            .filter(col("Age").gt(bind(18)))
            .exists()
            .compile(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT CASE WHEN EXISTS (SELECT 1 FROM \"Users\" WHERE \"Age\" > @p0) THEN 1 ELSE 0 END"
        );
        assert_eq!(stmt.params.len(), 1);
    }

    #[test]
    fn test_not_exists_negates_filter_not_exists() {
        let meta = users();
        let stmt = Query::select(&meta)
            .filter(col("Age").gt(bind(18)))
            .not_exists()
            .compile(Dialect::Sqlite)
            .unwrap();
        assert_eq!(
            stmt.sql,
            "SELECT CASE WHEN EXISTS (SELECT 1 FROM \"Users\" WHERE NOT (\"Age\" > @p0)) THEN 1 ELSE 0 END"
        );
    }

    #[test]
    fn test_parameter_count_matches_leaves() {
        let meta = users();
        let stmt = Query::select(&meta)
            .filter(col("Age").gt(bind(18)))
            .filter(col("Name").starts_with(bind("A")))
            .filter(col("Id").in_list(bind(vec![1i64, 2])))
            .compile(Dialect::Postgres)
            .unwrap();
        // Two indexed leaves plus a two-element IN group.
        let names: Vec<&str> = stmt.params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["@p0", "@p1", "@p_in_2_0", "@p_in_2_1"]);
        for (name, _) in &stmt.params {
            assert_eq!(stmt.sql.matches(name.as_str()).count(), 1);
        }
    }
}
