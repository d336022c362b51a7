//! Dialect selection and the per-dialect SQL generation rules.
//!
//! Both translation paths (the static emitter and the runtime fallback) go
//! through [`SqlDialect`], so the quoting/paging/concatenation matrix has one
//! authoritative implementation.

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};

mod mysql;
mod postgres;
mod sqlite;
mod sqlserver;

pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use sqlserver::SqlServerDialect;

/// The four supported target dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dialect {
    SqlServer,
    MySql,
    Postgres,
    Sqlite,
}

impl Dialect {
    pub const ALL: [Dialect; 4] = [
        Dialect::SqlServer,
        Dialect::MySql,
        Dialect::Postgres,
        Dialect::Sqlite,
    ];

    /// Resolve a selector name. Unknown names are a fatal error, never a
    /// silent default.
    pub fn from_name(name: &str) -> QueryResult<Dialect> {
        match name.to_ascii_lowercase().as_str() {
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "mysql" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(QueryError::DialectNotSupported(name.to_string())),
        }
    }

    pub fn generator(&self) -> Box<dyn SqlDialect> {
        match self {
            Dialect::SqlServer => Box::new(SqlServerDialect),
            Dialect::MySql => Box::new(MySqlDialect),
            Dialect::Postgres => Box::new(PostgresDialect),
            Dialect::Sqlite => Box::new(SqliteDialect),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dialect::SqlServer => write!(f, "sqlserver"),
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Dialect-specific SQL generation rules.
pub trait SqlDialect {
    /// Quote a table or column identifier.
    fn quote_identifier(&self, name: &str) -> String;

    /// String concatenation expression for LIKE pattern assembly with a
    /// non-constant fragment.
    fn string_concat(&self, parts: &[&str]) -> String;

    /// Boolean literal (`1`/`0` vs `TRUE`/`FALSE`).
    fn bool_literal(&self, val: bool) -> String;

    /// Row-limit fragment placed directly after `SELECT [DISTINCT]`.
    /// Only the bracket dialect uses this (`TOP n`); everyone else pages
    /// with a trailing clause.
    fn top_clause(&self, _take: Option<u64>, _skip: Option<u64>) -> Option<String> {
        None
    }

    /// Paging suffix appended after ORDER BY. `skip` of zero has already
    /// been normalized away by the emitter.
    fn paging(&self, take: Option<u64>, skip: Option<u64>) -> String;
}
