//! Typed query-to-SQL compiler.
//!
//! Describe a query or mutation with a fluent, typed builder and compile it
//! into parameterized SQL text plus an ordered parameter list, correct across
//! four dialects. Execution stays with the caller.
//!
//! ```ignore
//! use quarry::prelude::*;
//! let meta = EntityMeta::new("User", "Users").key_column("Id").column("Age");
//! let stmt = Query::select(&meta)
//!     .filter(col("Age").gt(bind(18)))
//!     .take(10)
//!     .compile(Dialect::Postgres)?;
//! ```

pub mod dialect;
pub mod emit;
pub mod error;
pub mod expr;
pub mod extract;
pub mod meta;
pub mod predicate;
pub mod query;
pub mod runtime;
pub mod value;

pub use query::Query;

pub mod prelude {
    pub use crate::Query;
    pub use crate::dialect::Dialect;
    pub use crate::emit::{Statement, delete_by_key, update_by_key};
    pub use crate::error::{QueryError, QueryResult};
    pub use crate::expr::{CompareOp, FilterExpr, MatchKind, Scalar, bind, col, lit};
    pub use crate::meta::{ColumnMeta, EntityMeta};
    pub use crate::query::{AggregateFunc, ExistsKind, JoinKind, Operation, QueryDescriptor};
    pub use crate::value::Value;
}
