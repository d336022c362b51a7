//! Caller-facing filter expression tree.
//!
//! A `FilterExpr` describes a boolean filter over one row; a `Scalar` is one
//! operand within it. The static path parses this tree into a
//! [`PredicateNode`](crate::predicate::PredicateNode) ahead of emission; the
//! runtime path walks it directly at call time.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// A scalar operand: the row, a member access, a literal or a captured value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    /// The row bound by the enclosing filter.
    Row,
    /// Member access on an evaluated target: a row column when the chain is
    /// rooted at [`Scalar::Row`], a captured-object field otherwise.
    Field { target: Box<Scalar>, name: String },
    /// A compile-time literal, eligible for inlining into the SQL text.
    Lit(Value),
    /// A value captured from the caller's environment, always bound as a
    /// parameter. A [`Value::Record`] here is the root of a field chain.
    Bind(Value),
}

/// Comparison operators of the predicate model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::Ne => "<>",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
        }
    }

    /// Mirror the operator for a column that sat on the right-hand side.
    pub fn flipped(&self) -> CompareOp {
        match self {
            CompareOp::Eq => CompareOp::Eq,
            CompareOp::Ne => CompareOp::Ne,
            CompareOp::Gt => CompareOp::Lt,
            CompareOp::Gte => CompareOp::Lte,
            CompareOp::Lt => CompareOp::Gt,
            CompareOp::Lte => CompareOp::Gte,
        }
    }
}

/// String match kinds that lower to LIKE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchKind {
    Contains,
    StartsWith,
    EndsWith,
}

impl MatchKind {
    /// Wildcard placement: `%v%`, `v%` or `%v`.
    pub fn wildcards(&self) -> (bool, bool) {
        match self {
            MatchKind::Contains => (true, true),
            MatchKind::StartsWith => (false, true),
            MatchKind::EndsWith => (true, false),
        }
    }
}

/// A boolean filter over one row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterExpr {
    Compare {
        op: CompareOp,
        lhs: Scalar,
        rhs: Scalar,
    },
    Match {
        kind: MatchKind,
        target: Scalar,
        pattern: Scalar,
    },
    /// Collection membership: `haystack` contains `needle`.
    InList { haystack: Scalar, needle: Scalar },
    Not(Box<FilterExpr>),
    And(Box<FilterExpr>, Box<FilterExpr>),
    Or(Box<FilterExpr>, Box<FilterExpr>),
}

/// Reference a row column by property name.
pub fn col(name: impl Into<String>) -> Scalar {
    Scalar::Field {
        target: Box::new(Scalar::Row),
        name: name.into(),
    }
}

/// A compile-time literal.
pub fn lit(value: impl Into<Value>) -> Scalar {
    Scalar::Lit(value.into())
}

/// A value captured from the caller's environment.
pub fn bind(value: impl Into<Value>) -> Scalar {
    Scalar::Bind(value.into())
}

impl Scalar {
    /// Member access off this scalar.
    pub fn field(self, name: impl Into<String>) -> Scalar {
        Scalar::Field {
            target: Box::new(self),
            name: name.into(),
        }
    }

    pub fn eq(self, rhs: impl Into<Scalar>) -> FilterExpr {
        self.compare(CompareOp::Eq, rhs)
    }

    pub fn ne(self, rhs: impl Into<Scalar>) -> FilterExpr {
        self.compare(CompareOp::Ne, rhs)
    }

    pub fn gt(self, rhs: impl Into<Scalar>) -> FilterExpr {
        self.compare(CompareOp::Gt, rhs)
    }

    pub fn gte(self, rhs: impl Into<Scalar>) -> FilterExpr {
        self.compare(CompareOp::Gte, rhs)
    }

    pub fn lt(self, rhs: impl Into<Scalar>) -> FilterExpr {
        self.compare(CompareOp::Lt, rhs)
    }

    pub fn lte(self, rhs: impl Into<Scalar>) -> FilterExpr {
        self.compare(CompareOp::Lte, rhs)
    }

    pub fn compare(self, op: CompareOp, rhs: impl Into<Scalar>) -> FilterExpr {
        FilterExpr::Compare {
            op,
            lhs: self,
            rhs: rhs.into(),
        }
    }

    pub fn is_null(self) -> FilterExpr {
        self.eq(Scalar::Lit(Value::Null))
    }

    pub fn is_not_null(self) -> FilterExpr {
        self.ne(Scalar::Lit(Value::Null))
    }

    pub fn contains(self, pattern: impl Into<Scalar>) -> FilterExpr {
        self.matches(MatchKind::Contains, pattern)
    }

    pub fn starts_with(self, pattern: impl Into<Scalar>) -> FilterExpr {
        self.matches(MatchKind::StartsWith, pattern)
    }

    pub fn ends_with(self, pattern: impl Into<Scalar>) -> FilterExpr {
        self.matches(MatchKind::EndsWith, pattern)
    }

    pub fn matches(self, kind: MatchKind, pattern: impl Into<Scalar>) -> FilterExpr {
        FilterExpr::Match {
            kind,
            target: self,
            pattern: pattern.into(),
        }
    }

    /// Membership of this column in a captured collection.
    pub fn in_list(self, haystack: impl Into<Scalar>) -> FilterExpr {
        FilterExpr::InList {
            haystack: haystack.into(),
            needle: self,
        }
    }

    pub fn not_in_list(self, haystack: impl Into<Scalar>) -> FilterExpr {
        self.in_list(haystack).not()
    }
}

impl FilterExpr {
    pub fn and(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: FilterExpr) -> FilterExpr {
        FilterExpr::Or(Box::new(self), Box::new(other))
    }

    pub fn not(self) -> FilterExpr {
        FilterExpr::Not(Box::new(self))
    }
}

impl From<Value> for Scalar {
    fn from(v: Value) -> Self {
        Scalar::Bind(v)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bind(Value::Bool(b))
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::Bind(Value::Int(n as i64))
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Bind(Value::Int(n))
    }
}

impl From<f64> for Scalar {
    fn from(n: f64) -> Self {
        Scalar::Bind(Value::Float(n))
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Bind(Value::String(s.to_string()))
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Bind(Value::String(s))
    }
}

impl std::fmt::Display for Scalar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Scalar::Row => write!(f, "row"),
            Scalar::Field { target, name } => write!(f, "{}.{}", target, name),
            Scalar::Lit(v) => write!(f, "{}", v),
            Scalar::Bind(v) => write!(f, "bind({})", v),
        }
    }
}

impl std::fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterExpr::Compare { op, lhs, rhs } => {
                write!(f, "{} {} {}", lhs, op.sql_symbol(), rhs)
            }
            FilterExpr::Match {
                kind,
                target,
                pattern,
            } => {
                let name = match kind {
                    MatchKind::Contains => "contains",
                    MatchKind::StartsWith => "starts_with",
                    MatchKind::EndsWith => "ends_with",
                };
                write!(f, "{}.{}({})", target, name, pattern)
            }
            FilterExpr::InList { haystack, needle } => {
                write!(f, "{} in {}", needle, haystack)
            }
            FilterExpr::Not(inner) => write!(f, "!({})", inner),
            FilterExpr::And(l, r) => write!(f, "({} && {})", l, r),
            FilterExpr::Or(l, r) => write!(f, "({} || {})", l, r),
        }
    }
}
