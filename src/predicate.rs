//! Predicate model: the tagged-union tree a filter expression parses into.
//!
//! The parser normalizes as it goes: And/Or chains are flattened into one
//! N-ary node, comparisons are rewritten so the column is always on the left,
//! null equality becomes IS (NOT) NULL, string matches lower to LIKE, and an
//! OR-disjunction made entirely of string matches collapses into a single
//! [`PredicateNode::LikeGroup`].

use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::expr::{CompareOp, FilterExpr, MatchKind, Scalar};
use crate::extract::{evaluate, is_row_dependent};
use crate::meta::EntityMeta;
use crate::value::Value;

/// A leaf operand: a true compile-time constant inlined into the SQL text,
/// or a captured value registered as a parameter placeholder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Const(Value),
    Param { index: usize, value: Value },
}

/// One LIKE term: column, match kind and pattern operand. The kind keeps the
/// wildcard placement decision with the emitter, where the pattern may need
/// dialect-specific concatenation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LikeTerm {
    pub column: String,
    pub kind: MatchKind,
    pub pattern: Operand,
}

/// The predicate tree. Single root, no cycles; every `column` has already
/// been resolved through entity metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PredicateNode {
    Binary {
        column: String,
        op: CompareOp,
        operand: Operand,
    },
    Like(LikeTerm),
    /// OR-chain of LIKE terms collapsed into one node.
    LikeGroup(Vec<LikeTerm>),
    In {
        column: String,
        index: usize,
        values: Vec<Value>,
    },
    NotIn {
        column: String,
        index: usize,
        values: Vec<Value>,
    },
    IsNull {
        column: String,
    },
    IsNotNull {
        column: String,
    },
    And(Vec<PredicateNode>),
    Or(Vec<PredicateNode>),
}

/// Parses filter expressions into predicate trees, allocating parameter
/// indices in one left-to-right, depth-first traversal. The same indices are
/// consumed in the same order at emission; that alignment is the load-bearing
/// invariant of the compiler.
pub struct PredicateParser<'a> {
    meta: &'a EntityMeta,
    next_param: usize,
}

impl<'a> PredicateParser<'a> {
    pub fn new(meta: &'a EntityMeta) -> Self {
        Self {
            meta,
            next_param: 0,
        }
    }

    /// Parameter indices handed out so far.
    pub fn params_allocated(&self) -> usize {
        self.next_param
    }

    pub fn parse(&mut self, expr: &FilterExpr) -> QueryResult<PredicateNode> {
        match expr {
            FilterExpr::And(l, r) => {
                let mut children = Vec::new();
                for side in [l.as_ref(), r.as_ref()] {
                    match self.parse(side)? {
                        PredicateNode::And(mut inner) => children.append(&mut inner),
                        node => children.push(node),
                    }
                }
                Ok(PredicateNode::And(children))
            }
            FilterExpr::Or(l, r) => {
                // A disjunction made entirely of string matches becomes one
                // LikeGroup node instead of N OR'd LIKEs.
                let mut terms = Vec::new();
                if self.scan_like_terms(expr, &mut terms) {
                    let mut group = Vec::with_capacity(terms.len());
                    for (column, kind, pattern) in terms {
                        group.push(LikeTerm {
                            column,
                            kind,
                            pattern: self.operand(pattern)?,
                        });
                    }
                    return Ok(PredicateNode::LikeGroup(group));
                }
                let mut children = Vec::new();
                for side in [l.as_ref(), r.as_ref()] {
                    match self.parse(side)? {
                        PredicateNode::Or(mut inner) => children.append(&mut inner),
                        node => children.push(node),
                    }
                }
                Ok(PredicateNode::Or(children))
            }
            FilterExpr::Compare { op, lhs, rhs } => self.parse_compare(expr, *op, lhs, rhs),
            FilterExpr::Match {
                kind,
                target,
                pattern,
            } => {
                let column = self.resolve_column(target)?;
                if is_row_dependent(pattern) {
                    return Err(QueryError::unsupported(expr));
                }
                Ok(PredicateNode::Like(LikeTerm {
                    column,
                    kind: *kind,
                    pattern: self.operand(pattern)?,
                }))
            }
            FilterExpr::InList { haystack, needle } => {
                let (column, index, values) = self.parse_in(expr, haystack, needle)?;
                Ok(PredicateNode::In {
                    column,
                    index,
                    values,
                })
            }
            FilterExpr::Not(inner) => match inner.as_ref() {
                FilterExpr::InList { haystack, needle } => {
                    let (column, index, values) = self.parse_in(expr, haystack, needle)?;
                    Ok(PredicateNode::NotIn {
                        column,
                        index,
                        values,
                    })
                }
                _ => Err(QueryError::unsupported(expr)),
            },
        }
    }

    fn parse_compare(
        &mut self,
        expr: &FilterExpr,
        op: CompareOp,
        lhs: &Scalar,
        rhs: &Scalar,
    ) -> QueryResult<PredicateNode> {
        // Exactly one side must refer to the row; a column on the right
        // flips the operator so leaves normalize to `column op value`.
        let (column_side, value_side, op) =
            match (is_row_dependent(lhs), is_row_dependent(rhs)) {
                (true, false) => (lhs, rhs, op),
                (false, true) => (rhs, lhs, op.flipped()),
                _ => return Err(QueryError::unsupported(expr)),
            };
        let column = self.resolve_column(column_side)?;

        // `= null` / `<> null` against a literal null, never `= NULL`.
        if matches!(value_side, Scalar::Lit(Value::Null)) {
            return match op {
                CompareOp::Eq => Ok(PredicateNode::IsNull { column }),
                CompareOp::Ne => Ok(PredicateNode::IsNotNull { column }),
                _ => Err(QueryError::unsupported(expr)),
            };
        }

        Ok(PredicateNode::Binary {
            column,
            op,
            operand: self.operand(value_side)?,
        })
    }

    fn parse_in(
        &mut self,
        expr: &FilterExpr,
        haystack: &Scalar,
        needle: &Scalar,
    ) -> QueryResult<(String, usize, Vec<Value>)> {
        let column = self.resolve_column(needle)?;
        if is_row_dependent(haystack) {
            return Err(QueryError::unsupported(expr));
        }
        let values = match evaluate(haystack)? {
            Value::List(vals) => vals,
            _ => return Err(QueryError::unsupported(expr)),
        };
        let index = self.next_index();
        Ok((column, index, values))
    }

    /// Scan an OR subtree for the LikeGroup shape without allocating
    /// parameters. Returns false as soon as any leaf is not a string match
    /// on a resolvable column.
    fn scan_like_terms<'e>(
        &self,
        expr: &'e FilterExpr,
        out: &mut Vec<(String, MatchKind, &'e Scalar)>,
    ) -> bool {
        match expr {
            FilterExpr::Or(l, r) => self.scan_like_terms(l, out) && self.scan_like_terms(r, out),
            FilterExpr::Match {
                kind,
                target,
                pattern,
            } if !is_row_dependent(pattern) => match self.try_resolve_column(target) {
                Some(column) => {
                    out.push((column, *kind, pattern));
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn operand(&mut self, scalar: &Scalar) -> QueryResult<Operand> {
        match scalar {
            Scalar::Lit(v) => Ok(Operand::Const(v.clone())),
            _ => {
                let value = evaluate(scalar)?;
                Ok(Operand::Param {
                    index: self.next_index(),
                    value,
                })
            }
        }
    }

    fn resolve_column(&self, scalar: &Scalar) -> QueryResult<String> {
        self.try_resolve_column(scalar)
            .ok_or_else(|| QueryError::unsupported(scalar))
    }

    /// Only a single-level property access on the row resolves to a column.
    fn try_resolve_column(&self, scalar: &Scalar) -> Option<String> {
        match scalar {
            Scalar::Field { target, name } if matches!(target.as_ref(), Scalar::Row) => {
                self.meta.column_for(name).map(str::to_string)
            }
            _ => None,
        }
    }

    fn next_index(&mut self) -> usize {
        let index = self.next_param;
        self.next_param += 1;
        index
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::expr::{bind, col, lit};

    fn users() -> EntityMeta {
        EntityMeta::new("User", "Users")
            .key_column("Id")
            .column("Name")
            .column("Age")
    }

    fn parse(expr: FilterExpr) -> PredicateNode {
        PredicateParser::new(&users()).parse(&expr).unwrap()
    }

    #[test]
    fn test_and_flattening_is_shape_independent() {
        let a = || col("Age").gt(1);
        let b = || col("Age").lt(9);
        let c = || col("Name").eq("x");

        let left_nested = parse(a().and(b()).and(c()));
        let right_nested = parse(a().and(b().and(c())));
        assert_eq!(left_nested, right_nested);
        match left_nested {
            PredicateNode::And(children) => assert_eq!(children.len(), 3),
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_or_collapses_to_like_group() {
        let expr = col("Name")
            .contains(bind("a"))
            .or(col("Name").starts_with(bind("b")))
            .or(col("Name").ends_with(bind("c")));
        match parse(expr) {
            PredicateNode::LikeGroup(terms) => {
                assert_eq!(terms.len(), 3);
                assert_eq!(terms[0].kind, MatchKind::Contains);
                assert_eq!(terms[1].kind, MatchKind::StartsWith);
                assert_eq!(terms[2].kind, MatchKind::EndsWith);
                // One parameter per term, in scan order.
                assert_eq!(terms[0].pattern, Operand::Param { index: 0, value: Value::from("a") });
                assert_eq!(terms[2].pattern, Operand::Param { index: 2, value: Value::from("c") });
            }
            other => panic!("expected LikeGroup, got {:?}", other),
        }
    }

    #[test]
    fn test_mixed_or_stays_generic() {
        let expr = col("Name").contains(bind("a")).or(col("Age").gt(18));
        match parse(expr) {
            PredicateNode::Or(children) => assert_eq!(children.len(), 2),
            other => panic!("expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_column_on_right_flips_operator() {
        // 5 < row.Age normalizes to Age > 5
        let node = parse(lit(5).lt(col("Age")));
        assert_eq!(
            node,
            PredicateNode::Binary {
                column: "Age".to_string(),
                op: CompareOp::Gt,
                operand: Operand::Const(Value::Int(5)),
            }
        );
    }

    #[test]
    fn test_null_equality_rewrites() {
        assert_eq!(
            parse(col("Name").is_null()),
            PredicateNode::IsNull {
                column: "Name".to_string()
            }
        );
        assert_eq!(
            parse(col("Name").is_not_null()),
            PredicateNode::IsNotNull {
                column: "Name".to_string()
            }
        );
    }

    #[test]
    fn test_captured_value_becomes_param() {
        let threshold = 18i64;
        let node = parse(col("Age").gt(bind(threshold)));
        assert_eq!(
            node,
            PredicateNode::Binary {
                column: "Age".to_string(),
                op: CompareOp::Gt,
                operand: Operand::Param {
                    index: 0,
                    value: Value::Int(18)
                },
            }
        );
    }

    #[test]
    fn test_literal_stays_const() {
        let node = parse(col("Age").gt(lit(18)));
        assert_eq!(
            node,
            PredicateNode::Binary {
                column: "Age".to_string(),
                op: CompareOp::Gt,
                operand: Operand::Const(Value::Int(18)),
            }
        );
    }

    #[test]
    fn test_in_and_not_in_lowering() {
        let ids = bind(vec![1i64, 2, 3]);
        match parse(col("Id").in_list(ids.clone())) {
            PredicateNode::In { column, index, values } => {
                assert_eq!(column, "Id");
                assert_eq!(index, 0);
                assert_eq!(values.len(), 3);
            }
            other => panic!("expected In, got {:?}", other),
        }
        match parse(col("Id").not_in_list(ids)) {
            PredicateNode::NotIn { values, .. } => assert_eq!(values.len(), 3),
            other => panic!("expected NotIn, got {:?}", other),
        }
    }

    #[test]
    fn test_param_indices_follow_leaf_order() {
        let expr = col("Age")
            .gt(bind(1))
            .and(col("Name").eq(lit("x")))
            .and(col("Age").lt(bind(9)));
        let schema = users();
        let mut parser = PredicateParser::new(&schema);
        let node = parser.parse(&expr).unwrap();
        assert_eq!(parser.params_allocated(), 2);
        match node {
            PredicateNode::And(children) => {
                assert!(matches!(
                    &children[0],
                    PredicateNode::Binary { operand: Operand::Param { index: 0, .. }, .. }
                ));
                assert!(matches!(
                    &children[2],
                    PredicateNode::Binary { operand: Operand::Param { index: 1, .. }, .. }
                ));
            }
            other => panic!("expected And, got {:?}", other),
        }
    }

    #[test]
    fn test_unmapped_property_is_unsupported() {
        let err = PredicateParser::new(&users())
            .parse(&col("Missing").eq(bind(1)))
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_column_to_column_compare_is_unsupported() {
        let err = PredicateParser::new(&users())
            .parse(&col("Age").eq(col("Id")))
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }

    #[test]
    fn test_generic_not_is_unsupported() {
        let err = PredicateParser::new(&users())
            .parse(&col("Age").gt(bind(1)).not())
            .unwrap_err();
        assert!(matches!(err, QueryError::UnsupportedExpression(_)));
    }
}
