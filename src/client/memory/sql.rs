//! Translates the supported raw-query subset into [`FilterNode`] trees.
//!
//! The memory backend accepts `SELECT ... FROM <alias> [WHERE <clause>]`
//! where the clause is built from comparisons on document paths, `AND`,
//! `OR`, literals, and `@name` parameters. The MS SQL dialect is used so
//! `@name` tokenizes as an identifier.

use serde_json::Value;
use sqlparser::ast::{BinaryOperator, Expr, SetExpr, Statement, UnaryOperator, Value as SqlValue};
use sqlparser::dialect::MsSqlDialect;
use sqlparser::parser::Parser;

use crate::core::{RepositoryError, Result};
use crate::query::{CompareOp, FilterNode, StoreQuery};

/// Parses a raw query's filter. `Ok(None)` means the query has no WHERE
/// clause and matches every document.
pub(super) fn filter_from_query(query: &StoreQuery) -> Result<Option<FilterNode>> {
    let statements = Parser::parse_sql(&MsSqlDialect {}, query.text())
        .map_err(|err| RepositoryError::Query(err.to_string()))?;

    let statement = match statements.as_slice() {
        [statement] => statement,
        _ => {
            return Err(RepositoryError::Query(
                "expected exactly one SELECT statement".to_string(),
            ));
        }
    };

    let Statement::Query(boxed) = statement else {
        return Err(RepositoryError::Query(
            "only SELECT queries are supported".to_string(),
        ));
    };

    let SetExpr::Select(select) = boxed.body.as_ref() else {
        return Err(RepositoryError::Query(
            "only plain SELECT queries are supported".to_string(),
        ));
    };

    match &select.selection {
        None => Ok(None),
        Some(expr) => filter_from_expr(expr, query).map(Some),
    }
}

fn filter_from_expr(expr: &Expr, query: &StoreQuery) -> Result<FilterNode> {
    match expr {
        Expr::Nested(inner) => filter_from_expr(inner, query),
        Expr::BinaryOp { left, op, right } => match op {
            BinaryOperator::And => Ok(FilterNode::And(vec![
                filter_from_expr(left, query)?,
                filter_from_expr(right, query)?,
            ])),
            BinaryOperator::Or => Ok(FilterNode::Or(vec![
                filter_from_expr(left, query)?,
                filter_from_expr(right, query)?,
            ])),
            BinaryOperator::Eq
            | BinaryOperator::NotEq
            | BinaryOperator::Gt
            | BinaryOperator::GtEq
            | BinaryOperator::Lt
            | BinaryOperator::LtEq => Ok(FilterNode::Compare {
                path: field_path(left)?,
                op: compare_op(op),
                value: scalar(right, query)?,
            }),
            other => Err(RepositoryError::Query(format!(
                "unsupported operator: {other}"
            ))),
        },
        other => Err(RepositoryError::Query(format!(
            "unsupported expression: {other}"
        ))),
    }
}

fn compare_op(op: &BinaryOperator) -> CompareOp {
    match op {
        BinaryOperator::Eq => CompareOp::Eq,
        BinaryOperator::NotEq => CompareOp::Ne,
        BinaryOperator::Gt => CompareOp::Gt,
        BinaryOperator::GtEq => CompareOp::Gte,
        BinaryOperator::Lt => CompareOp::Lt,
        _ => CompareOp::Lte,
    }
}

/// A document path with the leading container alias stripped.
fn field_path(expr: &Expr) -> Result<String> {
    match expr {
        Expr::Identifier(ident) => Ok(ident.value.clone()),
        Expr::CompoundIdentifier(parts) if parts.len() > 1 => Ok(parts[1..]
            .iter()
            .map(|part| part.value.clone())
            .collect::<Vec<_>>()
            .join(".")),
        Expr::CompoundIdentifier(parts) => Ok(parts
            .iter()
            .map(|part| part.value.clone())
            .collect::<Vec<_>>()
            .join(".")),
        other => Err(RepositoryError::Query(format!(
            "expected a document path, found: {other}"
        ))),
    }
}

fn scalar(expr: &Expr, query: &StoreQuery) -> Result<Value> {
    match expr {
        Expr::Identifier(ident) if ident.value.starts_with('@') => parameter(&ident.value, query),
        Expr::Value(value) => literal(&value.value, query),
        Expr::UnaryOp {
            op: UnaryOperator::Minus,
            expr,
        } => match scalar(expr, query)? {
            Value::Number(number) => {
                if let Some(int) = number.as_i64() {
                    Ok(Value::from(-int))
                } else if let Some(float) = number.as_f64() {
                    Ok(Value::from(-float))
                } else {
                    Err(RepositoryError::Query("invalid numeric literal".to_string()))
                }
            }
            _ => Err(RepositoryError::Query(
                "negation requires a numeric literal".to_string(),
            )),
        },
        other => Err(RepositoryError::Query(format!(
            "expected a literal or parameter, found: {other}"
        ))),
    }
}

fn literal(value: &SqlValue, query: &StoreQuery) -> Result<Value> {
    match value {
        SqlValue::SingleQuotedString(text) | SqlValue::DoubleQuotedString(text) => {
            Ok(Value::from(text.clone()))
        }
        SqlValue::Number(text, _) => {
            if let Ok(int) = text.parse::<i64>() {
                Ok(Value::from(int))
            } else {
                text.parse::<f64>()
                    .map(Value::from)
                    .map_err(|_| RepositoryError::Query(format!("invalid number: {text}")))
            }
        }
        SqlValue::Boolean(flag) => Ok(Value::from(*flag)),
        SqlValue::Null => Ok(Value::Null),
        SqlValue::Placeholder(name) => parameter(name, query),
        other => Err(RepositoryError::Query(format!(
            "unsupported literal: {other}"
        ))),
    }
}

fn parameter(name: &str, query: &StoreQuery) -> Result<Value> {
    query
        .parameter(name)
        .cloned()
        .ok_or_else(|| RepositoryError::Query(format!("unknown query parameter '{name}'")))
}
