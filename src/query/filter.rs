use serde_json::Value;

/// Comparison operators supported by criteria filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl CompareOp {
    pub(crate) fn sql(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        }
    }
}

/// A structured filter tree over serialized documents.
///
/// Criteria queries carry their tree alongside the rendered SQL so backends
/// that hold documents locally can evaluate without parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Compare {
        path: String,
        op: CompareOp,
        value: Value,
    },
    StartsWith {
        path: String,
        value: String,
    },
    Contains {
        path: String,
        value: String,
    },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    /// Evaluates the filter against a serialized document.
    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Self::Compare { path, op, value } => match lookup(document, path) {
                Some(field) => compare(field, *op, value),
                None => false,
            },
            Self::StartsWith { path, value } => lookup(document, path)
                .and_then(Value::as_str)
                .is_some_and(|field| field.starts_with(value)),
            Self::Contains { path, value } => lookup(document, path)
                .and_then(Value::as_str)
                .is_some_and(|field| field.contains(value)),
            Self::And(children) => children.iter().all(|child| child.matches(document)),
            Self::Or(children) => children.iter().any(|child| child.matches(document)),
        }
    }
}

/// Walks a dotted field path into a document.
fn lookup<'a>(document: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(document, |value, segment| value.get(segment))
}

fn compare(lhs: &Value, op: CompareOp, rhs: &Value) -> bool {
    match op {
        CompareOp::Eq => json_eq(lhs, rhs),
        CompareOp::Ne => !json_eq(lhs, rhs),
        CompareOp::Gt => json_ordering(lhs, rhs).is_some_and(std::cmp::Ordering::is_gt),
        CompareOp::Gte => json_ordering(lhs, rhs).is_some_and(std::cmp::Ordering::is_ge),
        CompareOp::Lt => json_ordering(lhs, rhs).is_some_and(std::cmp::Ordering::is_lt),
        CompareOp::Lte => json_ordering(lhs, rhs).is_some_and(std::cmp::Ordering::is_le),
    }
}

// Numbers compare numerically regardless of integer/float representation.
fn json_eq(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

fn json_ordering(lhs: &Value, rhs: &Value) -> Option<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (lhs.as_f64(), rhs.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (lhs.as_str(), rhs.as_str()) {
        return Some(a.cmp(b));
    }
    None
}
