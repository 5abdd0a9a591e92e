use serde_json::Value;

use crate::query::filter::{CompareOp, FilterNode};
use crate::query::{QueryParameter, StoreQuery};

/// A typed filter builder that translates into the store's parameterized
/// query dialect.
///
/// # Examples
///
/// ```
/// use docrepo::Criteria;
///
/// let query = Criteria::field("ownerId")
///     .eq("owner-42")
///     .and_field("name")
///     .starts_with("Big")
///     .to_query();
///
/// assert_eq!(
///     query.text(),
///     "SELECT * FROM c WHERE c.ownerId = @p0 AND STARTSWITH(c.name, @p1)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Criteria {
    root: FilterNode,
}

enum Combinator {
    And,
    Or,
}

/// An in-progress clause naming the field to compare; finished by one of
/// the operator methods.
pub struct FieldCriteria {
    parent: Option<(Criteria, Combinator)>,
    path: String,
}

impl Criteria {
    /// Starts a criteria expression on a serialized field path.
    pub fn field(path: impl Into<String>) -> FieldCriteria {
        FieldCriteria {
            parent: None,
            path: path.into(),
        }
    }

    /// Adds an AND clause on another field.
    pub fn and_field(self, path: impl Into<String>) -> FieldCriteria {
        FieldCriteria {
            parent: Some((self, Combinator::And)),
            path: path.into(),
        }
    }

    /// Adds an OR clause on another field.
    pub fn or_field(self, path: impl Into<String>) -> FieldCriteria {
        FieldCriteria {
            parent: Some((self, Combinator::Or)),
            path: path.into(),
        }
    }

    /// Combines two criteria with AND.
    pub fn and(self, other: Criteria) -> Criteria {
        Criteria {
            root: combine(self.root, other.root, Combinator::And),
        }
    }

    /// Combines two criteria with OR.
    pub fn or(self, other: Criteria) -> Criteria {
        Criteria {
            root: combine(self.root, other.root, Combinator::Or),
        }
    }

    /// The structured filter tree.
    pub fn filter(&self) -> &FilterNode {
        &self.root
    }

    /// Renders the criteria as a parameterized store query, carrying the
    /// structured filter for backends that evaluate locally.
    pub fn to_query(&self) -> StoreQuery {
        let mut parameters = Vec::new();
        let clause = render(&self.root, &mut parameters);

        let mut query = StoreQuery::new(format!("SELECT * FROM c WHERE {clause}"));
        query.parameters = parameters;
        query.with_filter(self.root.clone())
    }
}

impl FieldCriteria {
    pub fn eq(self, value: impl Into<Value>) -> Criteria {
        self.compare(CompareOp::Eq, value.into())
    }

    pub fn ne(self, value: impl Into<Value>) -> Criteria {
        self.compare(CompareOp::Ne, value.into())
    }

    pub fn gt(self, value: impl Into<Value>) -> Criteria {
        self.compare(CompareOp::Gt, value.into())
    }

    pub fn gte(self, value: impl Into<Value>) -> Criteria {
        self.compare(CompareOp::Gte, value.into())
    }

    pub fn lt(self, value: impl Into<Value>) -> Criteria {
        self.compare(CompareOp::Lt, value.into())
    }

    pub fn lte(self, value: impl Into<Value>) -> Criteria {
        self.compare(CompareOp::Lte, value.into())
    }

    pub fn starts_with(self, value: impl Into<String>) -> Criteria {
        let node = FilterNode::StartsWith {
            path: self.path.clone(),
            value: value.into(),
        };
        self.finish(node)
    }

    pub fn contains(self, value: impl Into<String>) -> Criteria {
        let node = FilterNode::Contains {
            path: self.path.clone(),
            value: value.into(),
        };
        self.finish(node)
    }

    fn compare(self, op: CompareOp, value: Value) -> Criteria {
        let node = FilterNode::Compare {
            path: self.path.clone(),
            op,
            value,
        };
        self.finish(node)
    }

    fn finish(self, node: FilterNode) -> Criteria {
        match self.parent {
            None => Criteria { root: node },
            Some((criteria, Combinator::And)) => criteria.and(Criteria { root: node }),
            Some((criteria, Combinator::Or)) => criteria.or(Criteria { root: node }),
        }
    }
}

fn combine(lhs: FilterNode, rhs: FilterNode, combinator: Combinator) -> FilterNode {
    match combinator {
        Combinator::And => match lhs {
            FilterNode::And(mut children) => {
                children.push(rhs);
                FilterNode::And(children)
            }
            other => FilterNode::And(vec![other, rhs]),
        },
        Combinator::Or => match lhs {
            FilterNode::Or(mut children) => {
                children.push(rhs);
                FilterNode::Or(children)
            }
            other => FilterNode::Or(vec![other, rhs]),
        },
    }
}

fn render(node: &FilterNode, parameters: &mut Vec<QueryParameter>) -> String {
    match node {
        FilterNode::Compare { path, op, value } => {
            let name = push_parameter(parameters, value.clone());
            format!("c.{path} {} {name}", op.sql())
        }
        FilterNode::StartsWith { path, value } => {
            let name = push_parameter(parameters, Value::from(value.clone()));
            format!("STARTSWITH(c.{path}, {name})")
        }
        FilterNode::Contains { path, value } => {
            let name = push_parameter(parameters, Value::from(value.clone()));
            format!("CONTAINS(c.{path}, {name})")
        }
        FilterNode::And(children) => join(children, " AND ", parameters),
        FilterNode::Or(children) => join(children, " OR ", parameters),
    }
}

fn join(children: &[FilterNode], separator: &str, parameters: &mut Vec<QueryParameter>) -> String {
    children
        .iter()
        .map(|child| {
            let clause = render(child, parameters);
            match child {
                FilterNode::And(_) | FilterNode::Or(_) => format!("({clause})"),
                _ => clause,
            }
        })
        .collect::<Vec<_>>()
        .join(separator)
}

fn push_parameter(parameters: &mut Vec<QueryParameter>, value: Value) -> String {
    let name = format!("@p{}", parameters.len());
    parameters.push(QueryParameter {
        name: name.clone(),
        value,
    });
    name
}
