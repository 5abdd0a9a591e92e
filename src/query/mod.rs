pub mod criteria;
pub mod filter;

pub use criteria::{Criteria, FieldCriteria};
pub use filter::{CompareOp, FilterNode};

use serde_json::Value;

/// A named query parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParameter {
    pub name: String,
    pub value: Value,
}

/// A raw parameterized query, passed through to the store unmodified.
///
/// # Examples
///
/// ```
/// use docrepo::StoreQuery;
///
/// let query = StoreQuery::new("SELECT * FROM c WHERE c.ownerId = @owner")
///     .with_param("@owner", "owner-42");
///
/// assert_eq!(query.parameters().len(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    text: String,
    parameters: Vec<QueryParameter>,
    filter: Option<FilterNode>,
}

impl StoreQuery {
    /// Creates a query from its text form.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            parameters: Vec::new(),
            filter: None,
        }
    }

    /// Adds a parameter. Names include the `@` prefix, matching their
    /// appearance in the query text.
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push(QueryParameter {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn parameters(&self) -> &[QueryParameter] {
        &self.parameters
    }

    /// Looks up a parameter value by name.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|parameter| parameter.name == name)
            .map(|parameter| &parameter.value)
    }

    /// The structured filter, present when the query was built from
    /// [`Criteria`].
    pub fn filter(&self) -> Option<&FilterNode> {
        self.filter.as_ref()
    }

    pub(crate) fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Options applied to one page of query execution.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    /// Maximum number of items the store should return in one page.
    pub max_item_count: Option<i32>,
    /// Continuation token from the previous page.
    pub continuation: Option<String>,
}
