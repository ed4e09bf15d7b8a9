//! Find filters and the store-level selector.
//!
//! A [`FindFilter`] is what callers ask for. A [`Selector`] is the normalized
//! form handed to a document store: empty filter values are dropped, and the
//! name filter is rendered as a case-insensitive, unanchored regular expression
//! over the literal (escaped) input.

use serde_json::{Map, Value, json};

/// Optional filters for finding records.
///
/// Both filters are optional and combine with logical AND. An empty filter
/// matches every record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindFilter {
    /// Case-insensitive substring of the record name.
    pub partial_name: Option<String>,
    /// Exact transaction type.
    pub transaction_type: Option<String>,
}

impl FindFilter {
    /// Creates a filter matching everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts to names containing `partial_name` (case-insensitive).
    pub fn with_partial_name(mut self, partial_name: impl Into<String>) -> Self {
        self.partial_name = Some(partial_name.into());
        self
    }

    /// Restricts to records with exactly this transaction type.
    pub fn with_transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }
}

/// A normalized query against the record collection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    name_contains: Option<String>,
    transaction_type: Option<String>,
}

impl Selector {
    /// Returns the name substring constraint.
    pub fn name_contains(&self) -> Option<&str> {
        self.name_contains.as_deref()
    }

    /// Returns the exact transaction type constraint.
    pub fn transaction_type(&self) -> Option<&str> {
        self.transaction_type.as_deref()
    }

    /// Returns true if the selector imposes no constraint.
    pub fn is_empty(&self) -> bool {
        self.name_contains.is_none() && self.transaction_type.is_none()
    }

    /// Renders the selector as a Mango (CouchDB query) selector document.
    ///
    /// ```
    /// use mobtrack_persistence::types::{FindFilter, Selector};
    ///
    /// let selector = Selector::from(&FindFilter::new().with_partial_name("ann"));
    /// assert_eq!(
    ///     selector.to_mango(),
    ///     serde_json::json!({"name": {"$regex": "(?i).*ann.*"}})
    /// );
    /// ```
    pub fn to_mango(&self) -> Value {
        let mut selector = Map::new();
        if let Some(name) = &self.name_contains {
            selector.insert(
                "name".to_string(),
                json!({ "$regex": format!("(?i).*{}.*", regex::escape(name)) }),
            );
        }
        if let Some(transaction_type) = &self.transaction_type {
            // Documents written by earlier clients carry the type as `trnsctype`.
            selector.insert(
                "$or".to_string(),
                json!([
                    { "transactionType": transaction_type },
                    { "trnsctype": transaction_type },
                ]),
            );
        }
        Value::Object(selector)
    }
}

impl From<&FindFilter> for Selector {
    fn from(filter: &FindFilter) -> Self {
        let non_empty = |value: &Option<String>| value.clone().filter(|v| !v.is_empty());
        Self {
            name_contains: non_empty(&filter.partial_name),
            transaction_type: non_empty(&filter.transaction_type),
        }
    }
}
