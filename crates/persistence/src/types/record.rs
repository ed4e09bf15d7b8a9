//! Resource record types.
//!
//! A [`ResourceRecord`] is written once and never modified. The document that
//! reaches the store carries the record id twice: as `id` and as the store's
//! primary key `_id`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;

/// A tracked resource: who, how to reach them, where, and what kind of transaction.
///
/// # Examples
///
/// ```
/// use mobtrack_persistence::types::ResourceRecord;
///
/// let record: ResourceRecord = serde_json::from_value(serde_json::json!({
///     "id": "abc",
///     "name": "Jo",
///     "contact": "555-1234",
///     "transactionType": "checkin",
///     "createdAt": 1700000000000i64
/// })).unwrap();
///
/// assert_eq!(record.description, "");
/// assert_eq!(record.transaction_type.as_deref(), Some("checkin"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRecord {
    /// Generated identifier, also the document key.
    pub id: String,

    /// Name of the associate.
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,

    /// Free-form comment.
    #[serde(default, deserialize_with = "lenient::string")]
    pub description: String,

    /// Free-form GPS or text location.
    #[serde(default, deserialize_with = "lenient::string")]
    pub location: String,

    /// Contact information.
    #[serde(default, deserialize_with = "lenient::string")]
    pub contact: String,

    /// Identifier of the submitting user.
    #[serde(rename = "userID", default, deserialize_with = "lenient::string")]
    pub user_id: String,

    /// Transaction type, matched exactly by find.
    // Documents written by earlier clients use `trnsctype` / `whenCreated`.
    #[serde(
        alias = "trnsctype",
        default,
        deserialize_with = "lenient::optional_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub transaction_type: Option<String>,

    /// Insertion time in milliseconds since the Unix epoch.
    #[serde(alias = "whenCreated", default, deserialize_with = "lenient::millis")]
    pub created_at: i64,
}

impl ResourceRecord {
    /// Builds the store document for this record, keyed by `_id`.
    pub fn to_document(&self) -> Result<Value, serde_json::Error> {
        let mut document = match serde_json::to_value(self)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        document.insert("_id".to_string(), Value::String(self.id.clone()));
        Ok(Value::Object(document))
    }
}

/// A record as read back from the store, with its revision token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    /// The record fields.
    #[serde(flatten)]
    pub record: ResourceRecord,

    /// Store-assigned revision of this document version.
    #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl StoredRecord {
    /// Decodes a store document.
    ///
    /// The record id falls back to the document key `_id`, and off-schema
    /// field values are rendered as text, so any stored JSON object decodes.
    pub fn from_document(mut document: Value) -> Result<Self, serde_json::Error> {
        if let Value::Object(fields) = &mut document
            && !fields.contains_key("id")
            && let Some(key) = fields.get("_id").cloned()
        {
            fields.insert("id".to_string(), key);
        }
        serde_json::from_value(document)
    }

    /// Returns the record id.
    pub fn id(&self) -> &str {
        &self.record.id
    }

    /// Returns the revision token, if the store reported one.
    pub fn revision(&self) -> Option<&str> {
        self.revision.as_deref()
    }
}

/// Input for creating a record.
///
/// Identity and creation time are never part of the input; the record store
/// assigns both.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewResource {
    /// Name of the associate (required).
    pub name: String,
    /// Free-form comment.
    pub description: String,
    /// Free-form location.
    pub location: String,
    /// Contact information (required).
    pub contact: String,
    /// Submitting user.
    pub user_id: String,
    /// Transaction type.
    pub transaction_type: Option<String>,
}

impl NewResource {
    /// Creates input with the two required fields set.
    pub fn new(name: impl Into<String>, contact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contact: contact.into(),
            ..Default::default()
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Sets the location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// Sets the user id.
    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    /// Sets the transaction type.
    pub fn with_transaction_type(mut self, transaction_type: impl Into<String>) -> Self {
        self.transaction_type = Some(transaction_type.into());
        self
    }

    /// Checks that the required fields are present.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "name".to_string(),
                message: "Name of associate must be provided".to_string(),
            });
        }
        if self.contact.is_empty() {
            return Err(ValidationError::MissingRequiredField {
                field: "contact".to_string(),
                message: "A method of contact must be provided".to_string(),
            });
        }
        Ok(())
    }

    /// Turns the input into a record with the given identity and timestamp.
    pub fn into_record(self, id: String, created_at: i64) -> ResourceRecord {
        ResourceRecord {
            id,
            name: self.name,
            description: self.description,
            location: self.location,
            contact: self.contact,
            user_id: self.user_id,
            transaction_type: self.transaction_type,
            created_at,
        }
    }
}

/// Identity of a freshly inserted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedResource {
    /// The generated record id.
    pub created_id: String,
    /// The store-assigned revision token.
    pub created_revision: String,
}

/// Store-level metadata for the record collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    /// Collection name as reported by the store.
    pub name: String,
    /// Number of live documents, when reported.
    pub document_count: Option<u64>,
    /// The raw metadata document.
    pub raw: Value,
}

/// Field decoders that accept whatever earlier clients stored.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn text(value: Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s),
            other => Some(other.to_string()),
        }
    }

    pub(super) fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(text(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub(super) fn optional_string<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        Ok(text(Value::deserialize(deserializer)?))
    }

    pub(super) fn millis<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or_default(),
            Value::String(s) => s.trim().parse().unwrap_or_default(),
            _ => 0,
        })
    }
}
