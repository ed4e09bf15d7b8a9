//! Record identifier generation.

use uuid::Uuid;

/// Generates a new record identifier.
///
/// Identifiers are random version 4 UUIDs in hyphenated form, so they are
/// printable and usable directly as the store's document key.
pub fn generate_id() -> String {
    Uuid::new_v4().to_string()
}
