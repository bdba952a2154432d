//! Identifier helpers.
//!
//! Destination folders created with unique naming get a collision-resistant
//! suffix. The id is a v4 UUID rendered in its compact form so it stays
//! filesystem- and URL-safe.

use uuid::Uuid;

/// Generate a new unique, lowercase alphanumeric identifier.
#[must_use]
pub fn unique_id() -> String {
    Uuid::new_v4().simple().to_string()
}
