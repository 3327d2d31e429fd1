//! Job identifier generation.

/// Generate a random job identifier (UUID v4, hyphenated).
#[must_use]
pub fn random_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
