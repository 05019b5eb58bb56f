//! # Identities
//!
//! Participants of an instance. An identity has a permanent random id, a
//! unique renameable username, and any number of aliases (addresses of
//! accounts on other platforms that belong to the same participant).

use crate::{GrainError, IdentityId, primitives};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: IdentityId,
    pub name: String,
    pub aliases: Vec<String>,
}

impl Identity {
    /// Create an identity with a fresh random id.
    pub fn create(name: &str) -> Result<Self, GrainError> {
        Self::with_id(IdentityId::random(), name)
    }

    /// Create an identity with a caller-supplied id.
    pub fn with_id(id: IdentityId, name: &str) -> Result<Self, GrainError> {
        Ok(Self {
            id,
            name: username_from_str(name)?,
            aliases: Vec::new(),
        })
    }
}

/// Validate a username with GitHub-esque rules.
///
/// A single leading `@` is dropped; the rest must be non-empty ASCII
/// alphanumerics, `-` or `_`.
pub fn username_from_str(raw: &str) -> Result<String, GrainError> {
    let name = raw.strip_prefix('@').unwrap_or(raw);
    let valid = !name.is_empty()
        && name.len() <= primitives::MAX_NAME_LENGTH
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(name.to_string())
    } else {
        Err(GrainError::InvalidName(raw.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames() {
        assert_eq!(username_from_str("@alice").expect("valid"), "alice");
        assert_eq!(username_from_str("bob_the-2nd").expect("valid"), "bob_the-2nd");
        for bad in ["", "@", "@@x", "has space", "ünïcode", "a.b"] {
            assert!(
                matches!(username_from_str(bad), Err(GrainError::InvalidName(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn create_assigns_distinct_ids() {
        let a = Identity::create("a").expect("valid");
        let b = Identity::create("a").expect("valid");
        assert_ne!(a.id, b.id);
        assert!(a.aliases.is_empty());
    }
}
