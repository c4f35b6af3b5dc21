//! Input Validation
//!
//! Name and id rules applied before any storage access. Every message is safe
//! to show to an API caller.

use crate::models::NodeId;
use thiserror::Error;

/// Maximum length of tree and node names, in characters
pub const MAX_NAME_LENGTH: usize = 200;

/// Validation errors for tree and node inputs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("'{field}' must not be empty")]
    EmptyName { field: &'static str },

    #[error("'{field}' must be {max} characters or fewer")]
    NameTooLong { field: &'static str, max: usize },

    #[error("'{field}' must not contain NUL characters")]
    ContainsNul { field: &'static str },

    #[error("'{field}' must be greater than 0")]
    InvalidId { field: &'static str },
}

/// Validate a tree or node name
///
/// Names must contain at least one non-whitespace character, must not contain
/// NUL, and be at most [`MAX_NAME_LENGTH`] characters long. The name itself is
/// stored verbatim.
///
/// SQLite keeps the full text of a NUL-bearing value but reads it back
/// truncated at the NUL, so such names could alias an existing sibling.
///
/// ```rust
/// use treenodes_core::models::validation::validate_name;
///
/// assert!(validate_name("treeName", "T1").is_ok());
/// assert!(validate_name("treeName", "   ").is_err());
/// ```
pub fn validate_name(field: &'static str, name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::EmptyName { field });
    }
    if name.contains('\0') {
        return Err(ValidationError::ContainsNul { field });
    }
    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::NameTooLong {
            field,
            max: MAX_NAME_LENGTH,
        });
    }
    Ok(())
}

/// Validate a caller-supplied node id
pub fn validate_node_id(field: &'static str, id: NodeId) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::InvalidId { field });
    }
    Ok(())
}
