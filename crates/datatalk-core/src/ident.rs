//! Identifier validation and safe SQL quoting.
//!
//! Column and dataset names come from files the user points us at, not
//! from a trusted schema author, so every place that splices a name into
//! a SQL string goes through [`quote_ident`] rather than raw
//! interpolation.

use crate::error::{CoreError, ErrorKind};

/// Maximum length for a registered dataset's display name.
pub const MAX_DATASET_NAME_LEN: usize = 255;

/// Validate a dataset display name.
///
/// Requirements: non-empty, at most [`MAX_DATASET_NAME_LEN`] characters,
/// alphanumeric/underscore/hyphen/dot only, and not starting or ending
/// with a hyphen.
pub fn validate_dataset_name(name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::new(
            ErrorKind::ProtocolViolation,
            "dataset name cannot be empty",
        ));
    }
    if name.len() > MAX_DATASET_NAME_LEN {
        return Err(CoreError::new(
            ErrorKind::ProtocolViolation,
            format!(
                "dataset name too long: {} > {} characters",
                name.len(),
                MAX_DATASET_NAME_LEN
            ),
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(CoreError::new(
            ErrorKind::ProtocolViolation,
            "dataset name contains invalid characters (allowed: alphanumeric, _, -, .)",
        ));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(CoreError::new(
            ErrorKind::ProtocolViolation,
            "dataset name cannot start or end with a hyphen",
        ));
    }
    Ok(())
}

/// Reject a filesystem path containing a traversal component or a null byte.
pub fn validate_file_path(path: &str) -> Result<(), CoreError> {
    if path.contains("..") {
        return Err(CoreError::file_unreadable(
            "path contains a traversal pattern (..)",
        ));
    }
    if path.contains('\0') {
        return Err(CoreError::file_unreadable("path contains a null byte"));
    }
    Ok(())
}

/// Double-quote a SQL identifier, escaping embedded quotes per the
/// standard SQL convention (`"` → `""`).
///
/// Every template in the planner runs column names through this instead
/// of interpolating them directly, since a column named `a"; DROP TABLE
/// data; --` is a real possibility for a CSV header the engine never
/// gets to reject.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
