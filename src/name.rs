//! Name validation.
//!
//! Names are trimmed and lowercased before validation, so `" Alice "` is accepted as
//! `"alice"`. After normalization a name must be 3 to 32 characters of `[a-z0-9-]`.

use crate::error::{EggnsError, Result};

pub const MIN_NAME_LENGTH: usize = 3;
pub const MAX_NAME_LENGTH: usize = 32;

/// Normalizes and validates a name, returning the canonical lowercase form.
pub fn normalize_name(raw: &str) -> Result<String> {
    let name = raw.trim().to_lowercase();
    let invalid = |reason: String| EggnsError::InvalidNameFormat {
        name: raw.to_string(),
        reason,
    };

    let length = name.chars().count();
    if length < MIN_NAME_LENGTH {
        return Err(invalid(format!(
            "must be at least {} characters",
            MIN_NAME_LENGTH
        )));
    }
    if length > MAX_NAME_LENGTH {
        return Err(invalid(format!(
            "must be at most {} characters",
            MAX_NAME_LENGTH
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
    {
        return Err(invalid(format!("character '{}' is not allowed", c)));
    }

    Ok(name)
}

pub fn is_valid_name(raw: &str) -> bool {
    normalize_name(raw).is_ok()
}
