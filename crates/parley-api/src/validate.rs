use std::ops::RangeInclusive;

use parley_types::api::normalize_channel_name;

use crate::error::{ApiError, Result};

const NAME_LEN: RangeInclusive<usize> = 3..=80;

/// Trimmed workspace name, 3 to 80 characters.
pub fn workspace_name(raw: &str) -> Result<String> {
    let name = raw.trim();
    if !NAME_LEN.contains(&name.chars().count()) {
        return Err(ApiError::validation("name must be 3 to 80 characters"));
    }
    Ok(name.to_string())
}

/// Normalized channel name, 3 to 80 characters after normalization.
pub fn channel_name(raw: &str) -> Result<String> {
    let name = normalize_channel_name(raw.trim());
    if !NAME_LEN.contains(&name.chars().count()) {
        return Err(ApiError::validation("channel name must be 3 to 80 characters"));
    }
    Ok(name)
}

/// A message needs visible text or an attachment.
pub fn message_body(body: &str, has_image: bool) -> Result<()> {
    if body.trim().is_empty() && !has_image {
        return Err(ApiError::validation("message is empty"));
    }
    Ok(())
}
