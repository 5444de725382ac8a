//! Physical resource id generation.

use uuid::Uuid;

pub const DEFAULT_PHYSICAL_ID_MAX_LENGTH: usize = 255;
/// Marks ids handed out for a Create that failed before the resource existed.
pub const FAILED_CREATE_MARKER: &str = "FAILED-CREATE-";

const SUFFIX_LENGTH: usize = 12;

/// Smallest `max_length` at which a placeholder keeps both its marker and a
/// full random suffix. Shorter limits still bound every id, at the cost of
/// truncating the suffix or the marker.
pub const MIN_PHYSICAL_ID_MAX_LENGTH: usize = FAILED_CREATE_MARKER.len() + SUFFIX_LENGTH;

/// `{stack-name}-{logical-id}-{suffix}`, trimmed from the front of the prefix
/// so the whole id fits `max_length`.
pub fn generate_physical_id(
    stack_id: &str,
    logical_resource_id: &str,
    max_length: usize,
) -> String {
    let mut suffix = random_suffix();
    let prefix = [stack_name(stack_id), logical_resource_id.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let available = max_length.saturating_sub(SUFFIX_LENGTH + 1);
    if prefix.is_empty() || available == 0 {
        suffix.truncate(max_length);
        return suffix;
    }
    format!("{}-{suffix}", keep_tail(&prefix, available))
}

pub fn failed_create_placeholder(
    stack_id: &str,
    logical_resource_id: &str,
    max_length: usize,
) -> String {
    let remaining = max_length.saturating_sub(FAILED_CREATE_MARKER.len());
    if remaining == 0 {
        return FAILED_CREATE_MARKER[..max_length].to_string();
    }
    format!(
        "{FAILED_CREATE_MARKER}{}",
        generate_physical_id(stack_id, logical_resource_id, remaining)
    )
}

pub fn is_failed_create_placeholder(physical_resource_id: &str) -> bool {
    physical_resource_id.starts_with(FAILED_CREATE_MARKER)
}

/// Stack name from a CloudFormation stack ARN; the raw value otherwise.
pub fn stack_name(stack_id: &str) -> &str {
    let trimmed = stack_id.trim();
    if !trimmed.starts_with("arn:") {
        return trimmed;
    }
    trimmed
        .rsplit(':')
        .next()
        .and_then(|resource| {
            let mut parts = resource.split('/');
            match (parts.next(), parts.next()) {
                (Some("stack"), Some(name)) if !name.is_empty() => Some(name),
                _ => None,
            }
        })
        .unwrap_or(trimmed)
}

fn random_suffix() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .to_uppercase()
        .chars()
        .take(SUFFIX_LENGTH)
        .collect()
}

fn keep_tail(value: &str, max_chars: usize) -> &str {
    let count = value.chars().count();
    if count <= max_chars {
        return value;
    }
    let skip = count - max_chars;
    let start = value
        .char_indices()
        .nth(skip)
        .map(|(index, _)| index)
        .unwrap_or(value.len());
    &value[start..]
}
