use std::collections::BTreeSet;

use crate::message::Message;

/// Splits operator input like `"tenant-a, tenant-b"` into an allow-set.
/// Tokens are trimmed; empty tokens are dropped.
pub fn parse_allow_set(input: &str) -> BTreeSet<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Whether a decoded message belongs in the list under the current filter.
///
/// An empty allow-set never filters anything, whatever the flag says.
pub fn should_display(message: &Message, filter_active: bool, allow_set: &BTreeSet<String>) -> bool {
    if !filter_active || allow_set.is_empty() {
        return true;
    }

    message
        .context_value
        .as_deref()
        .is_some_and(|value| !value.is_empty() && allow_set.contains(value))
}
