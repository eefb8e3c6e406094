//! Which remote objects are worth tracking.

use crate::ObjectKey;

/// Returns true when `key` names a tracked object for the given suffix.
///
/// Directory placeholders (keys ending in `/`) are never tracked, even when
/// the suffix is empty.
pub fn is_tracked(key: &str, suffix: &str) -> bool {
    !key.is_empty() && !key.ends_with('/') && key.ends_with(suffix)
}

/// Filter a remote listing down to tracked keys, preserving listing order.
pub fn tracked_keys<I>(keys: I, suffix: &str) -> Vec<ObjectKey>
where
    I: IntoIterator<Item = ObjectKey>,
{
    keys.into_iter().filter(|k| is_tracked(k, suffix)).collect()
}
