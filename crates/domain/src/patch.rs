//! Helpers for partial-update payloads.

use serde::{Deserialize, Deserializer};

/// Deserializes a nullable field of a partial update.
///
/// Use with `#[serde(default, deserialize_with = "...")]`: an absent field
/// stays `None`, an explicit `null` becomes `Some(None)` and a value becomes
/// `Some(Some(value))`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
