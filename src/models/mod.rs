pub mod process;
pub mod sandbox;
pub mod snapshot;

pub use process::*;
pub use sandbox::*;
pub use snapshot::*;

use serde::{Deserialize, Deserializer};

/// Treats an explicit `null` like a missing field.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
