//! Identity and contact fields shared by every pipeline stage.

use serde::{Deserialize, Serialize};

/// Contact block copied from one pipeline stage to the next when a cascade
/// creates a downstream entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    pub company: Option<String>,
    pub contact_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Writes `value` into `slot` only when the slot is still empty.
///
/// Link fields are set once by the engine and never repointed; this helper is
/// the single place that rule is applied. Returns true if the slot changed.
pub(crate) fn set_once(slot: &mut Option<String>, value: Option<&String>) -> bool {
    match (slot.as_ref(), value) {
        (None, Some(v)) => {
            *slot = Some(v.clone());
            true
        }
        _ => false,
    }
}
