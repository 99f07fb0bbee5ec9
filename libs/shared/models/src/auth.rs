use serde::{Deserialize, Serialize};
use std::fmt;

/// Which side of the consultation the local user is on.
///
/// Serialized as the backend's `user_type` discriminator. Token storage and
/// identity verification stay outside this workspace; cells only forward an
/// opaque bearer token alongside the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallRole {
    Patient,
    Doctor,
}

impl CallRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallRole::Patient => "patient",
            CallRole::Doctor => "doctor",
        }
    }
}

impl fmt::Display for CallRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
