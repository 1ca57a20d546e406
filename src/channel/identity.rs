use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-load client identifier
///
/// The agent keys its conversation memory on this value, so one identity is
/// created at startup and handed to the coordinator for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionIdentity(String);

impl SessionIdentity {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random identity (e.g., "client-4f1c…")
    pub fn generate() -> Self {
        Self(format!("client-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
