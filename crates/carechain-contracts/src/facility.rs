//! Static facility metadata.

use serde::{Deserialize, Serialize};

/// Descriptive record of the hosting facility. Pure data; nothing in the
/// workflow reads it to make decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacilityManifest {
    pub uuid: String,
    pub name: String,
    pub departments: Vec<String>,
    /// Free-text security label shown to operators.
    pub security: String,
}
