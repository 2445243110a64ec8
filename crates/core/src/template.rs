//! Generation templates: read-only reference data describing the styles a
//! generation job can apply to a product photo.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Default template kind assigned by the backend.
pub const KIND_SOCIAL: &str = "social";

/// A backend-defined transformation applied during a generation job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: DbId,
    pub name: String,
    #[serde(default = "default_kind")]
    pub kind: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Free-form rendering parameters interpreted by the backend only.
    #[serde(default)]
    pub spec: serde_json::Value,
    #[serde(default)]
    pub background_url: Option<String>,
    #[serde(default)]
    pub preview_image: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

fn default_kind() -> String {
    KIND_SOCIAL.to_string()
}

fn default_active() -> bool {
    true
}

/// Ids of the active templates, in the order given.
pub fn active_template_ids(templates: &[Template]) -> Vec<DbId> {
    templates
        .iter()
        .filter(|t| t.is_active)
        .map(|t| t.id)
        .collect()
}
