use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub project_name: String,
    #[serde(default)]
    pub project_description: String,
    /// Anchor for CPM; when absent the earliest root start is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_start_date: Option<NaiveDate>,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            project_name: "New Project".to_string(),
            project_description: "No description".to_string(),
            project_start_date: None,
        }
    }
}

impl ProjectMetadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            project_name: name.into(),
            ..Self::default()
        }
    }
}
