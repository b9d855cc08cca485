use serde::{Deserialize, Serialize};

/// Editing options of a [`Content`](crate::Content)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Configuration {
    /// Attributes dropped from pasted ideas
    pub non_cloned_attributes: Vec<String>,
}
