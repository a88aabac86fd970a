use serde::{Deserialize, Serialize};

/// One key/value pair attached to a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetaDataEntry {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub resource_id: i64,
}

/// A page of metadata entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetaData {
    pub total_count: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub per_page: i64,
    pub metadata: Vec<MetaDataEntry>,
}

impl MetaData {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value.as_str())
    }
}
