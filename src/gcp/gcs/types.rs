use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Default)]
pub struct BucketList {
    #[serde(default)]
    pub items: Vec<Bucket>,
    #[serde(rename = "nextPageToken")]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "storageClass")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(rename = "timeCreated")]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_created: Option<String>,
}

impl Bucket {
    /// A bucket insert request carrying only the name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}
