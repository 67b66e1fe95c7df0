//! JSON shapes of the shutdown artifacts

use serde::{Deserialize, Serialize};

/// Exported dependency tree: bookkeeping fields stripped, only labels and structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub name: String,
    pub children: Vec<TreeDocument>,
}

impl TreeDocument {
    /// Total number of nodes, this one included
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeDocument::node_count).sum::<usize>()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Structured record: a timestamp plus one named payload
///
/// Serializes as `{"time": "...", "<field>": <payload>}` where the field is
/// `summary` for the shutdown summary and `message` for live log lines.
#[derive(Debug, Clone, Serialize)]
pub struct StructuredRecord<'a, T: Serialize> {
    pub time: &'a str,
    #[serde(flatten)]
    pub payload: Payload<'a, T>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Payload<'a, T: Serialize> {
    Summary(&'a T),
    Message(&'a str),
}
