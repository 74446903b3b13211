use serde::{Deserialize, Serialize};

/// A child's registration profile.
///
/// Created once by the caller when a child is registered and passed by value
/// into the workflow. The interest list drives topic selection; duplicate
/// entries are harmless but redundant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildProfile {
    pub child_id: String,
    pub name: String,
    pub age: u32,
    pub interests: Vec<String>,
}
