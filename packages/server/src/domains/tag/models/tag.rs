use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::common::utils::slugify;
use crate::common::TagId;

/// Site-wide tag. Names are stored lower-cased and unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

impl Tag {
    pub fn new(name: &str) -> Self {
        let name = name.trim().to_lowercase();
        Self {
            id: TagId::new(),
            slug: slugify(&name),
            name,
            created_at: Utc::now(),
        }
    }
}

/// Lower-case and deduplicate tag names for tag creation, dropping blanks.
pub fn normalize_tag_names<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .iter()
        .map(|n| n.as_ref().trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .filter(|n| seen.insert(n.clone()))
        .collect()
}
