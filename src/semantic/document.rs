use serde::{Deserialize, Serialize};

/// A tool flattened for semantic scoring. The `text` field carries the
/// combined searchable text; when empty, `normalized()` rebuilds it from the
/// structured fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    pub namespace: String,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub text: String,
}

impl Document {
    /// Prepare a document for indexing: tags are trimmed, lowercased, sorted
    /// and deduped, and `text` is built from the structured fields when it
    /// is empty.
    pub fn normalized(&self) -> Document {
        let mut tags: Vec<String> = self
            .tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        tags.sort();
        tags.dedup();

        let text = if self.text.is_empty() {
            let mut parts: Vec<&str> = Vec::with_capacity(3 + tags.len());
            if !self.name.is_empty() {
                parts.push(&self.name);
            }
            if !self.description.is_empty() {
                parts.push(&self.description);
            }
            if !self.namespace.is_empty() {
                parts.push(&self.namespace);
            }
            for tag in &tags {
                parts.push(tag);
            }
            parts.join(" ")
        } else {
            self.text.clone()
        };

        Document {
            id: self.id.clone(),
            name: self.name.clone(),
            namespace: self.namespace.clone(),
            description: self.description.clone(),
            tags,
            category: self.category.clone(),
            text,
        }
    }
}

/// Keep only documents in the given namespace.
pub fn filter_by_namespace(docs: &[Document], namespace: &str) -> Vec<Document> {
    docs.iter().filter(|d| d.namespace == namespace).cloned().collect()
}

/// Keep only documents carrying at least one of the given tags.
pub fn filter_by_tags(docs: &[Document], tags: &[&str]) -> Vec<Document> {
    docs.iter()
        .filter(|d| d.tags.iter().any(|t| tags.contains(&t.as_str())))
        .cloned()
        .collect()
}
