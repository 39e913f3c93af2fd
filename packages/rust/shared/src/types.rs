//! Core domain types for deckbuilder content trees.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// Ordered string-to-string mapping parsed from a leaf's front matter.
///
/// Insertion order is preserved so attributes render in the order they
/// were written. Re-inserting an existing key replaces its value in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.0.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Keep only entries whose key satisfies `keep`.
    pub fn retain_keys(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.0.retain(|(k, _)| keep(k));
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Metadata::new();
        for (k, v) in iter {
            meta.insert(k, v);
        }
        meta
    }
}

// ---------------------------------------------------------------------------
// ContentNode
// ---------------------------------------------------------------------------

/// Whether a node came from a file or a directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// A single source file, mapped to one slide.
    Leaf,
    /// A directory, mapped to a container with no content of its own.
    Group,
}

/// One composed entry of the content tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub kind: NodeKind,
    /// File stem for a leaf, directory name for a group.
    pub name: String,
    /// Integer parsed from the name; `None` when the name has no digits.
    pub sort_key: Option<u64>,
    /// Front matter entries (always empty for a group).
    pub metadata: Metadata,
    /// Rendered HTML for a leaf; concatenated child containers for a group.
    pub body: String,
}

impl ContentNode {
    pub fn leaf(name: impl Into<String>, sort_key: Option<u64>, metadata: Metadata, body: String) -> Self {
        Self {
            kind: NodeKind::Leaf,
            name: name.into(),
            sort_key,
            metadata,
            body,
        }
    }

    pub fn group(name: impl Into<String>, sort_key: Option<u64>, body: String) -> Self {
        Self {
            kind: NodeKind::Group,
            name: name.into(),
            sort_key,
            metadata: Metadata::new(),
            body,
        }
    }
}

// ---------------------------------------------------------------------------
// Outline
// ---------------------------------------------------------------------------

/// A node of the content tree as the composer would order it, without
/// rendering anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineEntry {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineEntry>,
}

impl OutlineEntry {
    /// Count leaves at or below this entry.
    pub fn leaf_count(&self) -> usize {
        match self.kind {
            NodeKind::Leaf => 1,
            NodeKind::Group => self.children.iter().map(OutlineEntry::leaf_count).sum(),
        }
    }
}

// ---------------------------------------------------------------------------
// BuildMode
// ---------------------------------------------------------------------------

/// Production builds write to the dist directory and reference minified
/// assets; development builds write to the dev directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    #[default]
    Production,
    Development,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        matches!(self, BuildMode::Production)
    }
}

impl std::fmt::Display for BuildMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuildMode::Production => f.write_str("production"),
            BuildMode::Development => f.write_str("development"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_preserves_insertion_order() {
        let meta: Metadata = [("layout", "center"), ("id", "42"), ("class", "dark")]
            .into_iter()
            .collect();
        let keys: Vec<&str> = meta.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["layout", "id", "class"]);
    }

    #[test]
    fn metadata_insert_replaces_in_place() {
        let mut meta = Metadata::new();
        meta.insert("a", "1");
        meta.insert("b", "2");
        meta.insert("a", "3");
        assert_eq!(meta.len(), 2);
        assert_eq!(meta.get("a"), Some("3"));
        assert_eq!(meta.iter().next(), Some(("a", "3")));
    }

    #[test]
    fn group_has_no_metadata() {
        let node = ContentNode::group("2-section", Some(2), String::new());
        assert_eq!(node.kind, NodeKind::Group);
        assert!(node.metadata.is_empty());
    }

    #[test]
    fn outline_leaf_count() {
        let leaf = |name: &str| OutlineEntry {
            name: name.into(),
            kind: NodeKind::Leaf,
            sort_key: None,
            children: vec![],
        };
        let tree = OutlineEntry {
            name: "content".into(),
            kind: NodeKind::Group,
            sort_key: None,
            children: vec![
                leaf("1-title"),
                OutlineEntry {
                    name: "2-body".into(),
                    kind: NodeKind::Group,
                    sort_key: Some(2),
                    children: vec![leaf("1-a"), leaf("2-b")],
                },
            ],
        };
        assert_eq!(tree.leaf_count(), 3);
    }

    #[test]
    fn outline_serializes_without_empty_fields() {
        let entry = OutlineEntry {
            name: "intro".into(),
            kind: NodeKind::Leaf,
            sort_key: None,
            children: vec![],
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert_eq!(json, r#"{"name":"intro","kind":"leaf"}"#);
    }

    #[test]
    fn build_mode_display() {
        assert_eq!(BuildMode::Production.to_string(), "production");
        assert!(!BuildMode::Development.is_production());
    }
}
