//! Name → layer lookup
//!
//! Layers are addressed by display name, which the host does not keep
//! unique. Every lookup goes through here so the rule is the same
//! everywhere: the topmost layer with the name wins.

use std::collections::HashMap;

use crate::host::{LayerId, LayerRef};

/// First (topmost) layer called `name`
pub fn find_by_name<'a>(layers: &'a [LayerRef], name: &str) -> Option<&'a LayerRef> {
    layers.iter().find(|l| l.name == name)
}

/// A `name → LayerId` table.
///
/// Built from a host listing, or filled step by step while a pipeline runs,
/// then discarded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LayerIndex {
    entries: HashMap<String, LayerId>,
}

impl LayerIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a host listing (topmost first); duplicates keep the topmost.
    pub fn from_layers(layers: &[LayerRef]) -> Self {
        let mut entries = HashMap::with_capacity(layers.len());
        for layer in layers {
            entries.entry(layer.name.clone()).or_insert(layer.id);
        }
        Self { entries }
    }

    /// Bind `name` to `layer`, replacing any earlier binding
    pub fn assign(&mut self, name: impl Into<String>, layer: LayerId) {
        self.entries.insert(name.into(), layer);
    }

    pub fn resolve(&self, name: &str) -> Option<LayerId> {
        self.entries.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Vec<LayerRef> {
        vec![
            LayerRef {
                id: LayerId(9),
                name: "White Balance".to_string(),
            },
            LayerRef {
                id: LayerId(5),
                name: "Retouch".to_string(),
            },
            LayerRef {
                id: LayerId(3),
                name: "White Balance".to_string(),
            },
        ]
    }

    #[test]
    fn test_topmost_duplicate_wins() {
        let layers = listing();
        assert_eq!(find_by_name(&layers, "White Balance").unwrap().id, LayerId(9));

        let index = LayerIndex::from_layers(&layers);
        assert_eq!(index.resolve("White Balance"), Some(LayerId(9)));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_assign_replaces() {
        let mut index = LayerIndex::new();
        index.assign("Glow", LayerId(1));
        index.assign("Glow", LayerId(2));
        assert_eq!(index.resolve("Glow"), Some(LayerId(2)));
        assert!(!index.contains("Shadow"));
    }
}
