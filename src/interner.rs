//! Task-id interning.
//!
//! The graph stores tasks in an arena indexed by dense `u32` node ids;
//! string task ids are only touched at the boundaries. Ids are assigned in
//! sorted order so two builds over the same task set produce identical
//! indexing - partial recalculation relies on this.

use rustc_hash::FxHashMap;

/// Dense node id within a built graph.
pub type NodeId = u32;

/// Bidirectional map between string task ids and dense node ids.
#[derive(Debug, Clone)]
pub struct NodeIndex {
    to_node: FxHashMap<String, NodeId>,
    names: Vec<String>,
}

impl NodeIndex {
    /// Build from an iterator of task ids, assigning node ids in iteration
    /// order. Callers sort first to get deterministic indexing.
    pub fn from_sorted<I: IntoIterator<Item = String>>(ids: I) -> Self {
        let names: Vec<String> = ids.into_iter().collect();
        let to_node = names
            .iter()
            .enumerate()
            .map(|(i, s)| (s.clone(), i as NodeId))
            .collect();
        Self { to_node, names }
    }

    #[inline]
    pub fn get(&self, task_id: &str) -> Option<NodeId> {
        self.to_node.get(task_id).copied()
    }

    #[inline]
    pub fn name(&self, node: NodeId) -> &str {
        &self.names[node as usize]
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_ids_get_stable_nodes() {
        let mut ids = vec!["framing".to_string(), "excavation".to_string()];
        ids.sort();
        let index = NodeIndex::from_sorted(ids);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("excavation"), Some(0));
        assert_eq!(index.get("framing"), Some(1));
        assert_eq!(index.name(0), "excavation");
        assert_eq!(index.get("roofing"), None);
    }
}
