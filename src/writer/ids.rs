//! Identity registry.
//!
//! Hands out textual ids for nodes the first time they are referenced and
//! returns the same id afterwards. Ids live in three namespaces, each with its
//! own counter and prefix, so the namespace of an id can be told from its
//! text alone.

use crate::model::NodeId;
use ahash::RandomState;
use hashbrown::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdNamespace {
    Type,
    FunctionTemplate,
    ClassTemplate,
}

impl IdNamespace {
    pub fn prefix(self) -> &'static str {
        match self {
            IdNamespace::Type => "type-id-",
            IdNamespace::FunctionTemplate => "fn-tmpl-id-",
            IdNamespace::ClassTemplate => "class-tmpl-id-",
        }
    }

    fn slot(self) -> usize {
        match self {
            IdNamespace::Type => 0,
            IdNamespace::FunctionTemplate => 1,
            IdNamespace::ClassTemplate => 2,
        }
    }
}

/// Identity of a node across a whole document.
///
/// Each translation unit has its own arena, so a bare `NodeId` is only unique
/// within one unit. `unit` is the position of the unit in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeKey {
    pub unit: u32,
    pub node: NodeId,
}

impl NodeKey {
    pub fn new(unit: u32, node: NodeId) -> Self {
        NodeKey { unit, node }
    }
}

#[derive(Debug, Default)]
struct IdTable {
    counter: u64,
    ids: HashMap<NodeKey, String, RandomState>,
}

/// Per-session id allocator. Created fresh for every top-level write.
#[derive(Debug, Default)]
pub struct IdRegistry {
    tables: [IdTable; 3],
}

impl IdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the id of `key` in `namespace`, allocating it on first use.
    pub fn id_for(&mut self, key: NodeKey, namespace: IdNamespace) -> &str {
        let table = &mut self.tables[namespace.slot()];
        let counter = &mut table.counter;
        table
            .ids
            .entry(key)
            .or_insert_with(|| {
                *counter += 1;
                format!("{}{}", namespace.prefix(), counter)
            })
            .as_str()
    }

    /// Whether `key` already has an id in any namespace. Never allocates.
    pub fn has_id(&self, key: NodeKey) -> bool {
        self.tables.iter().any(|table| table.ids.contains_key(&key))
    }

    /// Number of ids allocated so far in `namespace`.
    pub fn allocated(&self, namespace: IdNamespace) -> u64 {
        self.tables[namespace.slot()].counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AbiArena, BasicType};

    fn keys(count: usize) -> Vec<NodeKey> {
        let mut arena = AbiArena::new();
        (0..count)
            .map(|i| NodeKey::new(0, arena.alloc(BasicType::new(format!("t{}", i), 8))))
            .collect()
    }

    #[test]
    fn test_id_is_stable() {
        let keys = keys(2);
        let mut registry = IdRegistry::new();

        assert!(!registry.has_id(keys[0]));
        let first = registry.id_for(keys[0], IdNamespace::Type).to_owned();
        assert_eq!(first, "type-id-1");
        assert!(registry.has_id(keys[0]));

        assert_eq!(registry.id_for(keys[1], IdNamespace::Type), "type-id-2");
        assert_eq!(registry.id_for(keys[0], IdNamespace::Type), first);
        assert_eq!(registry.allocated(IdNamespace::Type), 2);
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let keys = keys(3);
        let mut registry = IdRegistry::new();

        // Interleave allocations across namespaces.
        let a = registry.id_for(keys[0], IdNamespace::FunctionTemplate).to_owned();
        let b = registry.id_for(keys[1], IdNamespace::Type).to_owned();
        let c = registry.id_for(keys[2], IdNamespace::ClassTemplate).to_owned();

        assert_eq!(a, "fn-tmpl-id-1");
        assert_eq!(b, "type-id-1");
        assert_eq!(c, "class-tmpl-id-1");
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn test_same_node_in_different_units_gets_distinct_ids() {
        let mut arena = AbiArena::new();
        let node = arena.alloc(BasicType::new("int", 32));
        let mut registry = IdRegistry::new();

        let a = registry.id_for(NodeKey::new(0, node), IdNamespace::Type).to_owned();
        let b = registry.id_for(NodeKey::new(1, node), IdNamespace::Type).to_owned();
        assert_ne!(a, b);
    }
}
