//! Translation units, corpora and corpus groups.

use crate::err::{SerializationError, SerializationResult};
use crate::model::ir::{AbiArena, NamespaceDecl, Node, NodeId};
use crate::model::location::{Location, LocationManager};

/// One translation unit: an arena, its location manager, and a global scope
/// owning the top-level declarations.
#[derive(Debug, Clone)]
pub struct TranslationUnit {
    pub path: String,
    pub language: Option<String>,
    /// Address size in bits, 0 when unknown.
    pub address_size: u8,
    arena: AbiArena,
    locations: LocationManager,
    global_scope: NodeId,
}

impl TranslationUnit {
    pub fn new(path: impl Into<String>) -> Self {
        let mut arena = AbiArena::new();
        let global_scope = arena.alloc(NamespaceDecl::default());

        TranslationUnit {
            path: path.into(),
            language: None,
            address_size: 0,
            arena,
            locations: LocationManager::new(),
            global_scope,
        }
    }

    pub fn arena(&self) -> &AbiArena {
        &self.arena
    }

    pub fn arena_mut(&mut self) -> &mut AbiArena {
        &mut self.arena
    }

    pub fn locations(&self) -> &LocationManager {
        &self.locations
    }

    pub fn global_scope(&self) -> NodeId {
        self.global_scope
    }

    /// Allocate a node without attaching it to any scope. Use this for nodes
    /// that are only referenced (e.g. pointed-to types living elsewhere) or
    /// owned by another node (class members, template parameters).
    pub fn alloc(&mut self, node: impl Into<Node>) -> NodeId {
        self.arena.alloc(node)
    }

    /// Allocate a node and append it to the global scope.
    pub fn add_decl(&mut self, node: impl Into<Node>) -> NodeId {
        let id = self.arena.alloc(node);
        let scope = self.global_scope;
        let attached = self.scope_members(scope).map(|members| members.push(id));
        debug_assert!(attached.is_ok(), "global scope is always a namespace");
        id
    }

    /// Allocate a node and append it to the members of namespace `scope`.
    ///
    /// Nothing is allocated when `scope` is not a namespace of this unit.
    pub fn add_to_scope(
        &mut self,
        scope: NodeId,
        node: impl Into<Node>,
    ) -> SerializationResult<NodeId> {
        self.scope_members(scope)?;
        let id = self.arena.alloc(node);
        self.scope_members(scope)?.push(id);
        Ok(id)
    }

    /// Append an already allocated node to namespace `scope`. Lets callers
    /// order a scope independently of allocation order.
    pub fn attach(&mut self, scope: NodeId, id: NodeId) -> SerializationResult<()> {
        self.scope_members(scope)?.push(id);
        Ok(())
    }

    fn scope_members(&mut self, scope: NodeId) -> SerializationResult<&mut Vec<NodeId>> {
        match self.arena.get_mut(scope) {
            Some(Node::Namespace(ns)) => Ok(&mut ns.members),
            Some(other) => Err(SerializationError::UnexpectedKind {
                node: scope,
                expected: "namespace",
                found: other.kind(),
            }),
            None => Err(SerializationError::DanglingHandle { node: scope }),
        }
    }

    /// Top-level declarations in their stored order.
    pub fn decls(&self) -> &[NodeId] {
        match self.arena.get(self.global_scope) {
            Some(Node::Namespace(ns)) => &ns.members,
            _ => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.decls().is_empty()
    }

    pub fn create_location(&mut self, path: &str, line: u32, column: u32) -> Location {
        self.locations.create_new_location(path, line, column)
    }

    pub(crate) fn from_parts(
        path: String,
        language: Option<String>,
        address_size: u8,
        arena: AbiArena,
        locations: LocationManager,
        global_scope: NodeId,
    ) -> Self {
        TranslationUnit {
            path,
            language,
            address_size,
            arena,
            locations,
            global_scope,
        }
    }
}

/// The ABI of one binary: a set of translation units plus binary-level
/// metadata.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    pub path: String,
    pub architecture: String,
    pub soname: String,
    /// Names of the shared objects this binary depends on (`DT_NEEDED`).
    pub needed: Vec<String>,
    pub units: Vec<TranslationUnit>,
}

impl Corpus {
    pub fn new(path: impl Into<String>) -> Self {
        Corpus {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, unit: TranslationUnit) {
        self.units.push(unit);
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty() && self.needed.is_empty()
    }
}

/// A main corpus together with related corpora (e.g. a kernel and its
/// modules).
#[derive(Debug, Clone, Default)]
pub struct CorpusGroup {
    pub path: String,
    pub architecture: String,
    pub corpora: Vec<Corpus>,
}

impl CorpusGroup {
    pub fn new(path: impl Into<String>) -> Self {
        CorpusGroup {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn add(&mut self, corpus: Corpus) {
        self.corpora.push(corpus);
    }

    pub fn is_empty(&self) -> bool {
        self.corpora.is_empty()
    }
}
