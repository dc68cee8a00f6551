#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use super::entities::NodeId;

/// The type of a directed relation between two graph nodes. Every type has a
/// mandatory inverse; relations are only ever stored in pairs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelationType {
    /// source references target (identifier use)
    Uses,
    /// inverse of `Uses`
    UsedBy,
    /// source extends target (class inheritance)
    Extends,
    /// inverse of `Extends`
    ExtendedBy,
    /// source implements target (interface)
    Implements,
    /// inverse of `Implements`
    ImplementedBy,
    /// source instantiates target
    Creates,
    /// inverse of `Creates`
    CreatedBy,
}

impl RelationType {
    /// The inverse relation type.
    pub fn inverse(self) -> Self {
        match self {
            Self::Uses => Self::UsedBy,
            Self::UsedBy => Self::Uses,
            Self::Extends => Self::ExtendedBy,
            Self::ExtendedBy => Self::Extends,
            Self::Implements => Self::ImplementedBy,
            Self::ImplementedBy => Self::Implements,
            Self::Creates => Self::CreatedBy,
            Self::CreatedBy => Self::Creates,
        }
    }
}

/// A directed, typed edge between two graph nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relation {
    /// edge source
    pub source: NodeId,
    /// edge type
    pub ty:     RelationType,
    /// edge target
    pub target: NodeId,
}

/// Stores all relations of one graph. Immutable once built; `reset` clears
/// everything before a rebuild.
#[derive(Debug, Clone, Default)]
pub struct Relations {
    /// every stored relation, both directions
    all:     Vec<Relation>,
    /// relation indices per node, for fast lookup
    by_node: HashMap<NodeId, Vec<usize>>,
    /// identity set for deduplication
    seen:    HashSet<(NodeId, RelationType, NodeId)>,
    /// set once a build has completed
    built:   bool,
}

impl Relations {
    /// Adds a relation together with its inverse. Re-adding an edge that
    /// already exists (in either direction) is a no-op; scanning can revisit
    /// the same syntactic use and must not inflate scores through
    /// duplication.
    pub(super) fn add_pair(&mut self, source: NodeId, ty: RelationType, target: NodeId) {
        let key = (source, ty, target);
        let inverse_key = (target, ty.inverse(), source);
        if self.seen.contains(&key) || self.seen.contains(&inverse_key) {
            return;
        }

        for (s, t, tgt) in [key, inverse_key] {
            let relation = Relation {
                source: s,
                ty:     t,
                target: tgt,
            };
            self.by_node.entry(s).or_default().push(self.all.len());
            self.all.push(relation);
            self.seen.insert((s, t, tgt));
        }
    }

    /// Marks the build as complete. Building twice without a `reset` in
    /// between is a caller error.
    pub(super) fn mark_built(&mut self) {
        assert!(!self.built, "relations already built; call reset() before rebuilding");
        self.built = true;
    }

    /// Whether a completed build is in place.
    pub fn is_built(&self) -> bool {
        self.built
    }

    /// Clears all relations. Must be called before any rebuild.
    pub fn reset(&mut self) {
        self.all.clear();
        self.by_node.clear();
        self.seen.clear();
        self.built = false;
    }

    /// All relations originating at `node`; empty (not an error) for nodes
    /// with no relations.
    pub fn of(&self, node: NodeId) -> Vec<Relation> {
        self.by_node
            .get(&node)
            .map(|indices| indices.iter().map(|&i| self.all[i]).collect())
            .unwrap_or_default()
    }

    /// Every stored relation, both directions included.
    pub fn all(&self) -> &[Relation] {
        &self.all
    }

    /// True when a relation of `ty` from `source` to `target` exists.
    pub fn contains(&self, source: NodeId, ty: RelationType, target: NodeId) -> bool {
        self.seen.contains(&(source, ty, target))
    }

    /// True when any relation of `ty` originates at `source`.
    pub fn has_any(&self, source: NodeId, ty: RelationType) -> bool {
        self.of(source).iter().any(|r| r.ty == ty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::entities::{EntityId, MemberId};

    #[test]
    fn add_pair_stores_both_directions() {
        let mut relations = Relations::default();
        let a = NodeId::Entity(EntityId(0));
        let b = NodeId::Member(MemberId(3));
        relations.add_pair(a, RelationType::Uses, b);

        assert!(relations.contains(a, RelationType::Uses, b));
        assert!(relations.contains(b, RelationType::UsedBy, a));
        assert_eq!(relations.all().len(), 2);
    }

    #[test]
    fn duplicate_edges_are_ignored_in_either_direction() {
        let mut relations = Relations::default();
        let a = NodeId::Entity(EntityId(0));
        let b = NodeId::Entity(EntityId(1));
        relations.add_pair(a, RelationType::Creates, b);
        relations.add_pair(a, RelationType::Creates, b);
        relations.add_pair(b, RelationType::CreatedBy, a);

        assert_eq!(relations.all().len(), 2);
    }

    #[test]
    fn reset_clears_build_state() {
        let mut relations = Relations::default();
        relations.add_pair(
            NodeId::Entity(EntityId(0)),
            RelationType::Extends,
            NodeId::Entity(EntityId(1)),
        );
        relations.mark_built();
        relations.reset();

        assert!(!relations.is_built());
        assert!(relations.all().is_empty());
        relations.mark_built();
    }

    #[test]
    #[should_panic(expected = "already built")]
    fn building_twice_without_reset_panics() {
        let mut relations = Relations::default();
        relations.mark_built();
        relations.mark_built();
    }
}
