#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The entity/relation graph the check engine evaluates against.
//!
//! Entities and members live in flat arenas and reference each other by id;
//! relations are derived once per run from declaration facts and stored in
//! paired directions.

/// Entity and member model.
pub mod entities;
/// Typed, paired relations between graph nodes.
pub mod relations;

use std::collections::HashMap;

use tracing::{debug, warn};

pub use entities::{
    Entity, EntityId, EntityKind, FieldFacts, Member, MemberId, MemberKind, MethodFacts, Modifier,
    NodeId, PropertyShape, TypeRef,
};
pub use relations::{Relation, RelationType, Relations};

use crate::java::{RawMemberKind, SourceFile};

/// The merged graph of all parsed entities, their members, and the relations
/// between them. Built once per run; read-only during evaluation.
#[derive(Debug, Clone, Default)]
pub struct SyntaxGraph {
    /// entity arena
    entities:  Vec<Entity>,
    /// member arena
    members:   Vec<Member>,
    /// identity index: qualified name -> entity
    by_name:   HashMap<String, EntityId>,
    /// the relation store
    relations: Relations,
}

impl SyntaxGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no entities were added.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Merges one parsed file into the graph. Entities whose qualified name
    /// already exists are skipped; identity is by qualified name within one
    /// analysis run.
    pub fn add_file(&mut self, file: &SourceFile) {
        let mut added: Vec<Option<EntityId>> = Vec::with_capacity(file.entities.len());

        for raw in &file.entities {
            let qualified = file.qualified_name(raw);
            if self.by_name.contains_key(&qualified) {
                warn!(%qualified, origin = %file.origin, "duplicate entity; keeping first");
                added.push(None);
                continue;
            }

            let id = EntityId(self.entities.len());
            self.entities.push(Entity {
                name: raw.name.clone(),
                qualified_name: qualified.clone(),
                kind: raw.kind,
                modifiers: raw.modifiers.clone(),
                bases: raw.bases.clone(),
                members: Vec::new(),
                nested: Vec::new(),
                origin: file.origin.clone(),
            });
            self.by_name.insert(qualified, id);

            for m in &raw.members {
                let kind = match m.kind {
                    RawMemberKind::Method => MemberKind::Method,
                    RawMemberKind::Field => MemberKind::Field,
                    RawMemberKind::Constructor => MemberKind::Constructor,
                };
                let member_id = MemberId(self.members.len());
                self.members.push(Member {
                    name: m.name.clone(),
                    kind,
                    owner: id,
                    modifiers: m.modifiers.clone(),
                    ty: m.ty.clone(),
                    params: m.params.clone(),
                    property: None,
                    created_types: m.created_types.clone(),
                    used_names: m.used_names.clone(),
                });
                self.entities[id.0].members.push(member_id);
            }

            added.push(Some(id));
        }

        // Wire nesting between entities of this file.
        for (i, raw) in file.entities.iter().enumerate() {
            let Some(inner) = added[i] else { continue };
            for (j, outer_raw) in file.entities.iter().enumerate() {
                if i == j {
                    continue;
                }
                if raw.nested_in(outer_raw) {
                    if let Some(outer) = added[j] {
                        self.entities[outer.0].nested.push(inner);
                    }
                }
            }
        }
    }

    /// Borrow an entity by id.
    pub fn entity(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    /// Borrow a member by id.
    pub fn member(&self, id: MemberId) -> &Member {
        &self.members[id.0]
    }

    /// All entities, in merge order.
    pub fn entities(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities.iter().enumerate().map(|(i, e)| (EntityId(i), e))
    }

    /// Human-readable name for any graph node.
    pub fn node_name(&self, node: NodeId) -> &str {
        match node {
            NodeId::Entity(id) => &self.entity(id).name,
            NodeId::Member(id) => &self.member(id).name,
        }
    }

    /// The entity a node belongs to: itself, or the owner for members.
    pub fn owning_entity(&self, node: NodeId) -> EntityId {
        match node {
            NodeId::Entity(id) => id,
            NodeId::Member(id) => self.member(id).owner,
        }
    }

    /// Resolves a type reference to the entity it names, by qualified name
    /// first, then by simple name. `None` when the reference points outside
    /// the analyzed set.
    pub fn resolve_type(&self, reference: &TypeRef) -> Option<EntityId> {
        if let Some(&id) = self.by_name.get(reference.as_str()) {
            return Some(id);
        }
        let simple = reference.base_name();
        self.entities
            .iter()
            .position(|e| e.name == simple)
            .map(EntityId)
    }

    /// Resolves an identifier use to the entity or member it names. Entities
    /// shadow members; ambiguous member names resolve to their first
    /// declaration in merge order.
    pub fn resolve_symbol(&self, name: &str) -> Option<NodeId> {
        if let Some(id) = self.resolve_type(&TypeRef::new(name)) {
            return Some(NodeId::Entity(id));
        }
        self.members
            .iter()
            .position(|m| m.name == name)
            .map(|i| NodeId::Member(MemberId(i)))
    }

    /// Derives and stores all relations from the current entity set. Must
    /// not be called twice without `reset_relations` in between.
    pub fn build_relations(&mut self) {
        // Parent edges: resolved base references become Extends or
        // Implements depending on the target's kind. Unresolvable
        // references point outside the analyzed set and are skipped.
        let mut pairs: Vec<(NodeId, RelationType, NodeId)> = Vec::new();

        for (i, entity) in self.entities.iter().enumerate() {
            let source = NodeId::Entity(EntityId(i));
            for base in &entity.bases {
                let Some(target) = self.resolve_type(base) else {
                    continue;
                };
                let ty = match self.entity(target).kind {
                    EntityKind::Class => RelationType::Extends,
                    EntityKind::Interface => RelationType::Implements,
                };
                pairs.push((source, ty, NodeId::Entity(target)));
            }
        }

        // Creation and using edges, from each member and again from its
        // owning entity; the dedup store collapses revisits.
        for (i, member) in self.members.iter().enumerate() {
            let member_node = NodeId::Member(MemberId(i));
            let owner_node = NodeId::Entity(member.owner);

            for created in &member.created_types {
                let Some(target) = self.resolve_type(&TypeRef::new(created)) else {
                    continue;
                };
                let target = NodeId::Entity(target);
                for source in [member_node, owner_node] {
                    if source != target {
                        pairs.push((source, RelationType::Creates, target));
                    }
                }
            }

            for used in &member.used_names {
                let Some(target) = self.resolve_symbol(used) else {
                    continue;
                };
                for source in [member_node, owner_node] {
                    if source != target {
                        pairs.push((source, RelationType::Uses, target));
                    }
                }
            }
        }

        for (source, ty, target) in pairs {
            self.relations.add_pair(source, ty, target);
        }
        self.relations.mark_built();
        debug!(relations = self.relations.all().len(), "relation graph built");
    }

    /// Clears all relations; required before rebuilding.
    pub fn reset_relations(&mut self) {
        self.relations.reset();
    }

    /// The relation store.
    pub fn relations(&self) -> &Relations {
        &self.relations
    }

    /// All relations originating at `node`; empty for unrelated nodes.
    pub fn relations_of(&self, node: NodeId) -> Vec<Relation> {
        self.relations.of(node)
    }

    /// Method-shaped views over an entity: real methods plus synthesized
    /// property accessors. Checks written against methods apply to all of
    /// them uniformly.
    pub fn methods_of(&self, id: EntityId) -> Vec<MethodFacts> {
        let mut out = Vec::new();
        for &member_id in &self.entity(id).members {
            let member = self.member(member_id);
            match member.kind {
                MemberKind::Method => out.push(MethodFacts {
                    name:        member.name.clone(),
                    node:        NodeId::Member(member_id),
                    modifiers:   member.modifiers.clone(),
                    return_type: member.ty.clone(),
                    params:      member.params.clone(),
                }),
                MemberKind::Property => {
                    let Some(shape) = member.property else { continue };
                    if shape.has_getter {
                        out.push(MethodFacts {
                            name:        format!("{}_get", member.name),
                            node:        NodeId::Member(member_id),
                            modifiers:   member.modifiers.clone(),
                            return_type: member.ty.clone(),
                            params:      Vec::new(),
                        });
                    }
                    if shape.has_setter {
                        out.push(MethodFacts {
                            name:        format!("{}_set", member.name),
                            node:        NodeId::Member(member_id),
                            modifiers:   member.modifiers.clone(),
                            return_type: Some(TypeRef::new("void")),
                            params:      member.ty.iter().cloned().collect(),
                        });
                    }
                }
                _ => {}
            }
        }
        out
    }

    /// Field-shaped views over an entity: real fields plus the synthesized
    /// backing field of every auto-implemented property. Backing fields keep
    /// the property's non-access modifiers and are private.
    pub fn fields_of(&self, id: EntityId) -> Vec<FieldFacts> {
        let mut out = Vec::new();
        for &member_id in &self.entity(id).members {
            let member = self.member(member_id);
            match member.kind {
                MemberKind::Field => {
                    let Some(ty) = member.ty.clone() else { continue };
                    out.push(FieldFacts {
                        name: member.name.clone(),
                        node: NodeId::Member(member_id),
                        modifiers: member.modifiers.clone(),
                        ty,
                    });
                }
                MemberKind::Property => {
                    let (Some(shape), Some(ty)) = (member.property, member.ty.clone()) else {
                        continue;
                    };
                    if !shape.auto {
                        continue;
                    }
                    let mut modifiers: Vec<Modifier> =
                        member.modifiers.iter().copied().filter(|m| !m.is_access()).collect();
                    modifiers.insert(0, Modifier::Private);
                    out.push(FieldFacts {
                        name: member.name.clone(),
                        node: NodeId::Member(member_id),
                        modifiers,
                        ty,
                    });
                }
                _ => {}
            }
        }
        out
    }

    /// Constructors of an entity.
    pub fn constructors_of(&self, id: EntityId) -> Vec<MemberId> {
        self.entity(id)
            .members
            .iter()
            .copied()
            .filter(|&m| self.member(m).kind == MemberKind::Constructor)
            .collect()
    }

    /// Properties of an entity.
    pub fn properties_of(&self, id: EntityId) -> Vec<MemberId> {
        self.entity(id)
            .members
            .iter()
            .copied()
            .filter(|&m| self.member(m).kind == MemberKind::Property)
            .collect()
    }

    /// A constructor exposed as a method: return type is the owning entity,
    /// name is the constructor's own.
    pub fn constructor_as_method(&self, id: MemberId) -> MethodFacts {
        let member = self.member(id);
        MethodFacts {
            name:        member.name.clone(),
            node:        NodeId::Member(id),
            modifiers:   member.modifiers.clone(),
            return_type: Some(TypeRef::new(&self.entity(member.owner).name)),
            params:      member.params.clone(),
        }
    }
}

/// Assembles a graph programmatically, without going through source text.
/// Mirrors how recognizer tests build their fixtures.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    /// the graph under construction
    graph: SyntaxGraph,
}

impl GraphBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entity; its qualified name equals its simple name.
    pub fn entity(&mut self, name: &str, kind: EntityKind, modifiers: &[Modifier]) -> EntityId {
        let id = EntityId(self.graph.entities.len());
        self.graph.entities.push(Entity {
            name: name.to_string(),
            qualified_name: name.to_string(),
            kind,
            modifiers: modifiers.to_vec(),
            bases: Vec::new(),
            members: Vec::new(),
            nested: Vec::new(),
            origin: String::from("<builder>"),
        });
        self.graph.by_name.insert(name.to_string(), id);
        id
    }

    /// Adds an unresolved base-type reference to an entity.
    pub fn base(&mut self, entity: EntityId, base: &str) -> &mut Self {
        self.graph.entities[entity.0].bases.push(TypeRef::new(base));
        self
    }

    /// Adds a member of the given kind and returns its id.
    fn member(
        &mut self,
        owner: EntityId,
        kind: MemberKind,
        name: &str,
        ty: Option<&str>,
        modifiers: &[Modifier],
        params: &[&str],
    ) -> MemberId {
        let id = MemberId(self.graph.members.len());
        self.graph.members.push(Member {
            name: name.to_string(),
            kind,
            owner,
            modifiers: modifiers.to_vec(),
            ty: ty.map(TypeRef::new),
            params: params.iter().map(|p| TypeRef::new(*p)).collect(),
            property: None,
            created_types: Vec::new(),
            used_names: Vec::new(),
        });
        self.graph.entities[owner.0].members.push(id);
        id
    }

    /// Adds a method.
    pub fn method(
        &mut self,
        owner: EntityId,
        name: &str,
        return_type: &str,
        modifiers: &[Modifier],
        params: &[&str],
    ) -> MemberId {
        self.member(owner, MemberKind::Method, name, Some(return_type), modifiers, params)
    }

    /// Adds a field.
    pub fn field(
        &mut self,
        owner: EntityId,
        name: &str,
        ty: &str,
        modifiers: &[Modifier],
    ) -> MemberId {
        self.member(owner, MemberKind::Field, name, Some(ty), modifiers, &[])
    }

    /// Adds a constructor.
    pub fn constructor(
        &mut self,
        owner: EntityId,
        modifiers: &[Modifier],
        params: &[&str],
    ) -> MemberId {
        let name = self.graph.entity(owner).name.clone();
        self.member(owner, MemberKind::Constructor, &name, None, modifiers, params)
    }

    /// Adds a property with the given accessor shape.
    pub fn property(
        &mut self,
        owner: EntityId,
        name: &str,
        ty: &str,
        modifiers: &[Modifier],
        shape: PropertyShape,
    ) -> MemberId {
        let id = self.member(owner, MemberKind::Property, name, Some(ty), modifiers, &[]);
        self.graph.members[id.0].property = Some(shape);
        id
    }

    /// Records that a member's body creates the named type.
    pub fn creates(&mut self, member: MemberId, type_name: &str) -> &mut Self {
        self.graph.members[member.0].created_types.push(type_name.to_string());
        self
    }

    /// Records that a member's declaration references the named symbol.
    pub fn uses(&mut self, member: MemberId, name: &str) -> &mut Self {
        self.graph.members[member.0].used_names.push(name.to_string());
        self
    }

    /// Finishes the graph and derives its relations.
    pub fn build(mut self) -> SyntaxGraph {
        self.graph.build_relations();
        self.graph
    }

    /// Finishes the graph without building relations, for tests that drive
    /// `build_relations`/`reset_relations` themselves.
    pub fn build_unlinked(self) -> SyntaxGraph {
        self.graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_records_parameter_types() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Mailer", EntityKind::Class, &[Modifier::Public]);
        let send = builder.method(
            class,
            "send",
            "void",
            &[Modifier::Public],
            &["String", "List<String>"],
        );
        let graph = builder.build();

        let member = graph.member(send);
        assert_eq!(member.params.len(), 2);
        assert_eq!(member.params[0].base_name(), "String");
        assert_eq!(member.params[1].base_name(), "List");
    }

    #[test]
    fn auto_property_synthesizes_accessors_and_a_backing_field() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Settings", EntityKind::Class, &[Modifier::Public]);
        builder.property(
            class,
            "current",
            "Settings",
            &[Modifier::Public, Modifier::Static],
            PropertyShape {
                has_getter: true,
                has_setter: true,
                auto:       true,
            },
        );
        let graph = builder.build();

        let methods = graph.methods_of(class);
        assert_eq!(methods.len(), 2);
        let getter = methods.iter().find(|m| m.name == "current_get").unwrap();
        assert_eq!(getter.return_type.as_ref().unwrap().base_name(), "Settings");
        assert!(getter.params.is_empty());
        let setter = methods.iter().find(|m| m.name == "current_set").unwrap();
        assert_eq!(setter.return_type.as_ref().unwrap().base_name(), "void");
        assert_eq!(setter.params.len(), 1);

        // the backing field keeps non-access modifiers and is demoted to
        // private
        let fields = graph.fields_of(class);
        assert_eq!(fields.len(), 1);
        let backing = &fields[0];
        assert_eq!(backing.name, "current");
        assert!(backing.modifiers.contains(&Modifier::Private));
        assert!(backing.modifiers.contains(&Modifier::Static));
        assert!(!backing.modifiers.contains(&Modifier::Public));
        assert_eq!(backing.ty.base_name(), "Settings");
    }

    #[test]
    fn getter_only_property_synthesizes_one_accessor() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Config", EntityKind::Class, &[Modifier::Public]);
        builder.property(
            class,
            "instance",
            "Config",
            &[Modifier::Public, Modifier::Static],
            PropertyShape {
                has_getter: true,
                has_setter: false,
                auto:       false,
            },
        );
        let graph = builder.build();

        let methods = graph.methods_of(class);
        assert_eq!(methods.len(), 1);
        assert_eq!(methods[0].name, "instance_get");
        // non-auto properties expose no backing field
        assert!(graph.fields_of(class).is_empty());
    }
}
