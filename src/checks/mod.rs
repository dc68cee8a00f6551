#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! The composable requirement-evaluation engine.
//!
//! A recognizer is a tree of [`Check`]s. Leaves test one fact about a graph
//! node (modifiers, type identity, parameter types, relation existence);
//! collection checks fan sub-trees out over the members of the entity under
//! examination, or search the whole entity universe. Evaluation produces a
//! [`CheckResult`] tree that the scoring model aggregates.
//!
//! Structural misuse of a tree (wrong node category, illegal nesting, a
//! missing type hook) is a bug in a recognizer definition and raises a
//! [`CheckError`]; requirements that are merely not met are ordinary failing
//! results.

/// Result tree, scoring, and feedback classification.
pub mod result;

use std::{collections::HashMap, fmt, sync::Arc};

use itertools::Itertools;

pub use result::{CheckResult, FeedbackKind, Priority, ResultKind, ThresholdError, Thresholds};

use crate::graph::{
    EntityId, EntityKind, Modifier, NodeId, RelationType, SyntaxGraph, TypeRef,
};

/// Identifies a check so later checks can reference what it matched.
pub type Label = &'static str;

/// Predicate invoked by an element check against one graph node.
pub type PredicateFn = Arc<dyn Fn(&SyntaxGraph, NodeId) -> bool + Send + Sync>;

/// How a collection check combines its sub-checks per examined node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionKind {
    /// every sub-check must pass
    All,
    /// at least one sub-check must pass
    Any,
}

/// Where a type check takes its expected type from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeSource {
    /// the entity currently under examination (self-referential patterns)
    CurrentEntity,
    /// an entity previously matched by the check carrying this label
    Matched(Label),
}

/// What a relation check requires the relation to point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationTarget {
    /// any node at all
    Any,
    /// the entity currently under examination
    CurrentEntity,
    /// a node previously matched by the check carrying this label
    Matched(Label),
}

/// Errors that indicate a bug in a recognizer definition. These fail fast
/// and never degrade into a low score.
#[derive(thiserror::Error, Debug)]
pub enum CheckError {
    /// A negation cannot be the root of a requirement tree.
    #[error("A Not check cannot be evaluated as the root of a requirement tree")]
    NotAsRoot,
    /// A check received a node of a category it cannot examine.
    #[error("{check} check expected {expected}, got {actual}")]
    IncorrectNodeType {
        /// description of the offending check
        check:    String,
        /// what the check needed
        expected: &'static str,
        /// what it received
        actual:   String,
    },
    /// Class/interface checks may not be scoped to a single member.
    #[error("{check} check cannot be nested inside a member-scoped check")]
    InvalidSubCheck {
        /// description of the offending check
        check: String,
    },
    /// A type check was placed where no parent supplies a subject type.
    #[error("Type check requires a parent collection that supplies a subject type")]
    MissingTypeHook,
    /// A label was referenced before the check carrying it was evaluated.
    #[error("Check labeled `{0}` has not yet been evaluated")]
    NotYetEvaluated(String),
}

/// Per-run evaluation state: which nodes every labeled check has matched so
/// far. Passed through evaluation instead of living on the checks, so a
/// recognizer definition can be shared across runs.
#[derive(Debug, Default)]
pub struct EvalState {
    /// matched nodes per label, in match order
    matched: HashMap<Label, Vec<NodeId>>,
}

impl EvalState {
    /// Creates empty state for one run.
    pub fn new() -> Self {
        Self::default()
    }

    /// The nodes the labeled check has matched so far; querying a label that
    /// has not been evaluated yet is an error.
    pub fn matched(&self, label: Label) -> Result<&[NodeId], CheckError> {
        self.matched
            .get(label)
            .map(Vec::as_slice)
            .ok_or_else(|| CheckError::NotYetEvaluated(label.to_string()))
    }

    /// Records a match under a label.
    fn record(&mut self, label: Label, node: NodeId) {
        let nodes = self.matched.entry(label).or_default();
        if !nodes.contains(&node) {
            nodes.push(node);
        }
    }

    /// Marks a label as evaluated even when nothing matched.
    fn touch(&mut self, label: Label) {
        self.matched.entry(label).or_default();
    }
}

/// The evaluation context: the graph plus the entity currently under
/// examination. Immutable, passed by value through each evaluation call.
#[derive(Clone, Copy)]
pub struct CheckCtx<'g> {
    /// the relation graph being evaluated against
    pub graph:          &'g SyntaxGraph,
    /// the candidate entity the recognizer is anchored on
    pub current_entity: EntityId,
}

/// The node a check is currently examining, together with the facts a
/// parent collection check supplies to its children (modifiers, the subject
/// type for type checks, the parameter list for parameter checks).
#[derive(Clone, Copy)]
struct Subject<'a> {
    /// the graph node under examination
    node:         NodeId,
    /// effective modifiers of the node
    modifiers:    &'a [Modifier],
    /// the type a contained type check compares against, when the parent
    /// supplies one (method return type, field type, property type)
    subject_type: Option<&'a TypeRef>,
    /// parameter types, for methods and constructors
    params:       Option<&'a [TypeRef]>,
    /// true once evaluation has descended into a member fan-out
    member_scope: bool,
}

/// One node of a requirement tree.
#[derive(Clone)]
pub struct Check {
    /// optional label for cross-references from later checks
    label:    Option<Label>,
    /// importance of this requirement
    priority: Priority,
    /// the actual check variant
    node:     CheckNode,
}

/// The closed set of check kinds. Dispatch is exhaustive; adding a kind is a
/// compile-time-checked exercise.
#[derive(Clone)]
enum CheckNode {
    /// pure predicate on one node
    Element {
        /// requirement description shown in feedback
        message:   String,
        /// score weight
        weight:    f32,
        /// the predicate
        predicate: PredicateFn,
    },
    /// node carries all required modifiers
    Modifier {
        /// modifiers that must all be present
        required: Vec<Modifier>,
    },
    /// node's subject type names a specific entity
    Type {
        /// where the expected entity comes from
        source: TypeSource,
    },
    /// parameter type sequence matches, in order; length mismatch fails
    Parameter {
        /// expected types per position
        types: Vec<TypeSource>,
    },
    /// a relation of the given type exists from the current node
    Relation {
        /// required relation type
        ty:     RelationType,
        /// required relation target
        target: RelationTarget,
    },
    /// inverts the wrapped check's outcome
    Not(Box<Check>),
    /// generic combinator: at least one child passes
    AnyGroup(Vec<Check>),
    /// generic combinator: every child passes
    AllGroup(Vec<Check>),
    /// searches the entity universe for a class satisfying the sub-checks
    Class {
        /// how sub-checks combine per candidate
        collection: CollectionKind,
        /// requirements on the candidate class
        checks:     Vec<Check>,
    },
    /// searches the entity universe for an interface satisfying the
    /// sub-checks
    Interface {
        /// how sub-checks combine per candidate
        collection: CollectionKind,
        /// requirements on the candidate interface
        checks:     Vec<Check>,
    },
    /// fans out over the methods of the examined entity (including
    /// synthesized property accessors)
    Method {
        /// how sub-checks combine per method
        collection: CollectionKind,
        /// requirements on a method
        checks:     Vec<Check>,
    },
    /// fans out over the fields of the examined entity (including
    /// synthesized auto-property backing fields)
    Field {
        /// how sub-checks combine per field
        collection: CollectionKind,
        /// requirements on a field
        checks:     Vec<Check>,
    },
    /// fans out over the constructors of the examined entity, viewed as
    /// methods returning the owning entity
    Constructor {
        /// how sub-checks combine per constructor
        collection: CollectionKind,
        /// requirements on a constructor
        checks:     Vec<Check>,
    },
    /// fans out over the properties of the examined entity
    Property {
        /// how sub-checks combine per property
        collection: CollectionKind,
        /// requirements on a property
        checks:     Vec<Check>,
    },
}

impl fmt::Debug for Check {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Check")
            .field("label", &self.label)
            .field("priority", &self.priority)
            .field("message", &self.message())
            .finish()
    }
}

impl Check {
    /// A predicate check with the default weight.
    pub fn element(
        message: impl Into<String>,
        priority: Priority,
        predicate: impl Fn(&SyntaxGraph, NodeId) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::element_weighted(message, priority, 1.0, predicate)
    }

    /// A predicate check with an explicit weight.
    pub fn element_weighted(
        message: impl Into<String>,
        priority: Priority,
        weight: f32,
        predicate: impl Fn(&SyntaxGraph, NodeId) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self::new(CheckNode::Element {
            message: message.into(),
            weight,
            predicate: Arc::new(predicate),
        }, priority)
    }

    /// A modifier-presence check; all listed modifiers are required.
    pub fn modifiers(priority: Priority, required: &[Modifier]) -> Self {
        Self::new(
            CheckNode::Modifier {
                required: required.to_vec(),
            },
            priority,
        )
    }

    /// A type-identity check against the parent-supplied subject type.
    pub fn of_type(priority: Priority, source: TypeSource) -> Self {
        Self::new(CheckNode::Type { source }, priority)
    }

    /// A parameter-sequence check.
    pub fn parameters(priority: Priority, types: Vec<TypeSource>) -> Self {
        Self::new(CheckNode::Parameter { types }, priority)
    }

    /// A relation-existence check.
    pub fn relation(priority: Priority, ty: RelationType, target: RelationTarget) -> Self {
        Self::new(CheckNode::Relation { ty, target }, priority)
    }

    /// Inverts a check. Never legal as the root of a tree.
    pub fn not(inner: Check) -> Self {
        let priority = inner.priority;
        Self::new(CheckNode::Not(Box::new(inner)), priority)
    }

    /// At least one child must pass.
    pub fn any(priority: Priority, children: Vec<Check>) -> Self {
        Self::new(CheckNode::AnyGroup(children), priority)
    }

    /// Every child must pass.
    pub fn all(priority: Priority, children: Vec<Check>) -> Self {
        Self::new(CheckNode::AllGroup(children), priority)
    }

    /// A class search/anchor check.
    pub fn class(priority: Priority, collection: CollectionKind, checks: Vec<Check>) -> Self {
        Self::new(CheckNode::Class { collection, checks }, priority)
    }

    /// An interface search/anchor check.
    pub fn interface(priority: Priority, collection: CollectionKind, checks: Vec<Check>) -> Self {
        Self::new(CheckNode::Interface { collection, checks }, priority)
    }

    /// A method fan-out check.
    pub fn method(priority: Priority, collection: CollectionKind, checks: Vec<Check>) -> Self {
        Self::new(CheckNode::Method { collection, checks }, priority)
    }

    /// A field fan-out check.
    pub fn field(priority: Priority, collection: CollectionKind, checks: Vec<Check>) -> Self {
        Self::new(CheckNode::Field { collection, checks }, priority)
    }

    /// A constructor fan-out check.
    pub fn constructor(priority: Priority, collection: CollectionKind, checks: Vec<Check>) -> Self {
        Self::new(CheckNode::Constructor { collection, checks }, priority)
    }

    /// A property fan-out check.
    pub fn property(priority: Priority, collection: CollectionKind, checks: Vec<Check>) -> Self {
        Self::new(CheckNode::Property { collection, checks }, priority)
    }

    /// Attaches a label so later checks can reference what this one matched.
    pub fn labeled(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    /// Internal constructor.
    fn new(node: CheckNode, priority: Priority) -> Self {
        Self {
            label: None,
            priority,
            node,
        }
    }

    /// Number of leaf requirements transitively reachable from this check.
    /// Used to normalize scores by structural complexity.
    pub fn dependency_count(&self) -> usize {
        match &self.node {
            CheckNode::Element { .. }
            | CheckNode::Modifier { .. }
            | CheckNode::Type { .. }
            | CheckNode::Relation { .. } => 1,
            CheckNode::Parameter { types } => types.len(),
            CheckNode::Not(inner) => inner.dependency_count(),
            CheckNode::AnyGroup(checks)
            | CheckNode::AllGroup(checks)
            | CheckNode::Class { checks, .. }
            | CheckNode::Interface { checks, .. }
            | CheckNode::Method { checks, .. }
            | CheckNode::Field { checks, .. }
            | CheckNode::Constructor { checks, .. }
            | CheckNode::Property { checks, .. } => {
                checks.iter().map(Check::dependency_count).sum()
            }
        }
    }

    /// A short requirement description, used in result messages.
    pub fn message(&self) -> String {
        match &self.node {
            CheckNode::Element { message, .. } => message.clone(),
            CheckNode::Modifier { required } => {
                format!("has modifiers: {}", required.iter().join(", "))
            }
            CheckNode::Type { source } => match source {
                TypeSource::CurrentEntity => "type is the examined entity".to_string(),
                TypeSource::Matched(label) => format!("type is the entity matched by `{label}`"),
            },
            CheckNode::Parameter { types } => {
                format!("parameter types match ({} expected)", types.len())
            }
            CheckNode::Relation { ty, target } => {
                let target = match target {
                    RelationTarget::Any => "any node".to_string(),
                    RelationTarget::CurrentEntity => "the examined entity".to_string(),
                    RelationTarget::Matched(label) => {
                        format!("the node matched by `{label}`")
                    }
                };
                format!("has {ty:?} relation to {target}")
            }
            CheckNode::Not(inner) => format!("not: {}", inner.message()),
            CheckNode::AnyGroup(_) => "any of".to_string(),
            CheckNode::AllGroup(_) => "all of".to_string(),
            CheckNode::Class { .. } => "a class exists where".to_string(),
            CheckNode::Interface { .. } => "an interface exists where".to_string(),
            CheckNode::Method { .. } => "has a method where".to_string(),
            CheckNode::Field { .. } => "has a field where".to_string(),
            CheckNode::Constructor { .. } => "has a constructor where".to_string(),
            CheckNode::Property { .. } => "has a property where".to_string(),
        }
    }

    /// The entity kind this check anchors on when used as a root, or `None`
    /// when it applies to entities of any kind.
    pub fn anchor_kind(&self) -> Option<EntityKind> {
        match &self.node {
            CheckNode::Class { .. } => Some(EntityKind::Class),
            CheckNode::Interface { .. } => Some(EntityKind::Interface),
            _ => None,
        }
    }

    /// Evaluates this tree as a root against a graph node.
    pub fn evaluate(
        &self,
        ctx: &CheckCtx<'_>,
        state: &mut EvalState,
        node: NodeId,
    ) -> Result<CheckResult, CheckError> {
        if matches!(self.node, CheckNode::Not(_)) {
            return Err(CheckError::NotAsRoot);
        }

        match (&self.node, node) {
            // Root class/interface checks anchor on the given entity rather
            // than searching; the runner drives the universe iteration.
            (CheckNode::Class { collection, checks }, NodeId::Entity(id)) => {
                if ctx.graph.entity(id).kind != EntityKind::Class {
                    return Err(CheckError::IncorrectNodeType {
                        check:    self.message(),
                        expected: "a class entity",
                        actual:   format!("interface `{}`", ctx.graph.entity(id).name),
                    });
                }
                self.eval_anchored_entity(ctx, state, id, *collection, checks)
            }
            (CheckNode::Interface { collection, checks }, NodeId::Entity(id)) => {
                if ctx.graph.entity(id).kind != EntityKind::Interface {
                    return Err(CheckError::IncorrectNodeType {
                        check:    self.message(),
                        expected: "an interface entity",
                        actual:   format!("class `{}`", ctx.graph.entity(id).name),
                    });
                }
                self.eval_anchored_entity(ctx, state, id, *collection, checks)
            }
            (CheckNode::Class { .. } | CheckNode::Interface { .. }, NodeId::Member(id)) => {
                Err(CheckError::IncorrectNodeType {
                    check:    self.message(),
                    expected: "an entity",
                    actual:   format!("member `{}`", ctx.graph.member(id).name),
                })
            }
            _ => {
                let subject = entity_or_member_subject(ctx.graph, node);
                self.eval(ctx, state, &subject)
            }
        }
    }

    /// Evaluates entity-scoped sub-checks against one concrete entity.
    fn eval_anchored_entity(
        &self,
        ctx: &CheckCtx<'_>,
        state: &mut EvalState,
        id: EntityId,
        collection: CollectionKind,
        checks: &[Check],
    ) -> Result<CheckResult, CheckError> {
        let entity = ctx.graph.entity(id);
        let subject = Subject {
            node:         NodeId::Entity(id),
            modifiers:    &entity.modifiers,
            subject_type: None,
            params:       None,
            member_scope: false,
        };
        let mut children = Vec::with_capacity(checks.len());
        for check in checks {
            children.push(check.eval(ctx, state, &subject)?);
        }
        let passed = combine(collection, &children);
        if passed {
            if let Some(label) = self.label {
                state.record(label, subject.node);
            }
        } else if let Some(label) = self.label {
            state.touch(label);
        }
        Ok(CheckResult::collection(
            format!("{} `{}`", self.message(), entity.name),
            self.priority,
            passed,
            Some(subject.node),
            children,
        ))
    }

    /// Evaluates this check against an already-scoped subject.
    fn eval(
        &self,
        ctx: &CheckCtx<'_>,
        state: &mut EvalState,
        subject: &Subject<'_>,
    ) -> Result<CheckResult, CheckError> {
        match &self.node {
            CheckNode::Element {
                message,
                weight,
                predicate,
            } => {
                let passed = predicate(ctx.graph, subject.node);
                self.finish_leaf(state, subject, message.clone(), passed, *weight)
            }
            CheckNode::Modifier { required } => {
                let passed = required.iter().all(|m| subject.modifiers.contains(m));
                self.finish_leaf(state, subject, self.message(), passed, 1.0)
            }
            CheckNode::Type { source } => {
                let Some(subject_type) = subject.subject_type else {
                    return Err(CheckError::MissingTypeHook);
                };
                let passed = self.type_matches(ctx, state, subject_type, *source)?;
                self.finish_leaf(state, subject, self.message(), passed, 1.0)
            }
            CheckNode::Parameter { types } => {
                let Some(params) = subject.params else {
                    return Err(CheckError::IncorrectNodeType {
                        check:    self.message(),
                        expected: "a method or constructor",
                        actual:   format!("`{}`", ctx.graph.node_name(subject.node)),
                    });
                };
                let length_ok = params.len() == types.len();
                let mut children = Vec::with_capacity(types.len());
                for (i, source) in types.iter().enumerate() {
                    let passed = length_ok
                        && self.type_matches(ctx, state, &params[i], *source)?;
                    children.push(CheckResult::leaf(
                        format!("parameter {} matches expected type", i + 1),
                        self.priority,
                        passed,
                        1.0,
                        Some(subject.node),
                    ));
                }
                let passed = length_ok && children.iter().all(|c| c.passed);
                if passed {
                    if let Some(label) = self.label {
                        state.record(label, subject.node);
                    }
                }
                Ok(CheckResult::collection(
                    self.message(),
                    self.priority,
                    passed,
                    Some(subject.node),
                    children,
                ))
            }
            CheckNode::Relation { ty, target } => {
                let relations = ctx.graph.relations();
                let passed = match target {
                    RelationTarget::Any => relations.has_any(subject.node, *ty),
                    RelationTarget::CurrentEntity => relations.contains(
                        subject.node,
                        *ty,
                        NodeId::Entity(ctx.current_entity),
                    ),
                    RelationTarget::Matched(label) => {
                        let matched = state.matched(label)?.to_vec();
                        matched
                            .iter()
                            .any(|&t| relations.contains(subject.node, *ty, t))
                    }
                };
                self.finish_leaf(state, subject, self.message(), passed, 1.0)
            }
            CheckNode::Not(inner) => {
                let inner_result = inner.eval(ctx, state, subject)?;
                let result =
                    CheckResult::negation(self.message(), self.priority, 1.0, inner_result);
                if result.passed {
                    if let Some(label) = self.label {
                        state.record(label, subject.node);
                    }
                }
                Ok(result)
            }
            CheckNode::AnyGroup(checks) => {
                let mut children = Vec::with_capacity(checks.len());
                for check in checks {
                    children.push(check.eval(ctx, state, subject)?);
                }
                let passed = combine(CollectionKind::Any, &children);
                if passed {
                    if let Some(label) = self.label {
                        state.record(label, subject.node);
                    }
                }
                // one satisfied alternative is a full pass; the rest must
                // not dilute the score
                Ok(CheckResult::any_of(
                    self.message(),
                    self.priority,
                    passed,
                    Some(subject.node),
                    children,
                ))
            }
            CheckNode::AllGroup(checks) => {
                let mut children = Vec::with_capacity(checks.len());
                for check in checks {
                    children.push(check.eval(ctx, state, subject)?);
                }
                let passed = combine(CollectionKind::All, &children);
                if passed {
                    if let Some(label) = self.label {
                        state.record(label, subject.node);
                    }
                }
                Ok(CheckResult::collection(
                    self.message(),
                    self.priority,
                    passed,
                    Some(subject.node),
                    children,
                ))
            }
            CheckNode::Class { collection, checks } => {
                self.eval_entity_search(ctx, state, subject, EntityKind::Class, *collection, checks)
            }
            CheckNode::Interface { collection, checks } => self.eval_entity_search(
                ctx,
                state,
                subject,
                EntityKind::Interface,
                *collection,
                checks,
            ),
            CheckNode::Method { collection, checks } => {
                let id = self.expect_entity(ctx, subject)?;
                let methods = ctx.graph.methods_of(id);
                let facts: Vec<(String, Subject<'_>)> = methods
                    .iter()
                    .map(|m| {
                        (m.name.clone(), Subject {
                            node:         m.node,
                            modifiers:    &m.modifiers,
                            subject_type: m.return_type.as_ref(),
                            params:       Some(&m.params),
                            member_scope: true,
                        })
                    })
                    .collect();
                self.eval_fan_out(ctx, state, "method", &facts, *collection, checks)
            }
            CheckNode::Field { collection, checks } => {
                let id = self.expect_entity(ctx, subject)?;
                let fields = ctx.graph.fields_of(id);
                let facts: Vec<(String, Subject<'_>)> = fields
                    .iter()
                    .map(|f| {
                        (f.name.clone(), Subject {
                            node:         f.node,
                            modifiers:    &f.modifiers,
                            subject_type: Some(&f.ty),
                            params:       None,
                            member_scope: true,
                        })
                    })
                    .collect();
                self.eval_fan_out(ctx, state, "field", &facts, *collection, checks)
            }
            CheckNode::Constructor { collection, checks } => {
                let id = self.expect_entity(ctx, subject)?;
                let ctors: Vec<_> = ctx
                    .graph
                    .constructors_of(id)
                    .into_iter()
                    .map(|c| ctx.graph.constructor_as_method(c))
                    .collect();
                let facts: Vec<(String, Subject<'_>)> = ctors
                    .iter()
                    .map(|m| {
                        (m.name.clone(), Subject {
                            node:         m.node,
                            modifiers:    &m.modifiers,
                            subject_type: m.return_type.as_ref(),
                            params:       Some(&m.params),
                            member_scope: true,
                        })
                    })
                    .collect();
                self.eval_fan_out(ctx, state, "constructor", &facts, *collection, checks)
            }
            CheckNode::Property { collection, checks } => {
                let id = self.expect_entity(ctx, subject)?;
                let properties = ctx.graph.properties_of(id);
                let members: Vec<_> =
                    properties.iter().map(|&p| ctx.graph.member(p)).collect();
                let facts: Vec<(String, Subject<'_>)> = properties
                    .iter()
                    .zip(&members)
                    .map(|(&p, member)| {
                        (member.name.clone(), Subject {
                            node:         NodeId::Member(p),
                            modifiers:    &member.modifiers,
                            subject_type: member.ty.as_ref(),
                            params:       None,
                            member_scope: true,
                        })
                    })
                    .collect();
                self.eval_fan_out(ctx, state, "property", &facts, *collection, checks)
            }
        }
    }

    /// Finishes a leaf evaluation: records the label on a pass and builds
    /// the result.
    fn finish_leaf(
        &self,
        state: &mut EvalState,
        subject: &Subject<'_>,
        message: String,
        passed: bool,
        weight: f32,
    ) -> Result<CheckResult, CheckError> {
        if passed {
            if let Some(label) = self.label {
                state.record(label, subject.node);
            }
        } else if let Some(label) = self.label {
            state.touch(label);
        }
        Ok(CheckResult::leaf(message, self.priority, passed, weight, Some(subject.node)))
    }

    /// Whether `subject_type` names the entity the type source points at.
    fn type_matches(
        &self,
        ctx: &CheckCtx<'_>,
        state: &EvalState,
        subject_type: &TypeRef,
        source: TypeSource,
    ) -> Result<bool, CheckError> {
        let expected: Vec<EntityId> = match source {
            TypeSource::CurrentEntity => vec![ctx.current_entity],
            TypeSource::Matched(label) => state
                .matched(label)?
                .iter()
                .filter_map(|node| match node {
                    NodeId::Entity(id) => Some(*id),
                    NodeId::Member(_) => None,
                })
                .collect(),
        };
        Ok(expected
            .iter()
            .any(|&id| subject_type.base_name() == ctx.graph.entity(id).name))
    }

    /// The entity id behind a subject, or the incorrect-node-type error.
    fn expect_entity(
        &self,
        ctx: &CheckCtx<'_>,
        subject: &Subject<'_>,
    ) -> Result<EntityId, CheckError> {
        match subject.node {
            NodeId::Entity(id) => Ok(id),
            NodeId::Member(id) => Err(CheckError::IncorrectNodeType {
                check:    self.message(),
                expected: "an entity",
                actual:   format!("member `{}`", ctx.graph.member(id).name),
            }),
        }
    }

    /// Global search over the universe of entities of one kind. Illegal in
    /// member scope; the wrapping combination is fixed to Any.
    fn eval_entity_search(
        &self,
        ctx: &CheckCtx<'_>,
        state: &mut EvalState,
        subject: &Subject<'_>,
        kind: EntityKind,
        collection: CollectionKind,
        checks: &[Check],
    ) -> Result<CheckResult, CheckError> {
        if subject.member_scope {
            return Err(CheckError::InvalidSubCheck {
                check: self.message(),
            });
        }

        let candidates: Vec<EntityId> = ctx
            .graph
            .entities()
            .filter(|(_, e)| e.kind == kind)
            .map(|(id, _)| id)
            .collect();

        // Without sub-checks this is a bare existence requirement and
        // scores as a single leaf.
        if checks.is_empty() {
            let passed = !candidates.is_empty();
            if passed {
                if let Some(label) = self.label {
                    for &id in &candidates {
                        state.record(label, NodeId::Entity(id));
                    }
                }
            } else {
                state_touch(self.label, state);
            }
            return Ok(CheckResult::leaf(self.message(), self.priority, passed, 1.0, None));
        }

        if candidates.is_empty() {
            state_touch(self.label, state);
            return Ok(CheckResult::any_of(
                self.message(),
                self.priority,
                false,
                None,
                vec![self.unmatched_children(checks)],
            ));
        }

        let mut per_candidate = Vec::with_capacity(candidates.len());
        let mut any_passed = false;
        for id in candidates {
            let result = self.eval_anchored_entity(ctx, state, id, collection, checks)?;
            any_passed |= result.passed;
            per_candidate.push(result);
        }

        if !any_passed {
            state_touch(self.label, state);
        }
        Ok(CheckResult::any_of(
            self.message(),
            self.priority,
            any_passed,
            None,
            per_candidate,
        ))
    }

    /// Fans sub-checks out over member-shaped subjects. The wrapping layer
    /// always combines per-member results under Any and always evaluates
    /// every member, so feedback stays complete.
    fn eval_fan_out(
        &self,
        ctx: &CheckCtx<'_>,
        state: &mut EvalState,
        what: &str,
        facts: &[(String, Subject<'_>)],
        collection: CollectionKind,
        checks: &[Check],
    ) -> Result<CheckResult, CheckError> {
        // Without sub-checks this is a bare existence requirement and
        // scores as a single leaf.
        if checks.is_empty() {
            let passed = !facts.is_empty();
            if passed {
                if let Some(label) = self.label {
                    for (_, member_subject) in facts {
                        state.record(label, member_subject.node);
                    }
                }
            } else {
                state_touch(self.label, state);
            }
            let matched = facts.first().map(|(_, s)| s.node);
            return Ok(CheckResult::leaf(self.message(), self.priority, passed, 1.0, matched));
        }

        if facts.is_empty() {
            state_touch(self.label, state);
            return Ok(CheckResult::any_of(
                self.message(),
                self.priority,
                false,
                None,
                vec![self.unmatched_children(checks)],
            ));
        }

        let mut per_member = Vec::with_capacity(facts.len());
        let mut any_passed = false;

        for (name, member_subject) in facts {
            let mut children = Vec::with_capacity(checks.len());
            for check in checks {
                children.push(check.eval(ctx, state, member_subject)?);
            }
            let passed = combine(collection, &children);
            if passed {
                any_passed = true;
                if let Some(label) = self.label {
                    state.record(label, member_subject.node);
                }
            }
            per_member.push(CheckResult::collection(
                format!("{what} `{name}`"),
                self.priority,
                passed,
                Some(member_subject.node),
                children,
            ));
        }

        if !any_passed {
            state_touch(self.label, state);
        }
        Ok(CheckResult::any_of(
            self.message(),
            self.priority,
            any_passed,
            None,
            per_member,
        ))
    }

    /// A failed result tree mirroring the sub-checks, used when a fan-out
    /// has no members to examine so score denominators stay comparable.
    fn unmatched_children(&self, checks: &[Check]) -> CheckResult {
        CheckResult::collection(
            format!("{} (nothing to examine)", self.message()),
            self.priority,
            false,
            None,
            checks.iter().map(Check::unmatched_result).collect(),
        )
    }

    /// A failed result for this check alone, without a node.
    fn unmatched_result(&self) -> CheckResult {
        match &self.node {
            CheckNode::Element { message, weight, .. } => {
                CheckResult::leaf(message.clone(), self.priority, false, *weight, None)
            }
            CheckNode::Modifier { .. }
            | CheckNode::Type { .. }
            | CheckNode::Relation { .. } => {
                CheckResult::leaf(self.message(), self.priority, false, 1.0, None)
            }
            CheckNode::Parameter { types } => CheckResult::collection(
                self.message(),
                self.priority,
                false,
                None,
                types
                    .iter()
                    .enumerate()
                    .map(|(i, _)| {
                        CheckResult::leaf(
                            format!("parameter {} matches expected type", i + 1),
                            self.priority,
                            false,
                            1.0,
                            None,
                        )
                    })
                    .collect(),
            ),
            CheckNode::Not(inner) => CheckResult::negation(
                self.message(),
                self.priority,
                1.0,
                inner.unmatched_result(),
            ),
            CheckNode::AnyGroup(checks) => CheckResult::any_of(
                self.message(),
                self.priority,
                false,
                None,
                checks.iter().map(Check::unmatched_result).collect(),
            ),
            CheckNode::AllGroup(checks)
            | CheckNode::Class { checks, .. }
            | CheckNode::Interface { checks, .. }
            | CheckNode::Method { checks, .. }
            | CheckNode::Field { checks, .. }
            | CheckNode::Constructor { checks, .. }
            | CheckNode::Property { checks, .. } => CheckResult::collection(
                self.message(),
                self.priority,
                false,
                None,
                checks.iter().map(Check::unmatched_result).collect(),
            ),
        }
    }
}

/// Builds a subject for a bare graph node, used at the evaluation root.
fn entity_or_member_subject<'g>(graph: &'g SyntaxGraph, node: NodeId) -> Subject<'g> {
    match node {
        NodeId::Entity(id) => Subject {
            node,
            modifiers: &graph.entity(id).modifiers,
            subject_type: None,
            params: None,
            member_scope: false,
        },
        NodeId::Member(id) => {
            let member = graph.member(id);
            Subject {
                node,
                modifiers: &member.modifiers,
                subject_type: member.ty.as_ref(),
                params: Some(&member.params),
                member_scope: true,
            }
        }
    }
}

/// Marks an optional label as evaluated.
fn state_touch(label: Option<Label>, state: &mut EvalState) {
    if let Some(label) = label {
        state.touch(label);
    }
}

/// Combines child outcomes under a collection kind.
fn combine(kind: CollectionKind, children: &[CheckResult]) -> bool {
    match kind {
        CollectionKind::All => children.iter().all(|c| c.passed),
        CollectionKind::Any => children.iter().any(|c| c.passed),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{GraphBuilder, PropertyShape};

    fn singleton_like() -> (SyntaxGraph, EntityId) {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Registry", EntityKind::Class, &[Modifier::Public]);
        builder.constructor(class, &[Modifier::Private], &[]);
        let field = builder.field(
            class,
            "instance",
            "Registry",
            &[Modifier::Private, Modifier::Static],
        );
        let getter = builder.method(
            class,
            "getInstance",
            "Registry",
            &[Modifier::Public, Modifier::Static],
            &[],
        );
        builder.method(class, "size", "int", &[Modifier::Public], &[]);
        builder.method(class, "clear", "void", &[Modifier::Public], &[]);
        builder.uses(getter, "instance");
        builder.creates(getter, "Registry");
        (builder.build(), class)
    }

    #[test]
    fn element_check_runs_its_predicate_per_member() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::method(Priority::Mid, CollectionKind::All, vec![Check::element(
            "method name starts with `get`",
            Priority::Mid,
            |g, node| g.node_name(node).starts_with("get"),
        )]);

        let result = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap();
        assert!(result.passed);
    }

    #[test]
    fn fan_out_passes_when_one_member_satisfies() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::method(Priority::High, CollectionKind::All, vec![
            Check::modifiers(Priority::High, &[Modifier::Static]),
            Check::of_type(Priority::High, TypeSource::CurrentEntity),
        ]);

        let result = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.score(), 100);
        // every member's outcome is retained, one of three passing
        assert_eq!(result.children.len(), 3);
        assert_eq!(result.children.iter().filter(|c| c.passed).count(), 1);
    }

    #[test]
    fn labeled_field_feeds_relation_check() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let mut state = EvalState::new();

        let field_check = Check::field(Priority::High, CollectionKind::All, vec![
            Check::of_type(Priority::High, TypeSource::CurrentEntity),
        ])
        .labeled("self-typed-field");
        assert!(
            field_check
                .evaluate(&ctx, &mut state, NodeId::Entity(class))
                .unwrap()
                .passed
        );

        let method_check = Check::method(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::Uses,
                RelationTarget::Matched("self-typed-field"),
            ),
        ]);
        assert!(
            method_check
                .evaluate(&ctx, &mut state, NodeId::Entity(class))
                .unwrap()
                .passed
        );
    }

    #[test]
    fn forward_label_reference_is_an_error() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::method(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::Uses,
                RelationTarget::Matched("never-evaluated"),
            ),
        ]);

        let err = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap_err();
        assert!(matches!(err, CheckError::NotYetEvaluated(_)));
    }

    #[test]
    fn negation_is_rejected_at_the_root() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::not(Check::modifiers(Priority::High, &[Modifier::Public]));

        let err = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap_err();
        assert!(matches!(err, CheckError::NotAsRoot));
    }

    #[test]
    fn type_check_needs_a_parent_hook() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::class(Priority::High, CollectionKind::All, vec![Check::of_type(
            Priority::High,
            TypeSource::CurrentEntity,
        )]);

        let err = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap_err();
        assert!(matches!(err, CheckError::MissingTypeHook));
    }

    #[test]
    fn entity_search_is_illegal_in_member_scope() {
        let (graph, class) = singleton_like();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::method(Priority::High, CollectionKind::All, vec![Check::class(
            Priority::High,
            CollectionKind::All,
            vec![],
        )]);

        let err = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap_err();
        assert!(matches!(err, CheckError::InvalidSubCheck { .. }));
    }

    #[test]
    fn empty_fan_out_fails_with_nonzero_denominator() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Bare", EntityKind::Class, &[Modifier::Public]);
        let graph = builder.build();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::method(Priority::High, CollectionKind::All, vec![
            Check::modifiers(Priority::High, &[Modifier::Static]),
        ]);

        let result = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap();
        assert!(!result.passed);
        assert!(result.possible() > 0.0);
        assert_eq!(result.score(), 0);
    }

    #[test]
    fn property_fan_out_examines_declared_properties() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Registry", EntityKind::Class, &[Modifier::Public]);
        builder.property(
            class,
            "instance",
            "Registry",
            &[Modifier::Private, Modifier::Static],
            PropertyShape {
                has_getter: true,
                has_setter: false,
                auto:       false,
            },
        );
        let graph = builder.build();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: class,
        };
        let check = Check::property(Priority::High, CollectionKind::All, vec![
            Check::of_type(Priority::High, TypeSource::CurrentEntity),
            Check::modifiers(Priority::High, &[Modifier::Static]),
        ]);

        let result = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(class))
            .unwrap();
        assert!(result.passed);
        assert_eq!(result.score(), 100);
    }

    #[test]
    fn dependency_count_sums_leaves() {
        let check = Check::class(Priority::High, CollectionKind::All, vec![
            Check::modifiers(Priority::High, &[Modifier::Public]),
            Check::method(Priority::Mid, CollectionKind::All, vec![
                Check::of_type(Priority::Mid, TypeSource::CurrentEntity),
                Check::parameters(Priority::Low, vec![
                    TypeSource::CurrentEntity,
                    TypeSource::CurrentEntity,
                ]),
            ]),
        ]);
        assert_eq!(check.dependency_count(), 4);
    }

    #[test]
    fn wrong_entity_kind_at_root_is_an_error() {
        let mut builder = GraphBuilder::new();
        let iface = builder.entity("Shape", EntityKind::Interface, &[Modifier::Public]);
        let graph = builder.build();
        let ctx = CheckCtx {
            graph: &graph,
            current_entity: iface,
        };
        let check = Check::class(Priority::High, CollectionKind::All, vec![]);

        let err = check
            .evaluate(&ctx, &mut EvalState::new(), NodeId::Entity(iface))
            .unwrap_err();
        assert!(matches!(err, CheckError::IncorrectNodeType { .. }));
    }
}
