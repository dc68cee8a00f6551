#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Built-in design pattern recognizers.
//!
//! Each recognizer is a declarative requirement tree over the relation
//! graph, anchored on a candidate entity. Participants beyond the anchor
//! (a product interface, a wrapped service, concrete subclasses) are found
//! through nested entity searches and wired together with labels.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    checks::{Check, CollectionKind, Priority, RelationTarget, TypeSource},
    graph::{Modifier, RelationType},
};

/// The design patterns the engine can recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Pattern {
    /// single globally accessible instance
    Singleton,
    /// deferred instantiation through an abstract creator
    FactoryMethod,
    /// subject notifying registered observers
    Observer,
    /// interchangeable algorithm behind an interface
    Strategy,
    /// incompatible interface wrapped behind an expected one
    Adapter,
    /// abstraction decoupled from its implementation hierarchy
    Bridge,
}

impl Pattern {
    /// Every supported pattern, in presentation order.
    pub const ALL: [Pattern; 6] = [
        Pattern::Singleton,
        Pattern::FactoryMethod,
        Pattern::Observer,
        Pattern::Strategy,
        Pattern::Adapter,
        Pattern::Bridge,
    ];
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Pattern::Singleton => "Singleton",
            Pattern::FactoryMethod => "Factory Method",
            Pattern::Observer => "Observer",
            Pattern::Strategy => "Strategy",
            Pattern::Adapter => "Adapter",
            Pattern::Bridge => "Bridge",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Pattern {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "singleton" => Ok(Pattern::Singleton),
            "factorymethod" => Ok(Pattern::FactoryMethod),
            "observer" => Ok(Pattern::Observer),
            "strategy" => Ok(Pattern::Strategy),
            "adapter" => Ok(Pattern::Adapter),
            "bridge" => Ok(Pattern::Bridge),
            other => Err(format!(
                "unknown pattern `{other}`; expected one of: singleton, \
                 factory-method, observer, strategy, adapter, bridge"
            )),
        }
    }
}

/// A pattern recognizer: one or more root requirement trees. Each root is a
/// structural variant of the pattern; the runner evaluates every root
/// against a candidate and keeps the best outcome.
pub struct Recognizer {
    /// the pattern this recognizer detects
    pub pattern: Pattern,
    /// root requirement trees, one per variant
    pub roots:   Vec<Check>,
}

impl Recognizer {
    /// The recognizer for a pattern.
    pub fn for_pattern(pattern: Pattern) -> Self {
        let roots = match pattern {
            Pattern::Singleton => vec![singleton()],
            Pattern::FactoryMethod => vec![factory_method()],
            Pattern::Observer => vec![observer()],
            Pattern::Strategy => vec![strategy()],
            Pattern::Adapter => vec![object_adapter(), class_adapter()],
            Pattern::Bridge => vec![bridge()],
        };
        Self { pattern, roots }
    }

    /// All built-in recognizers.
    pub fn all() -> Vec<Self> {
        Pattern::ALL.into_iter().map(Self::for_pattern).collect()
    }
}

/// Singleton: no public constructor, a private or protected one, a private
/// static field of the class's own type, and a public static accessor that
/// returns the instance.
fn singleton() -> Check {
    Check::class(Priority::High, CollectionKind::All, vec![
        // any public constructor disqualifies the candidate outright
        Check::not(Check::constructor(
            Priority::Knockout,
            CollectionKind::All,
            vec![Check::modifiers(Priority::Knockout, &[Modifier::Public])],
        )),
        Check::constructor(Priority::High, CollectionKind::All, vec![Check::any(
            Priority::High,
            vec![
                Check::modifiers(Priority::High, &[Modifier::Private]),
                Check::modifiers(Priority::High, &[Modifier::Protected]),
            ],
        )]),
        Check::field(Priority::High, CollectionKind::All, vec![
            Check::of_type(Priority::High, TypeSource::CurrentEntity),
            Check::modifiers(Priority::High, &[Modifier::Private, Modifier::Static]),
        ])
        .labeled("singleton-instance"),
        Check::method(Priority::High, CollectionKind::All, vec![
            Check::modifiers(Priority::High, &[Modifier::Public, Modifier::Static]),
            Check::of_type(Priority::High, TypeSource::CurrentEntity),
            Check::any(Priority::Mid, vec![
                Check::relation(
                    Priority::Mid,
                    RelationType::Creates,
                    RelationTarget::CurrentEntity,
                ),
                Check::relation(
                    Priority::Mid,
                    RelationType::Uses,
                    RelationTarget::Matched("singleton-instance"),
                ),
            ]),
        ])
        .labeled("get-instance"),
    ])
}

/// Factory Method: an abstract creator declaring an abstract factory
/// method, a product interface the creator depends on, concrete creators
/// extending the creator, and concrete products implementing the product.
fn factory_method() -> Check {
    Check::class(Priority::High, CollectionKind::All, vec![
        Check::modifiers(Priority::High, &[Modifier::Abstract]),
        Check::method(Priority::High, CollectionKind::All, vec![Check::modifiers(
            Priority::High,
            &[Modifier::Abstract],
        )])
        .labeled("factory-method"),
        Check::interface(Priority::High, CollectionKind::All, vec![Check::relation(
            Priority::High,
            RelationType::UsedBy,
            RelationTarget::CurrentEntity,
        )])
        .labeled("product"),
        Check::class(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::Extends,
                RelationTarget::CurrentEntity,
            ),
            Check::relation(Priority::Mid, RelationType::Creates, RelationTarget::Any),
        ])
        .labeled("concrete-creator"),
        Check::class(Priority::Mid, CollectionKind::All, vec![
            Check::relation(
                Priority::Mid,
                RelationType::Implements,
                RelationTarget::Matched("product"),
            ),
            Check::relation(
                Priority::Mid,
                RelationType::CreatedBy,
                RelationTarget::Matched("concrete-creator"),
            ),
        ]),
    ])
}

/// Observer: an observer interface with an update method, a subject holding
/// a collection of observers with registration and notification methods,
/// and concrete observers implementing the interface.
fn observer() -> Check {
    Check::interface(Priority::High, CollectionKind::All, vec![
        Check::method(Priority::High, CollectionKind::All, vec![]),
        Check::class(Priority::High, CollectionKind::All, vec![
            Check::field(Priority::High, CollectionKind::All, vec![Check::relation(
                Priority::High,
                RelationType::Uses,
                RelationTarget::CurrentEntity,
            )]),
            Check::method(Priority::Mid, CollectionKind::All, vec![Check::parameters(
                Priority::Mid,
                vec![TypeSource::CurrentEntity],
            )]),
            Check::method(Priority::Mid, CollectionKind::All, vec![Check::relation(
                Priority::Mid,
                RelationType::Uses,
                RelationTarget::CurrentEntity,
            )]),
        ])
        .labeled("subject"),
        Check::class(Priority::Mid, CollectionKind::All, vec![Check::relation(
            Priority::Mid,
            RelationType::Implements,
            RelationTarget::CurrentEntity,
        )]),
    ])
}

/// Strategy: a strategy interface with at least one method, a context that
/// stores a strategy and accepts one through a parameter, and concrete
/// strategies implementing the interface.
fn strategy() -> Check {
    Check::interface(Priority::High, CollectionKind::All, vec![
        Check::method(Priority::High, CollectionKind::All, vec![]),
        Check::class(Priority::High, CollectionKind::All, vec![
            Check::field(Priority::High, CollectionKind::All, vec![Check::relation(
                Priority::High,
                RelationType::Uses,
                RelationTarget::CurrentEntity,
            )]),
            Check::method(Priority::Mid, CollectionKind::All, vec![Check::parameters(
                Priority::Mid,
                vec![TypeSource::CurrentEntity],
            )]),
            // the context depends on the abstraction, not on any concrete
            // strategy it could instantiate itself
            Check::not(Check::relation(
                Priority::Low,
                RelationType::Creates,
                RelationTarget::CurrentEntity,
            )),
        ])
        .labeled("context"),
        Check::class(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::Implements,
                RelationTarget::CurrentEntity,
            ),
            Check::method(Priority::Mid, CollectionKind::All, vec![]),
        ]),
    ])
}

/// Object adapter: the adapter implements a target interface, wraps a
/// service the target knows nothing about, and delegates to it.
fn object_adapter() -> Check {
    Check::class(Priority::High, CollectionKind::All, vec![
        Check::interface(Priority::High, CollectionKind::All, vec![Check::relation(
            Priority::High,
            RelationType::ImplementedBy,
            RelationTarget::CurrentEntity,
        )])
        .labeled("target"),
        Check::class(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::UsedBy,
                RelationTarget::CurrentEntity,
            ),
            Check::not(Check::relation(
                Priority::Mid,
                RelationType::UsedBy,
                RelationTarget::Matched("target"),
            )),
        ])
        .labeled("adaptee"),
        Check::field(Priority::High, CollectionKind::All, vec![Check::relation(
            Priority::High,
            RelationType::Uses,
            RelationTarget::Matched("adaptee"),
        )]),
        Check::method(Priority::Mid, CollectionKind::All, vec![Check::relation(
            Priority::Mid,
            RelationType::Uses,
            RelationTarget::Matched("adaptee"),
        )]),
    ])
}

/// Class adapter: the adapter extends the service directly while
/// implementing the target interface.
fn class_adapter() -> Check {
    Check::class(Priority::High, CollectionKind::All, vec![
        Check::interface(Priority::High, CollectionKind::All, vec![Check::relation(
            Priority::High,
            RelationType::ImplementedBy,
            RelationTarget::CurrentEntity,
        )])
        .labeled("target"),
        Check::class(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::ExtendedBy,
                RelationTarget::CurrentEntity,
            ),
            Check::not(Check::relation(
                Priority::Mid,
                RelationType::UsedBy,
                RelationTarget::Matched("target"),
            )),
        ])
        .labeled("adaptee"),
        Check::method(Priority::Mid, CollectionKind::All, vec![Check::relation(
            Priority::Mid,
            RelationType::Uses,
            RelationTarget::Matched("adaptee"),
        )]),
    ])
}

/// Bridge: an abstraction holding a reference to an implementation
/// interface, delegating to it, with refined abstractions extending the
/// abstraction and concrete implementations implementing the interface.
fn bridge() -> Check {
    Check::class(Priority::High, CollectionKind::All, vec![
        Check::interface(Priority::High, CollectionKind::All, vec![
            Check::relation(
                Priority::High,
                RelationType::UsedBy,
                RelationTarget::CurrentEntity,
            ),
            Check::method(Priority::Mid, CollectionKind::All, vec![]),
        ])
        .labeled("implementation"),
        Check::field(Priority::High, CollectionKind::All, vec![Check::relation(
            Priority::High,
            RelationType::Uses,
            RelationTarget::Matched("implementation"),
        )])
        .labeled("implementation-field"),
        Check::method(Priority::Mid, CollectionKind::All, vec![Check::relation(
            Priority::Mid,
            RelationType::Uses,
            RelationTarget::Matched("implementation-field"),
        )]),
        Check::class(Priority::Mid, CollectionKind::All, vec![Check::relation(
            Priority::Mid,
            RelationType::Extends,
            RelationTarget::CurrentEntity,
        )]),
        Check::class(Priority::Mid, CollectionKind::All, vec![Check::relation(
            Priority::Mid,
            RelationType::Implements,
            RelationTarget::Matched("implementation"),
        )]),
    ])
}
