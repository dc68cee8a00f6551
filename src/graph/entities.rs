#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::fmt;

use serde::{Deserialize, Serialize};

/// Modifiers a Java declaration can carry. Unknown modifier tokens (and
/// annotations) are skipped during parsing rather than failing the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Modifier {
    /// `public`
    Public,
    /// `private`
    Private,
    /// `protected`
    Protected,
    /// `static`
    Static,
    /// `abstract`
    Abstract,
    /// `final`
    Final,
    /// `default` (interface methods)
    Default,
    /// `synchronized`
    Synchronized,
    /// `native`
    Native,
    /// `transient`
    Transient,
    /// `volatile`
    Volatile,
}

impl Modifier {
    /// Parses a single modifier token; returns `None` for tokens the model
    /// does not track (annotations, `strictfp`, ...).
    pub fn parse(token: &str) -> Option<Self> {
        match token {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            "protected" => Some(Self::Protected),
            "static" => Some(Self::Static),
            "abstract" => Some(Self::Abstract),
            "final" => Some(Self::Final),
            "default" => Some(Self::Default),
            "synchronized" => Some(Self::Synchronized),
            "native" => Some(Self::Native),
            "transient" => Some(Self::Transient),
            "volatile" => Some(Self::Volatile),
            _ => None,
        }
    }

    /// Parses a whole modifier list as captured from source, e.g.
    /// `"@Override public static"`.
    pub fn parse_list(text: &str) -> Vec<Self> {
        text.split_whitespace()
            .filter(|t| !t.starts_with('@'))
            .filter_map(Self::parse)
            .collect()
    }

    /// True when this is an access modifier.
    pub fn is_access(self) -> bool {
        matches!(self, Self::Public | Self::Private | Self::Protected)
    }
}

impl fmt::Display for Modifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Public => "public",
            Self::Private => "private",
            Self::Protected => "protected",
            Self::Static => "static",
            Self::Abstract => "abstract",
            Self::Final => "final",
            Self::Default => "default",
            Self::Synchronized => "synchronized",
            Self::Native => "native",
            Self::Transient => "transient",
            Self::Volatile => "volatile",
        };
        write!(f, "{s}")
    }
}

/// Kind of a parsed entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    /// A class declaration
    Class,
    /// An interface declaration
    Interface,
}

/// A textual type reference as it appears in source. Unresolved until the
/// graph links it against the analyzed entity set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef(String);

impl TypeRef {
    /// Creates a type reference from source text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into().trim().to_string())
    }

    /// The reference exactly as written.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The outermost simple name: strips generic arguments, array brackets,
    /// and package qualifiers. `java.util.List<Observer>[]` -> `List`.
    pub fn base_name(&self) -> &str {
        let no_generics = match self.0.find('<') {
            Some(i) => &self.0[..i],
            None => &self.0,
        };
        let no_arrays = no_generics.trim_end_matches("[]").trim();
        match no_arrays.rfind('.') {
            Some(i) => &no_arrays[i + 1..],
            None => no_arrays,
        }
    }

    /// True when `name` appears anywhere in the reference as a whole word,
    /// which covers element types of collections and arrays
    /// (`List<Observer>` mentions `Observer`).
    pub fn mentions(&self, name: &str) -> bool {
        self.0
            .split(|c: char| !c.is_alphanumeric() && c != '_' && c != '$')
            .any(|part| part == name)
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Index of an entity in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub(crate) usize);

/// Index of a member in the graph arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemberId(pub(crate) usize);

/// A node of the relation graph: an entity or one of its members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeId {
    /// An entity node
    Entity(EntityId),
    /// A member node
    Member(MemberId),
}

impl From<EntityId> for NodeId {
    fn from(id: EntityId) -> Self {
        Self::Entity(id)
    }
}

impl From<MemberId> for NodeId {
    fn from(id: MemberId) -> Self {
        Self::Member(id)
    }
}

/// A parsed class or interface. Members are owned by the graph arena and
/// referenced by id; relations are stored externally on the graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    /// simple name
    pub name:           String,
    /// package-qualified name; identity within one analysis run
    pub qualified_name: String,
    /// class or interface
    pub kind:           EntityKind,
    /// declared modifiers
    pub modifiers:      Vec<Modifier>,
    /// unresolved base-type references (extends and implements clauses)
    pub bases:          Vec<TypeRef>,
    /// members owned by this entity, in declaration order
    pub members:        Vec<MemberId>,
    /// entities declared inside this entity's body
    pub nested:         Vec<EntityId>,
    /// origin path or label of the file this entity came from
    pub origin:         String,
}

impl Entity {
    /// True when the entity carries the given modifier.
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }
}

/// The kind of a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberKind {
    /// A method declaration
    Method,
    /// A field declaration
    Field,
    /// A C#-style property (synthesized accessors, optional backing field)
    Property,
    /// A constructor declaration
    Constructor,
}

/// Accessor shape of a property member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyShape {
    /// property declares a getter
    pub has_getter: bool,
    /// property declares a setter
    pub has_setter: bool,
    /// auto-implemented; exposes a synthesized backing field
    pub auto:       bool,
}

/// A method, field, property, or constructor belonging to an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// member name
    pub name:          String,
    /// which kind of member this is
    pub kind:          MemberKind,
    /// owning entity (back-reference, not ownership)
    pub owner:         EntityId,
    /// declared modifiers
    pub modifiers:     Vec<Modifier>,
    /// declared return/field/property type; `None` for constructors
    pub ty:            Option<TypeRef>,
    /// declared parameter types, in order (methods and constructors)
    pub params:        Vec<TypeRef>,
    /// accessor shape; present only for properties
    pub property:      Option<PropertyShape>,
    /// names of types this member's body creates via `new`
    pub created_types: Vec<String>,
    /// identifiers referenced anywhere in this member's declaration
    pub used_names:    Vec<String>,
}

impl Member {
    /// True when the member carries the given modifier.
    pub fn has_modifier(&self, modifier: Modifier) -> bool {
        self.modifiers.contains(&modifier)
    }

    /// True when the member carries any access modifier at all.
    pub fn has_access_modifier(&self) -> bool {
        self.modifiers.iter().any(|m| m.is_access())
    }
}

/// A method-shaped view over a graph node, used by checks that apply
/// uniformly to real methods, property accessors, and
/// constructors-as-methods. Relations attach to the underlying `node`.
#[derive(Debug, Clone)]
pub struct MethodFacts {
    /// method name; accessors append `_get`/`_set` to the property name
    pub name:        String,
    /// the graph node the facts were synthesized from
    pub node:        NodeId,
    /// effective modifiers
    pub modifiers:   Vec<Modifier>,
    /// effective return type; a constructor's is its owning entity
    pub return_type: Option<TypeRef>,
    /// effective parameter types
    pub params:      Vec<TypeRef>,
}

/// A field-shaped view over a graph node: real fields and the synthesized
/// backing fields of auto-implemented properties.
#[derive(Debug, Clone)]
pub struct FieldFacts {
    /// field name
    pub name:      String,
    /// the graph node the facts were synthesized from
    pub node:      NodeId,
    /// effective modifiers; backing fields demote access to private
    pub modifiers: Vec<Modifier>,
    /// declared type
    pub ty:        TypeRef,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_list_skips_annotations_and_unknowns() {
        let parsed = Modifier::parse_list("@Override public static strictfp");
        assert_eq!(parsed, vec![Modifier::Public, Modifier::Static]);
    }

    #[test]
    fn type_ref_base_name_strips_generics_arrays_and_packages() {
        assert_eq!(TypeRef::new("java.util.List<Observer>").base_name(), "List");
        assert_eq!(TypeRef::new("int[]").base_name(), "int");
        assert_eq!(TypeRef::new("Observer").base_name(), "Observer");
    }

    #[test]
    fn type_ref_mentions_finds_element_types() {
        let ty = TypeRef::new("Map<String, List<Observer>>");
        assert!(ty.mentions("Observer"));
        assert!(ty.mentions("String"));
        assert!(!ty.mentions("Obs"));
    }
}
