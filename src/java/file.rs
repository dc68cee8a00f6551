#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::path::Path;

use super::{
    parser::{Capture, Parser, RangedMatch},
    queries::{
        CLASS_DECLARATION_QUERY, CONSTRUCTOR_DECLARATION_QUERY, FIELD_DECLARATION_QUERY,
        FORMAL_PARAMETER_QUERY, IDENTIFIER_USE_QUERY, INTERFACE_DECLARATION_QUERY,
        METHOD_DECLARATION_QUERY, OBJECT_CREATION_QUERY, PACKAGE_QUERY,
        UNSUPPORTED_DECLARATION_QUERY,
    },
};
use crate::graph::{EntityKind, Modifier, TypeRef};

/// An error produced while turning source text into entities. Input errors
/// are reported per file or per declaration; they never abort a whole run.
#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    /// The file could not be read from disk.
    #[error("Could not read file: {path}")]
    Io {
        /// path that failed to read
        path:   String,
        /// underlying io error
        #[source]
        source: std::io::Error,
    },
    /// The source text could not be parsed or queried.
    #[error("Could not parse {origin}")]
    Parse {
        /// origin label of the failing file
        origin: String,
        /// underlying parser error
        #[source]
        source: anyhow::Error,
    },
    /// A declaration of a kind the entity model does not support.
    #[error("Unsupported entity kind for declaration `{name}` in {origin}")]
    UnsupportedEntityKind {
        /// declared name
        name:   String,
        /// origin label of the file
        origin: String,
    },
}

/// A class or interface lifted out of one file, before it is merged into a
/// graph.
#[derive(Debug, Clone)]
pub struct RawEntity {
    /// simple name
    pub name:      String,
    /// class or interface
    pub kind:      EntityKind,
    /// declared modifiers
    pub modifiers: Vec<Modifier>,
    /// unresolved base-type references, extends first
    pub bases:     Vec<TypeRef>,
    /// members declared in this entity's body
    pub members:   Vec<RawMember>,
    /// byte range of the whole declaration
    decl_span:     (usize, usize),
    /// byte range of the body, used for member attribution
    body_span:     (usize, usize),
}

impl RawEntity {
    /// True when `other`'s declaration sits inside this entity's body.
    fn contains(&self, span: (usize, usize)) -> bool {
        self.body_span.0 <= span.0 && span.1 <= self.body_span.1
    }

    /// Width of the body span, used to find the innermost owner.
    fn body_width(&self) -> usize {
        self.body_span.1 - self.body_span.0
    }

    /// True when this entity's declaration is nested inside `outer`'s body.
    pub fn nested_in(&self, outer: &RawEntity) -> bool {
        outer.contains(self.decl_span)
    }
}

/// Which kind of raw member was parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawMemberKind {
    /// a method declaration
    Method,
    /// a field declaration
    Field,
    /// a constructor declaration
    Constructor,
}

/// A member lifted out of one entity body.
#[derive(Debug, Clone)]
pub struct RawMember {
    /// which kind of member
    pub kind:          RawMemberKind,
    /// member name
    pub name:          String,
    /// declared modifiers
    pub modifiers:     Vec<Modifier>,
    /// declared return/field type; `None` for constructors
    pub ty:            Option<TypeRef>,
    /// declared parameter types, in order
    pub params:        Vec<TypeRef>,
    /// type names this member's declaration creates via `new`
    pub created_types: Vec<String>,
    /// identifiers referenced anywhere in this member's declaration
    pub used_names:    Vec<String>,
    /// byte range of the whole declaration
    decl_span:         (usize, usize),
}

/// One parsed source file: its entities plus the declarations that had to be
/// skipped.
#[derive(Debug)]
pub struct SourceFile {
    /// path or label identifying the file
    pub origin:   String,
    /// declared package, if any
    pub package:  Option<String>,
    /// entities parsed out of the file, in source order
    pub entities: Vec<RawEntity>,
    /// declarations skipped because the model does not support them
    pub skipped:  Vec<ParseError>,
}

/// Span of the `decl` capture of a match.
fn decl_span(m: &RangedMatch) -> Option<(usize, usize)> {
    m.get("decl").map(|c| (c.start, c.end))
}

/// Parses the modifiers capture of a match, tolerating its absence.
fn modifiers_of(m: &RangedMatch) -> Vec<Modifier> {
    m.get("modifiers")
        .map(|c| Modifier::parse_list(&c.text))
        .unwrap_or_default()
}

/// Splits a comma-separated type list at the top level, so generic
/// arguments like `Map<K, V>` stay intact.
fn split_type_list(text: &str) -> Vec<TypeRef> {
    let mut out = Vec::new();
    let mut depth = 0usize;
    let mut current = String::new();
    for c in text.chars() {
        match c {
            '<' | '(' | '[' => {
                depth += 1;
                current.push(c);
            }
            '>' | ')' | ']' => {
                depth = depth.saturating_sub(1);
                current.push(c);
            }
            ',' if depth == 0 => {
                if !current.trim().is_empty() {
                    out.push(TypeRef::new(current.trim()));
                }
                current.clear();
            }
            _ => current.push(c),
        }
    }
    if !current.trim().is_empty() {
        out.push(TypeRef::new(current.trim()));
    }
    out
}

/// Extracts base-type references from an `extends ...` / `implements ...`
/// clause capture.
fn bases_of_clause(capture: Option<&Capture>, keyword: &str) -> Vec<TypeRef> {
    match capture {
        Some(c) => {
            let list = c.text.trim().trim_start_matches(keyword).trim();
            split_type_list(list)
        }
        None => Vec::new(),
    }
}

impl SourceFile {
    /// Reads and parses the file at `path`.
    pub fn new(path: &Path) -> Result<Self, ParseError> {
        let code = std::fs::read_to_string(path).map_err(|source| ParseError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_source(code, path.display().to_string())
    }

    /// Parses source text with an identifying origin label.
    pub fn from_source(code: String, origin: String) -> Result<Self, ParseError> {
        let parser = Parser::new(code).map_err(|source| ParseError::Parse {
            origin: origin.clone(),
            source,
        })?;
        let run = |q: &str| {
            parser.query_ranges(q).map_err(|source| ParseError::Parse {
                origin: origin.clone(),
                source,
            })
        };

        let package = parser
            .query(PACKAGE_QUERY)
            .ok()
            .and_then(|matches| matches.first().and_then(|m| m.get("name").cloned()));

        let mut entities = Vec::new();

        for m in run(CLASS_DECLARATION_QUERY)? {
            let (Some(name), Some(decl), Some(body)) = (m.get("name"), m.get("decl"), m.get("body"))
            else {
                continue;
            };
            let mut bases = bases_of_clause(m.get("superclass"), "extends");
            bases.extend(bases_of_clause(m.get("interfaces"), "implements"));
            entities.push(RawEntity {
                name: name.text.clone(),
                kind: EntityKind::Class,
                modifiers: modifiers_of(&m),
                bases,
                members: Vec::new(),
                decl_span: (decl.start, decl.end),
                body_span: (body.start, body.end),
            });
        }

        for m in run(INTERFACE_DECLARATION_QUERY)? {
            let (Some(name), Some(decl), Some(body)) = (m.get("name"), m.get("decl"), m.get("body"))
            else {
                continue;
            };
            entities.push(RawEntity {
                name: name.text.clone(),
                kind: EntityKind::Interface,
                modifiers: modifiers_of(&m),
                bases: bases_of_clause(m.get("extends"), "extends"),
                members: Vec::new(),
                decl_span: (decl.start, decl.end),
                body_span: (body.start, body.end),
            });
        }

        let skipped = run(UNSUPPORTED_DECLARATION_QUERY)?
            .iter()
            .filter_map(|m| m.get("name"))
            .map(|name| ParseError::UnsupportedEntityKind {
                name:   name.text.clone(),
                origin: origin.clone(),
            })
            .collect();

        let params = run(FORMAL_PARAMETER_QUERY)?;
        let creations = run(OBJECT_CREATION_QUERY)?;
        let identifiers = run(IDENTIFIER_USE_QUERY)?;

        let mut members = Vec::new();

        for m in run(FIELD_DECLARATION_QUERY)? {
            let (Some(name), Some(ty), Some(decl)) = (m.get("name"), m.get("type"), m.get("decl"))
            else {
                continue;
            };
            members.push(RawMember {
                kind:          RawMemberKind::Field,
                name:          name.text.clone(),
                modifiers:     modifiers_of(&m),
                ty:            Some(TypeRef::new(&ty.text)),
                params:        Vec::new(),
                created_types: Vec::new(),
                used_names:    Vec::new(),
                decl_span:     (decl.start, decl.end),
            });
        }

        for m in run(METHOD_DECLARATION_QUERY)? {
            let (Some(name), Some(ty), Some(decl)) = (m.get("name"), m.get("type"), m.get("decl"))
            else {
                continue;
            };
            members.push(RawMember {
                kind:          RawMemberKind::Method,
                name:          name.text.clone(),
                modifiers:     modifiers_of(&m),
                ty:            Some(TypeRef::new(&ty.text)),
                params:        Vec::new(),
                created_types: Vec::new(),
                used_names:    Vec::new(),
                decl_span:     (decl.start, decl.end),
            });
        }

        for m in run(CONSTRUCTOR_DECLARATION_QUERY)? {
            let (Some(name), Some(decl)) = (m.get("name"), m.get("decl")) else {
                continue;
            };
            members.push(RawMember {
                kind:          RawMemberKind::Constructor,
                name:          name.text.clone(),
                modifiers:     modifiers_of(&m),
                ty:            None,
                params:        Vec::new(),
                created_types: Vec::new(),
                used_names:    Vec::new(),
                decl_span:     (decl.start, decl.end),
            });
        }

        // Attribute parameters and body facts to the innermost member whose
        // declaration contains them.
        for p in &params {
            let (Some(ty), Some(span)) = (p.get("type"), p.get("param").map(|c| (c.start, c.end)))
            else {
                continue;
            };
            if let Some(member) = innermost_member(&mut members, span) {
                member.params.push(TypeRef::new(&ty.text));
            }
        }

        for c in &creations {
            let (Some(ty), Some(span)) = (c.get("type"), c.get("expr").map(|e| (e.start, e.end)))
            else {
                continue;
            };
            if let Some(member) = innermost_member(&mut members, span) {
                member.created_types.push(TypeRef::new(&ty.text).base_name().to_string());
            }
        }

        for i in &identifiers {
            let Some(name) = i.get("name") else {
                continue;
            };
            let span = (name.start, name.end);
            if let Some(member) = innermost_member(&mut members, span) {
                if !member.used_names.contains(&name.text) {
                    member.used_names.push(name.text.clone());
                }
            }
        }

        // Attribute members to the innermost entity whose body contains
        // their declaration; stray matches outside any entity are dropped.
        for member in members {
            let owner = entities
                .iter_mut()
                .filter(|e| e.contains(member.decl_span))
                .min_by_key(|e| e.body_width());
            if let Some(owner) = owner {
                owner.members.push(member);
            }
        }

        Ok(Self {
            origin,
            package,
            entities,
            skipped,
        })
    }

    /// The package-qualified name of an entity from this file.
    pub fn qualified_name(&self, entity: &RawEntity) -> String {
        match &self.package {
            Some(pkg) => format!("{pkg}.{}", entity.name),
            None => entity.name.clone(),
        }
    }
}

/// The member with the smallest declaration span containing `span`.
fn innermost_member(
    members: &mut [RawMember],
    span: (usize, usize),
) -> Option<&mut RawMember> {
    members
        .iter_mut()
        .filter(|m| m.decl_span.0 <= span.0 && span.1 <= m.decl_span.1 && m.decl_span != span)
        .min_by_key(|m| m.decl_span.1 - m.decl_span.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_class_with_members() {
        let file = SourceFile::from_source(
            r#"
            public class Cache {
                private final Store store = new Store();

                public Cache(int size) {}

                public String get(String key) { return store.read(key); }
            }
            "#
            .to_string(),
            "Cache.java".to_string(),
        )
        .expect("file should parse");

        assert_eq!(file.entities.len(), 1);
        let cache = &file.entities[0];
        assert_eq!(cache.name, "Cache");
        assert_eq!(cache.kind, EntityKind::Class);
        assert_eq!(cache.members.len(), 3);

        let field = cache.members.iter().find(|m| m.name == "store").unwrap();
        assert_eq!(field.kind, RawMemberKind::Field);
        assert_eq!(field.created_types, vec!["Store".to_string()]);

        let ctor = cache.members.iter().find(|m| m.kind == RawMemberKind::Constructor).unwrap();
        assert_eq!(ctor.params.len(), 1);

        let method = cache.members.iter().find(|m| m.name == "get").unwrap();
        assert!(method.used_names.contains(&"store".to_string()));
        assert!(method.used_names.contains(&"read".to_string()));
    }

    #[test]
    fn reports_unsupported_declarations_without_failing() {
        let file = SourceFile::from_source(
            "public enum Color { RED, GREEN }\nclass Ok {}".to_string(),
            "Color.java".to_string(),
        )
        .expect("file should parse");

        assert_eq!(file.entities.len(), 1);
        assert_eq!(file.skipped.len(), 1);
        assert!(file.skipped[0].to_string().contains("Color"));
    }

    #[test]
    fn interface_extends_clause_becomes_base_refs() {
        let file = SourceFile::from_source(
            "interface A extends B, C<D> {}".to_string(),
            "A.java".to_string(),
        )
        .expect("file should parse");

        let a = &file.entities[0];
        assert_eq!(a.kind, EntityKind::Interface);
        assert_eq!(a.bases.len(), 2);
        assert_eq!(a.bases[0].base_name(), "B");
        assert_eq!(a.bases[1].base_name(), "C");
    }

    #[test]
    fn qualified_name_uses_package() {
        let file = SourceFile::from_source(
            "package com.example; class Foo {}".to_string(),
            "Foo.java".to_string(),
        )
        .expect("file should parse");
        assert_eq!(file.qualified_name(&file.entities[0]), "com.example.Foo");
    }
}
