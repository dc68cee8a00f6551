#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// Per-file extraction of entities and member facts.
pub mod file;
/// Tree-sitter parser wrapper.
pub mod parser;
/// Tree-sitter query strings used by the front-end.
pub mod queries;

pub use file::{ParseError, RawEntity, RawMember, RawMemberKind, SourceFile};
pub use parser::Parser;
