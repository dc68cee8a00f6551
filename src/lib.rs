//! # motif
//!
//! A design pattern recognition engine for Java projects: parses sources into
//! an entity/relation graph and evaluates declarative recognizers against it,
//! producing scored, human-readable feedback.

#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

/// For batch evaluation against labeled example projects
pub mod batch;
/// The composable check engine and its result/scoring model
pub mod checks;
/// The entity and relation graph recognizers evaluate against
pub mod graph;
/// For parsing Java sources into raw entities and members
pub mod java;
/// Built-in pattern recognizers
pub mod recognizers;
/// For driving recognizers over a set of source files
pub mod runner;

/// Defined for convenience
type Dict = std::collections::HashMap<String, String>;
