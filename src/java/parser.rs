#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use std::{collections::HashMap, fmt::Formatter};

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Query, QueryCursor, StreamingIterator, Tree};

use crate::Dict;

/// A single capture from a query match, along with where it sits in the
/// source. Byte offsets are used to attribute nested captures (members,
/// creations, identifier uses) to the declaration that contains them.
#[derive(Debug, Clone)]
pub struct Capture {
    /// the captured source text
    pub text:  String,
    /// byte offset where the capture starts
    pub start: usize,
    /// byte offset where the capture ends
    pub end:   usize,
}

/// All captures of one query match, keyed by capture name.
pub type RangedMatch = HashMap<String, Capture>;

#[derive(Clone)]
/// A struct that wraps a tree-sitter parser object and source code
pub struct Parser {
    /// the source code being parsed
    code:  String,
    /// the parse tree
    _tree: Option<Tree>,
    /// the tree-sitter java grammar language
    lang:  tree_sitter::Language,
}

/// Returns the compiled tree-sitter Java language.
fn java_language() -> tree_sitter::Language {
    tree_sitter_java::LANGUAGE.into()
}

impl Default for Parser {
    fn default() -> Self {
        // Fall back to the fallible constructor but keep Default for callers
        // that derive it; panic with context if even the empty parse fails.
        Parser::new(String::new()).expect("Failed to initialize Java parser with empty source")
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, _: &mut Formatter<'_>) -> std::fmt::Result {
        Ok(())
    }
}

impl Parser {
    /// Returns a new parser object
    ///
    /// * `source_code`: the source code to be parsed
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language = java_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load Java grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing Java code"))?;

        Ok(Self {
            code:  source_code,
            _tree: Some(tree),
            lang:  language,
        })
    }

    /// A getter for parser's source code
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Applies a tree sitter query and returns the result as a collection of
    /// HashMaps
    ///
    /// * `q`: the tree-sitter query to be applied
    pub fn query(&self, q: &str) -> Result<Vec<Dict>> {
        let mut results = vec![];

        for ranged in self.query_ranges(q)? {
            let mut result = Dict::new();
            for (name, capture) in ranged {
                result.insert(name, capture.text);
            }
            results.push(result);
        }

        Ok(results)
    }

    /// Applies a tree sitter query and returns, per match, every capture with
    /// its byte range in the source.
    ///
    /// * `q`: the tree-sitter query to be applied
    pub fn query_ranges(&self, q: &str) -> Result<Vec<RangedMatch>> {
        let mut results = vec![];
        let tree = self
            ._tree
            .as_ref()
            .context("Treesitter could not parse code")?;

        let query = Query::new(&self.lang, q)
            .with_context(|| format!("Failed to compile tree-sitter query: {q}"))?;
        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&query, tree.root_node(), self.code.as_bytes());
        let mut capture_indices = Vec::new();

        for name in query.capture_names() {
            let index = query
                .capture_index_for_name(name)
                .ok_or_else(|| anyhow!("Capture name {name} has no index associated."))?;
            capture_indices.push((index, name.to_string()));
        }

        while let Some(m) = matches.next() {
            let mut result = RangedMatch::new();

            for (index, name) in &capture_indices {
                let value = match m.captures.iter().find(|c| c.index == *index) {
                    Some(v) => v,
                    None => continue,
                };

                let text = value
                    .node
                    .utf8_text(self.code.as_bytes())
                    .with_context(|| {
                        format!(
                            "Cannot match query result indices with source code for capture name: \
                             {name}."
                        )
                    })?;

                result.insert(name.clone(), Capture {
                    text:  text.to_string(),
                    start: value.node.start_byte(),
                    end:   value.node.end_byte(),
                });
            }
            results.push(result);
        }

        Ok(results)
    }
}
