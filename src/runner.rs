#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Drives recognizers over a set of Java source files.
//!
//! The runner parses every file once, merges the results into a single
//! relation graph, and evaluates each requested recognizer against each
//! candidate entity of the matching kind. Per-file parse failures are
//! collected and reported alongside the results; a structurally invalid
//! recognizer definition aborts the run.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bon::Builder;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::{
    checks::{CheckCtx, CheckResult, EvalState, FeedbackKind, Thresholds},
    graph::{NodeId, SyntaxGraph},
    java::{ParseError, SourceFile},
    recognizers::{Pattern, Recognizer},
};

/// A progress report emitted while a run advances.
#[derive(Debug, Clone, Serialize)]
pub struct Progress {
    /// completion estimate, 0 to 100
    pub percentage: u8,
    /// what the runner is currently doing
    pub status:     String,
}

/// Callback invoked with progress reports.
pub type ProgressFn<'a> = dyn FnMut(Progress) + 'a;

/// One recognized (or near-recognized) pattern instance.
#[derive(Debug, Clone, Serialize, Builder)]
pub struct RecognitionResult {
    /// the pattern that was recognized
    pub pattern:  Pattern,
    /// simple name of the entity the recognizer anchored on
    pub entity:   String,
    /// origin file of that entity
    pub origin:   String,
    /// score out of 100
    pub score:    u8,
    /// classification under the run's thresholds
    pub feedback: FeedbackKind,
    /// the full requirement outcome tree, for detailed feedback
    pub result:   CheckResult,
}

impl RecognitionResult {
    /// Messages of requirements this candidate failed to meet.
    pub fn failing_requirements(&self) -> Vec<&str> {
        self.result.failing_messages()
    }
}

/// Everything a run produced: recognition results plus the files that could
/// not be analyzed.
#[derive(Debug)]
pub struct RunOutcome {
    /// recognition results, best score first
    pub results:      Vec<RecognitionResult>,
    /// per-file failures that did not stop the run
    pub parse_errors: Vec<ParseError>,
}

/// Configures and executes recognition runs.
#[derive(Builder)]
pub struct RecognizerRunner {
    /// Java files to analyze
    #[builder(default)]
    pub files:      Vec<PathBuf>,
    /// patterns to look for; all of them by default
    #[builder(default = Pattern::ALL.to_vec())]
    pub patterns:   Vec<Pattern>,
    /// score thresholds for feedback classification
    #[builder(default)]
    pub thresholds: Thresholds,
    /// keep results classified Incorrect instead of dropping them
    #[builder(default)]
    pub report_all: bool,
}

impl RecognizerRunner {
    /// A runner over every `.java` file under a directory, recursively.
    pub fn over_dir(dir: &Path) -> Result<Self> {
        let pattern = dir.join("**").join("*.java");
        let pattern = pattern
            .to_str()
            .context("directory path is not valid UTF-8")?;
        let files = glob::glob(pattern)
            .context("Failed to compile glob pattern")?
            .filter_map(Result::ok)
            .collect::<Vec<_>>();
        debug!(dir = %dir.display(), files = files.len(), "discovered sources");
        Ok(Self::builder().files(files).build())
    }

    /// Runs the configured recognizers over the configured files. An empty
    /// file set yields an empty outcome, not an error.
    pub fn run(&self, progress: &mut ProgressFn<'_>) -> Result<RunOutcome> {
        let (graph, parse_errors) = self.parse_all(progress)?;

        if graph.is_empty() {
            progress(Progress {
                percentage: 100,
                status:     String::from("no entities to analyze"),
            });
            return Ok(RunOutcome {
                results: Vec::new(),
                parse_errors,
            });
        }

        let mut results = Vec::new();
        let total = self.patterns.len().max(1);
        for (i, &pattern) in self.patterns.iter().enumerate() {
            progress(Progress {
                percentage: (30 + 70 * i / total) as u8,
                status:     format!("looking for {pattern}"),
            });
            results.extend(self.run_pattern(&graph, pattern)?);
        }
        progress(Progress {
            percentage: 100,
            status:     String::from("done"),
        });

        results.sort_by(|a, b| b.score.cmp(&a.score).then(a.entity.cmp(&b.entity)));
        info!(results = results.len(), "recognition finished");
        Ok(RunOutcome {
            results,
            parse_errors,
        })
    }

    /// Evaluates one pattern's recognizer against every candidate entity in
    /// the graph. Public so callers driving patterns one at a time can stop
    /// between them.
    pub fn run_pattern(
        &self,
        graph: &SyntaxGraph,
        pattern: Pattern,
    ) -> Result<Vec<RecognitionResult>> {
        let recognizer = Recognizer::for_pattern(pattern);
        let mut results = Vec::new();

        for (id, entity) in graph.entities() {
            let mut best: Option<CheckResult> = None;
            for root in &recognizer.roots {
                // Roots anchored on one entity kind skip candidates of the
                // other kind instead of raising a node-type error.
                match root.anchor_kind() {
                    Some(kind) if kind != entity.kind => continue,
                    _ => {}
                }

                let ctx = CheckCtx {
                    graph,
                    current_entity: id,
                };
                let mut state = EvalState::new();
                let result = root
                    .evaluate(&ctx, &mut state, NodeId::Entity(id))
                    .with_context(|| {
                        format!("Recognizer for {pattern} is malformed")
                    })?;
                let better = match &best {
                    None => true,
                    Some(b) => (result.passed, result.score()) > (b.passed, b.score()),
                };
                if better {
                    best = Some(result);
                }
            }

            let Some(result) = best else { continue };
            let score = result.score();
            let feedback = result.feedback(self.thresholds);
            if feedback == FeedbackKind::Incorrect && !self.report_all {
                continue;
            }
            debug!(%pattern, entity = %entity.name, score, "candidate evaluated");
            results.push(
                RecognitionResult::builder()
                    .pattern(pattern)
                    .entity(entity.name.clone())
                    .origin(entity.origin.clone())
                    .score(score)
                    .feedback(feedback)
                    .result(result)
                    .build(),
            );
        }

        results.sort_by(|a, b| b.score.cmp(&a.score).then(a.entity.cmp(&b.entity)));
        Ok(results)
    }

    /// Parses every configured file into one graph, tolerating per-file
    /// failures.
    fn parse_all(&self, progress: &mut ProgressFn<'_>) -> Result<(SyntaxGraph, Vec<ParseError>)> {
        let mut graph = SyntaxGraph::new();
        let mut parse_errors = Vec::new();
        let total = self.files.len().max(1);

        for (i, path) in self.files.iter().enumerate() {
            progress(Progress {
                percentage: (30 * i / total) as u8,
                status:     format!("parsing {}", path.display()),
            });
            match SourceFile::new(path) {
                Ok(mut file) => {
                    parse_errors.append(&mut file.skipped);
                    graph.add_file(&file);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping file");
                    parse_errors.push(e);
                }
            }
        }

        graph.build_relations();
        Ok((graph, parse_errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EntityKind, GraphBuilder, Modifier, PropertyShape};

    fn noop() -> impl FnMut(Progress) {
        |_| {}
    }

    #[test]
    fn empty_input_yields_empty_outcome() {
        let runner = RecognizerRunner::builder().build();
        let outcome = runner.run(&mut noop()).unwrap();
        assert!(outcome.results.is_empty());
        assert!(outcome.parse_errors.is_empty());
    }

    #[test]
    fn singleton_shaped_class_is_recognized() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Config", EntityKind::Class, &[Modifier::Public]);
        builder.constructor(class, &[Modifier::Private], &[]);
        builder.field(
            class,
            "instance",
            "Config",
            &[Modifier::Private, Modifier::Static],
        );
        let getter = builder.method(
            class,
            "getInstance",
            "Config",
            &[Modifier::Public, Modifier::Static],
            &[],
        );
        builder.uses(getter, "instance");
        builder.creates(getter, "Config");
        let graph = builder.build();

        let runner = RecognizerRunner::builder().build();
        let results = runner.run_pattern(&graph, Pattern::Singleton).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity, "Config");
        assert!(results[0].score >= 80, "score was {}", results[0].score);
        assert_eq!(results[0].feedback, FeedbackKind::Correct);
    }

    #[test]
    fn property_backed_singleton_is_recognized() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Config", EntityKind::Class, &[Modifier::Public]);
        builder.constructor(class, &[Modifier::Private], &[]);
        // an auto property supplies both the backing field and the accessor
        let instance = builder.property(
            class,
            "instance",
            "Config",
            &[Modifier::Public, Modifier::Static],
            PropertyShape {
                has_getter: true,
                has_setter: false,
                auto:       true,
            },
        );
        builder.creates(instance, "Config");
        let graph = builder.build();

        let runner = RecognizerRunner::builder().build();
        let results = runner.run_pattern(&graph, Pattern::Singleton).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].entity, "Config");
        assert!(results[0].score >= 80, "score was {}", results[0].score);
        assert_eq!(results[0].feedback, FeedbackKind::Correct);
    }

    #[test]
    fn public_constructor_knocks_a_candidate_out() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Config", EntityKind::Class, &[Modifier::Public]);
        builder.constructor(class, &[Modifier::Public], &[]);
        builder.field(
            class,
            "instance",
            "Config",
            &[Modifier::Private, Modifier::Static],
        );
        let getter = builder.method(
            class,
            "getInstance",
            "Config",
            &[Modifier::Public, Modifier::Static],
            &[],
        );
        builder.uses(getter, "instance");
        let graph = builder.build();

        let runner = RecognizerRunner::builder().report_all(true).build();
        let results = runner.run_pattern(&graph, Pattern::Singleton).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].feedback, FeedbackKind::Incorrect);
    }

    #[test]
    fn incorrect_results_are_dropped_by_default() {
        let mut builder = GraphBuilder::new();
        let class = builder.entity("Plain", EntityKind::Class, &[Modifier::Public]);
        builder.constructor(class, &[Modifier::Public], &[]);
        let graph = builder.build();

        let runner = RecognizerRunner::builder().build();
        let results = runner.run_pattern(&graph, Pattern::Singleton).unwrap();
        assert!(results.is_empty());
    }
}
