#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

use serde::{Deserialize, Serialize};

use crate::graph::NodeId;

/// Importance of a check, used for knockout policy and presentation, not for
/// the base score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    /// failure disqualifies the match regardless of score
    Knockout,
    /// must-have requirement
    High,
    /// expected requirement
    Mid,
    /// nice-to-have requirement
    Low,
}

/// Classification of a score into feedback buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackKind {
    /// high-confidence match
    Correct,
    /// borderline match, displayed distinctly
    SemiCorrect,
    /// not a match
    Incorrect,
}

/// Thresholds are invalid when they are not monotonic or not within 1..=100.
#[derive(thiserror::Error, Debug)]
#[error("Thresholds must satisfy 0 < semi_correct <= correct <= 100, got {semi_correct}/{correct}")]
pub struct ThresholdError {
    /// rejected semi-correct cut point
    semi_correct: u8,
    /// rejected correct cut point
    correct:      u8,
}

/// Configurable score cut points for feedback classification. The observed
/// historical values are 40/80 (the default) and 33/66. Construction goes
/// through [`Thresholds::new`] so the ordering constraint always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    /// scores at or above this are at least semi-correct
    semi_correct: u8,
    /// scores at or above this are correct
    correct:      u8,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            semi_correct: 40,
            correct:      80,
        }
    }
}

impl Thresholds {
    /// Creates validated thresholds; monotonic, scoring 0 as Incorrect and
    /// 100 as Correct.
    pub fn new(semi_correct: u8, correct: u8) -> Result<Self, ThresholdError> {
        if semi_correct == 0 || semi_correct > correct || correct > 100 {
            return Err(ThresholdError {
                semi_correct,
                correct,
            });
        }
        Ok(Self {
            semi_correct,
            correct,
        })
    }

    /// Classifies a percentage score.
    pub fn classify(&self, score: u8) -> FeedbackKind {
        if score >= self.correct {
            FeedbackKind::Correct
        } else if score >= self.semi_correct {
            FeedbackKind::SemiCorrect
        } else {
            FeedbackKind::Incorrect
        }
    }
}

/// How a result node aggregates its score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultKind {
    /// scores by its own weight and outcome
    Leaf,
    /// scores as the sum of its children
    Collection,
    /// scores as a leaf on the negated child outcome; the child tree is
    /// carried for feedback only
    Negation,
    /// fan-out wrapper: keeps every per-member (or per-candidate) result
    /// but scores by the best of them, so one satisfying member is enough
    /// and the rest cannot dilute the score
    AnyOf,
}

/// The outcome of evaluating one check against one node, with child results
/// recursively. Built once per evaluation and never mutated after return.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckResult {
    /// human-readable description of the requirement
    pub message:  String,
    /// the evaluated check's priority
    pub priority: Priority,
    /// whether the requirement was met
    pub passed:   bool,
    /// leaf weight contributed to the score
    pub weight:   f32,
    /// aggregation behavior
    pub kind:     ResultKind,
    /// the graph node this check matched, if any
    pub matched:  Option<NodeId>,
    /// child results
    pub children: Vec<CheckResult>,
}

impl CheckResult {
    /// A leaf outcome.
    pub fn leaf(
        message: impl Into<String>,
        priority: Priority,
        passed: bool,
        weight: f32,
        matched: Option<NodeId>,
    ) -> Self {
        Self {
            message: message.into(),
            priority,
            passed,
            weight,
            kind: ResultKind::Leaf,
            matched,
            children: Vec::new(),
        }
    }

    /// A collection outcome over child results.
    pub fn collection(
        message: impl Into<String>,
        priority: Priority,
        passed: bool,
        matched: Option<NodeId>,
        children: Vec<CheckResult>,
    ) -> Self {
        Self {
            message: message.into(),
            priority,
            passed,
            weight: 0.0,
            kind: ResultKind::Collection,
            matched,
            children,
        }
    }

    /// A negation outcome wrapping the inner result.
    pub fn negation(
        message: impl Into<String>,
        priority: Priority,
        weight: f32,
        inner: CheckResult,
    ) -> Self {
        Self {
            message: message.into(),
            priority,
            passed: !inner.passed,
            weight,
            kind: ResultKind::Negation,
            matched: None,
            children: vec![inner],
        }
    }

    /// A fan-out outcome keeping every per-member result.
    pub fn any_of(
        message: impl Into<String>,
        priority: Priority,
        passed: bool,
        matched: Option<NodeId>,
        children: Vec<CheckResult>,
    ) -> Self {
        Self {
            message: message.into(),
            priority,
            passed,
            weight: 0.0,
            kind: ResultKind::AnyOf,
            matched,
            children,
        }
    }

    /// The best of this wrapper's per-member results: a passing one if any,
    /// otherwise the highest scoring, so feedback points at the nearest
    /// miss.
    pub fn best_child(&self) -> Option<&CheckResult> {
        self.children
            .iter()
            .max_by(|a, b| (a.passed, a.score()).cmp(&(b.passed, b.score())))
    }

    /// Total achievable score of this subtree.
    pub fn possible(&self) -> f32 {
        match self.kind {
            ResultKind::Leaf | ResultKind::Negation => self.weight,
            ResultKind::Collection => self.children.iter().map(CheckResult::possible).sum(),
            ResultKind::AnyOf => self.best_child().map_or(0.0, CheckResult::possible),
        }
    }

    /// Achieved score of this subtree.
    pub fn achieved(&self) -> f32 {
        match self.kind {
            ResultKind::Leaf | ResultKind::Negation => {
                if self.passed { self.weight } else { 0.0 }
            }
            ResultKind::Collection => self.children.iter().map(CheckResult::achieved).sum(),
            ResultKind::AnyOf => self.best_child().map_or(0.0, CheckResult::achieved),
        }
    }

    /// Percentage score, truncated so that 100 is reached only when every
    /// weighted leaf passed. 0 when nothing was achievable.
    pub fn score(&self) -> u8 {
        let possible = self.possible();
        if possible <= 0.0 {
            return 0;
        }
        (100.0 * self.achieved() / possible) as u8
    }

    /// True when any reachable leaf failed a Knockout-priority requirement.
    /// Negation children are not descended into; their inner tree exists for
    /// feedback only.
    pub fn has_failed_knockout(&self) -> bool {
        match self.kind {
            ResultKind::Leaf | ResultKind::Negation => {
                !self.passed && self.priority == Priority::Knockout
            }
            ResultKind::Collection => {
                (!self.passed && self.priority == Priority::Knockout)
                    || self.children.iter().any(CheckResult::has_failed_knockout)
            }
            // per-member entries that lost to a better member must not
            // knock the whole candidate out
            ResultKind::AnyOf => {
                (!self.passed && self.priority == Priority::Knockout)
                    || self.best_child().is_some_and(CheckResult::has_failed_knockout)
            }
        }
    }

    /// Classifies this result; a failed knockout forces Incorrect.
    pub fn feedback(&self, thresholds: Thresholds) -> FeedbackKind {
        if self.has_failed_knockout() {
            return FeedbackKind::Incorrect;
        }
        thresholds.classify(self.score())
    }

    /// Messages of every failing leaf, depth-first; used for rendering
    /// feedback.
    pub fn failing_messages(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_failing(&mut out);
        out
    }

    /// Depth-first helper for [`CheckResult::failing_messages`].
    fn collect_failing<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self.kind {
            ResultKind::Leaf | ResultKind::Negation => {
                if !self.passed {
                    out.push(&self.message);
                }
            }
            ResultKind::Collection => {
                for child in &self.children {
                    child.collect_failing(out);
                }
            }
            ResultKind::AnyOf => {
                if let Some(best) = self.best_child() {
                    best.collect_failing(out);
                }
            }
        }
    }
}
