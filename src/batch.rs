#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Batch evaluation of recognizers against labeled example projects.
//!
//! A batch config lists project directories together with the pattern each
//! one is known to implement. The batch runner analyzes every project and
//! reports per-case outcomes plus aggregate precision and recall, which is
//! how recognizer quality is tracked across changes.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::{
    recognizers::Pattern,
    runner::{Progress, ProgressFn, RecognizerRunner},
};

/// Default minimum score for a detection to count.
fn default_score_threshold() -> u8 {
    80
}

/// One labeled example project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectCase {
    /// directory containing the project's Java sources
    pub directory:        PathBuf,
    /// the pattern this project is known to implement
    pub expected_pattern: Pattern,
    /// temporarily exclude this case from the aggregate numbers
    #[serde(default)]
    pub skip:             bool,
}

/// A batch configuration, deserialized from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// the labeled cases to evaluate
    pub projects:          Vec<ProjectCase>,
    /// count a case as correct when the expected pattern appears anywhere
    /// in the results, not only as the top result
    #[serde(default)]
    pub check_all_results: bool,
    /// minimum score for a detection to count
    #[serde(default = "default_score_threshold")]
    pub score_threshold:   u8,
}

impl BatchConfig {
    /// Loads a batch configuration from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read batch config at {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse batch config at {}", path.display()))
    }
}

/// Outcome of one case.
#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    /// the project directory
    pub directory: PathBuf,
    /// the pattern the project implements
    pub expected:  Pattern,
    /// top detection, as (pattern, entity, score); `None` when nothing
    /// scored above the threshold
    pub top:       Option<(Pattern, String, u8)>,
    /// whether the expected pattern was detected per the config's rules
    pub correct:   bool,
}

/// Aggregate outcome of a batch run.
#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    /// per-case outcomes, skipped cases excluded
    pub cases:     Vec<CaseOutcome>,
    /// of the cases that produced any detection, the fraction detected
    /// correctly
    pub precision: f64,
    /// the fraction of cases that produced any detection at all
    pub recall:    f64,
}

impl BatchReport {
    /// Builds the aggregate numbers from per-case outcomes.
    fn from_cases(cases: Vec<CaseOutcome>) -> Self {
        let total = cases.len();
        let with_results = cases.iter().filter(|c| c.top.is_some()).count();
        let correct = cases.iter().filter(|c| c.correct).count();

        let precision = if with_results == 0 {
            0.0
        } else {
            correct as f64 / with_results as f64
        };
        let recall = if total == 0 {
            0.0
        } else {
            with_results as f64 / total as f64
        };

        Self {
            cases,
            precision,
            recall,
        }
    }
}

/// Runs every non-skipped case in a batch config.
pub fn run_batch(config: &BatchConfig, progress: &mut ProgressFn<'_>) -> Result<BatchReport> {
    let active: Vec<&ProjectCase> = config.projects.iter().filter(|p| !p.skip).collect();
    let total = active.len().max(1);
    let mut cases = Vec::with_capacity(active.len());

    for (i, case) in active.iter().enumerate() {
        progress(Progress {
            percentage: (100 * i / total) as u8,
            status:     format!("analyzing {}", case.directory.display()),
        });
        cases.push(run_case(case, config)?);
    }
    progress(Progress {
        percentage: 100,
        status:     String::from("done"),
    });

    let report = BatchReport::from_cases(cases);
    info!(
        cases = report.cases.len(),
        precision = report.precision,
        recall = report.recall,
        "batch finished"
    );
    Ok(report)
}

/// Analyzes one case directory and judges the outcome.
fn run_case(case: &ProjectCase, config: &BatchConfig) -> Result<CaseOutcome> {
    let discovered = RecognizerRunner::over_dir(&case.directory)?;
    let runner = RecognizerRunner::builder()
        .files(discovered.files)
        .report_all(true)
        .build();
    let outcome = runner.run(&mut |_| {})?;

    let detections: Vec<_> = outcome
        .results
        .iter()
        .filter(|r| r.score >= config.score_threshold)
        .collect();

    let top = detections
        .first()
        .map(|r| (r.pattern, r.entity.clone(), r.score));
    let correct = if config.check_all_results {
        detections.iter().any(|r| r.pattern == case.expected_pattern)
    } else {
        top.as_ref()
            .is_some_and(|(pattern, ..)| *pattern == case.expected_pattern)
    };

    Ok(CaseOutcome {
        directory: case.directory.clone(),
        expected: case.expected_pattern,
        top,
        correct,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(expected: Pattern, top: Option<(Pattern, u8)>) -> CaseOutcome {
        let correct = top.is_some_and(|(p, _)| p == expected);
        CaseOutcome {
            directory: PathBuf::from("x"),
            expected,
            top: top.map(|(p, s)| (p, String::from("X"), s)),
            correct,
        }
    }

    #[test]
    fn precision_counts_only_cases_with_detections() {
        let report = BatchReport::from_cases(vec![
            case(Pattern::Singleton, Some((Pattern::Singleton, 95))),
            case(Pattern::Observer, Some((Pattern::Strategy, 85))),
            case(Pattern::Bridge, None),
            case(Pattern::Adapter, None),
        ]);
        assert!((report.precision - 0.5).abs() < f64::EPSILON);
        assert!((report.recall - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_batch_reports_zero() {
        let report = BatchReport::from_cases(Vec::new());
        assert_eq!(report.precision, 0.0);
        assert_eq!(report.recall, 0.0);
    }

    #[test]
    fn config_defaults_apply() {
        let config: BatchConfig = serde_json::from_str(
            r#"{"projects": [{"directory": "demo", "expected_pattern": "Singleton"}]}"#,
        )
        .unwrap();
        assert_eq!(config.score_threshold, 80);
        assert!(!config.check_all_results);
        assert!(!config.projects[0].skip);
    }
}
