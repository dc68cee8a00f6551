#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! # motif
//!
//! Detects design patterns in Java projects. Point it at a directory of
//! sources and it reports which patterns it recognizes, with a score and a
//! list of the requirements each near-miss failed.

use std::path::PathBuf;

use anyhow::{Context, Result};
use bpaf::*;
use colored::Colorize;
use motif::{
    batch::{BatchConfig, run_batch},
    checks::{FeedbackKind, Thresholds},
    recognizers::Pattern,
    runner::{Progress, RecognitionResult, RecognizerRunner},
};
use tabled::{Table, Tabled, settings::Style};
use tracing::{Level, metadata::LevelFilter};
use tracing_subscriber::{fmt, prelude::*, util::SubscriberInitExt};

/// Top-level CLI commands.
#[derive(Debug, Clone)]
enum Cmd {
    /// Analyze one project directory
    Detect {
        /// project directory
        dir:        PathBuf,
        /// patterns to look for; all of them when empty
        patterns:   Vec<Pattern>,
        /// score required for a Correct verdict
        threshold:  u8,
        /// keep candidates classified Incorrect
        report_all: bool,
        /// print results as JSON
        json:       bool,
    },
    /// Evaluate recognizers against a labeled batch of projects
    Batch {
        /// path to the batch config JSON
        config: PathBuf,
        /// print the report as JSON
        json:   bool,
    },
}

/// Parse the command line arguments and return a `Cmd` enum
fn options() -> Cmd {
    /// parses the project directory
    fn dir() -> impl Parser<PathBuf> {
        positional("DIR").help("Directory containing Java sources")
    }

    /// parses requested patterns
    fn patterns() -> impl Parser<Vec<Pattern>> {
        long("pattern")
            .short('p')
            .help("Pattern to look for; repeatable, defaults to all")
            .argument::<Pattern>("PATTERN")
            .many()
    }

    /// parses the Correct-verdict score threshold
    fn threshold() -> impl Parser<u8> {
        long("threshold")
            .help("Score required for a Correct verdict (default 80)")
            .argument::<u8>("SCORE")
            .fallback(80)
    }

    /// parses the report-all switch
    fn report_all() -> impl Parser<bool> {
        long("all")
            .help("Also report candidates that do not qualify")
            .switch()
    }

    /// parses the JSON output switch
    fn json() -> impl Parser<bool> {
        long("json").help("Print machine-readable JSON").switch()
    }

    let detect = construct!(Cmd::Detect {
        patterns(),
        threshold(),
        report_all(),
        json(),
        dir(),
    })
    .to_options()
    .command("detect")
    .help("Detect design patterns in a project directory");

    /// parses the batch config path
    fn config() -> impl Parser<PathBuf> {
        positional("CONFIG").help("Path to batch config JSON")
    }

    let batch = construct!(Cmd::Batch { json(), config() })
    .to_options()
    .command("batch")
    .help("Run recognizers against labeled example projects");

    let cmd = construct!([detect, batch]);

    cmd.to_options()
        .descr("Design pattern detection for Java projects")
        .run()
}

/// One row of the detection results table.
#[derive(Tabled)]
struct ResultRow {
    /// pattern name
    #[tabled(rename = "Pattern")]
    pattern:  String,
    /// anchor entity
    #[tabled(rename = "Entity")]
    entity:   String,
    /// origin file
    #[tabled(rename = "File")]
    origin:   String,
    /// score out of 100
    #[tabled(rename = "Score")]
    score:    u8,
    /// classification
    #[tabled(rename = "Verdict")]
    feedback: String,
}

impl From<&RecognitionResult> for ResultRow {
    fn from(r: &RecognitionResult) -> Self {
        let feedback = match r.feedback {
            FeedbackKind::Correct => "correct".green().to_string(),
            FeedbackKind::SemiCorrect => "partial".yellow().to_string(),
            FeedbackKind::Incorrect => "incorrect".red().to_string(),
        };
        Self {
            pattern: r.pattern.to_string(),
            entity: r.entity.clone(),
            origin: r.origin.clone(),
            score: r.score,
            feedback,
        }
    }
}

/// Renders detection results as a table plus failing requirements for
/// partial matches.
fn show_results(results: &[RecognitionResult]) {
    if results.is_empty() {
        println!("{}", "No patterns recognized.".yellow());
        return;
    }

    let rows: Vec<ResultRow> = results.iter().map(ResultRow::from).collect();
    println!("{}", Table::new(rows).with(Style::modern()));

    for result in results {
        if result.feedback == FeedbackKind::Correct {
            continue;
        }
        let failing = result.failing_requirements();
        if failing.is_empty() {
            continue;
        }
        println!(
            "\n{} `{}` as {} is missing:",
            "note:".yellow().bold(),
            result.entity,
            result.pattern
        );
        for message in failing {
            println!("  - {message}");
        }
    }
}

/// A progress callback that keeps a single status line updated.
fn print_progress(progress: Progress) {
    eprint!("\r[{:>3}%] {:<60}", progress.percentage, progress.status);
    if progress.percentage >= 100 {
        eprintln!();
    }
}

fn main() -> Result<()> {
    let fmt = fmt::layer()
        .without_time()
        .with_file(false)
        .with_line_number(false);
    let filter_layer = LevelFilter::from_level(Level::WARN);
    tracing_subscriber::registry()
        .with(fmt)
        .with(filter_layer)
        .init();

    match options() {
        Cmd::Detect {
            dir,
            patterns,
            threshold,
            report_all,
            json,
        } => {
            let discovered = RecognizerRunner::over_dir(&dir)?;
            let patterns = if patterns.is_empty() {
                Pattern::ALL.to_vec()
            } else {
                patterns
            };
            let thresholds = Thresholds::new(40.min(threshold), threshold)
                .context("Invalid score threshold")?;
            let runner = RecognizerRunner::builder()
                .files(discovered.files)
                .patterns(patterns)
                .thresholds(thresholds)
                .report_all(report_all)
                .build();
            let outcome = runner.run(&mut print_progress)?;

            for error in &outcome.parse_errors {
                eprintln!("{} {error}", "warning:".yellow().bold());
            }
            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&outcome.results)
                        .context("Failed to serialize results")?
                );
            } else {
                show_results(&outcome.results);
            }
        }
        Cmd::Batch { config, json } => {
            let config = BatchConfig::load(&config)?;
            let report = run_batch(&config, &mut print_progress)?;

            if json {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&report)
                        .context("Failed to serialize batch report")?
                );
            } else {
                for case in &report.cases {
                    let verdict = if case.correct {
                        "ok".green()
                    } else {
                        "miss".red()
                    };
                    let detected = match &case.top {
                        Some((pattern, entity, score)) => {
                            format!("{pattern} on `{entity}` ({score})")
                        }
                        None => String::from("nothing"),
                    };
                    println!(
                        "[{verdict}] {} expected {}, detected {detected}",
                        case.directory.display(),
                        case.expected
                    );
                }
                println!(
                    "\nprecision {:.2}  recall {:.2}",
                    report.precision, report.recall
                );
            }
        }
    }

    Ok(())
}
