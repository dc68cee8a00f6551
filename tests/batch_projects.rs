use std::{fs, path::PathBuf};

use motif::{
    batch::{BatchConfig, ProjectCase, run_batch},
    recognizers::Pattern,
};

/// Creates a scratch directory unique to this test process.
fn scratch(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("motif-batch-{}-{name}", std::process::id()));
    if root.exists() {
        fs::remove_dir_all(&root).expect("stale scratch dir should be removable");
    }
    fs::create_dir_all(&root).expect("scratch dir should be creatable");
    root
}

fn write_project(root: &PathBuf, name: &str, files: &[(&str, &str)]) -> PathBuf {
    let dir = root.join(name);
    fs::create_dir_all(&dir).expect("project dir should be creatable");
    for (file, code) in files {
        fs::write(dir.join(file), code).expect("source file should be writable");
    }
    dir
}

const SINGLETON: &str = r#"
public class Session {
    private static Session instance;

    private Session() {}

    public static Session getInstance() {
        if (instance == null) {
            instance = new Session();
        }
        return instance;
    }
}
"#;

const PLAIN: &str = r#"
public class Util {
    public static int twice(int x) {
        return x * 2;
    }
}
"#;

#[test]
fn batch_reports_precision_and_recall() {
    let root = scratch("report");
    let singleton_dir =
        write_project(&root, "singleton", &[("Session.java", SINGLETON)]);
    let plain_dir = write_project(&root, "plain", &[("Util.java", PLAIN)]);

    let config = BatchConfig {
        projects:          vec![
            ProjectCase {
                directory:        singleton_dir,
                expected_pattern: Pattern::Singleton,
                skip:             false,
            },
            ProjectCase {
                directory:        plain_dir,
                expected_pattern: Pattern::Observer,
                skip:             false,
            },
        ],
        check_all_results: false,
        score_threshold:   80,
    };

    let report = run_batch(&config, &mut |_| {}).expect("batch should run");

    assert_eq!(report.cases.len(), 2);
    assert!(report.cases[0].correct, "singleton case should be detected");
    assert!(!report.cases[1].correct, "plain case has no pattern");
    // one of two cases produced a detection, and it was correct
    assert!((report.recall - 0.5).abs() < f64::EPSILON);
    assert!((report.precision - 1.0).abs() < f64::EPSILON);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn skipped_cases_stay_out_of_the_numbers() {
    let root = scratch("skip");
    let singleton_dir =
        write_project(&root, "singleton", &[("Session.java", SINGLETON)]);

    let config = BatchConfig {
        projects:          vec![
            ProjectCase {
                directory:        singleton_dir,
                expected_pattern: Pattern::Singleton,
                skip:             false,
            },
            ProjectCase {
                directory:        root.join("missing"),
                expected_pattern: Pattern::Bridge,
                skip:             true,
            },
        ],
        check_all_results: false,
        score_threshold:   80,
    };

    let report = run_batch(&config, &mut |_| {}).expect("batch should run");

    assert_eq!(report.cases.len(), 1);
    assert!((report.recall - 1.0).abs() < f64::EPSILON);
    assert!((report.precision - 1.0).abs() < f64::EPSILON);

    fs::remove_dir_all(&root).ok();
}

#[test]
fn missing_source_files_do_not_abort_a_case() {
    let root = scratch("empty");
    let empty_dir = write_project(&root, "empty", &[]);

    let config = BatchConfig {
        projects:          vec![ProjectCase {
            directory:        empty_dir,
            expected_pattern: Pattern::Strategy,
            skip:             false,
        }],
        check_all_results: false,
        score_threshold:   80,
    };

    let report = run_batch(&config, &mut |_| {}).expect("batch should run");

    assert_eq!(report.cases.len(), 1);
    assert!(report.cases[0].top.is_none());
    assert!(!report.cases[0].correct);

    fs::remove_dir_all(&root).ok();
}
