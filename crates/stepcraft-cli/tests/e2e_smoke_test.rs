use std::{fs, path::PathBuf};

use tempfile::tempdir;

use stepcraft_cli::{Args, run};

/// Collects all .toml files from a directory
fn collect_toml_files(dir: PathBuf) -> Vec<PathBuf> {
    let mut files = if let Ok(entries) = fs::read_dir(&dir) {
        entries
            .flatten()
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file() && path.extension().and_then(|s| s.to_str()) == Some("toml")
            })
            .collect()
    } else {
        Vec::new()
    };

    // Sort for consistent test output
    files.sort();
    files
}

/// Demos live at the workspace root, not in the crate
fn demos_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .parent()
        .unwrap()
        .join("demos")
}

#[test]
fn e2e_smoke_test_valid_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let valid_demos = collect_toml_files(demos_path());

    assert!(!valid_demos.is_empty(), "No valid demos found in demos/");

    let mut failed_demos = Vec::new();

    for demo_path in &valid_demos {
        let output_filename = format!(
            "{}.out.toml",
            demo_path.file_stem().unwrap().to_string_lossy()
        );
        let output_path = temp_dir.path().join(output_filename);

        let args = Args {
            input: demo_path.to_string_lossy().to_string(),
            output: output_path.to_string_lossy().to_string(),
            config: None,
            log_level: "off".to_string(),
        };

        match run(&args) {
            Ok(summary) => {
                assert!(summary.elements > 0, "{} placed nothing", demo_path.display());
                let output = fs::read_to_string(&output_path).expect("Output was written");
                assert!(
                    output.contains("/ image"),
                    "{} placed no images",
                    demo_path.display()
                );
            }
            Err(e) => failed_demos.push((demo_path.clone(), e)),
        }
    }

    if !failed_demos.is_empty() {
        eprintln!("\nValid demos that failed:");
        for (path, err) in &failed_demos {
            eprintln!("  - {}: {}", path.display(), err);
        }
        panic!("{} valid demo(s) failed unexpectedly", failed_demos.len());
    }

    println!("All {} valid demos passed", valid_demos.len());
}

#[test]
fn e2e_smoke_test_error_demos() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let error_demos = collect_toml_files(demos_path().join("errors"));

    assert!(
        !error_demos.is_empty(),
        "No error demos found in demos/errors/"
    );

    let mut unexpectedly_succeeded = Vec::new();

    for demo_path in &error_demos {
        let output_filename = format!(
            "error_{}.out.toml",
            demo_path.file_stem().unwrap().to_string_lossy()
        );
        let output_path = temp_dir.path().join(output_filename);

        let args = Args {
            input: demo_path.to_string_lossy().to_string(),
            output: output_path.to_string_lossy().to_string(),
            config: None,
            log_level: "off".to_string(),
        };

        if run(&args).is_ok() {
            unexpectedly_succeeded.push(demo_path.clone());
        }
    }

    if !unexpectedly_succeeded.is_empty() {
        eprintln!("\nError demos that unexpectedly succeeded:");
        for path in &unexpectedly_succeeded {
            eprintln!("  - {}", path.display());
        }
        panic!(
            "{} error demo(s) succeeded unexpectedly",
            unexpectedly_succeeded.len()
        );
    }

    println!("All {} error demos failed as expected", error_demos.len());
}

#[test]
fn e2e_missing_input_fails() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let args = Args {
        input: temp_dir.path().join("nope.toml").to_string_lossy().to_string(),
        output: temp_dir.path().join("out.toml").to_string_lossy().to_string(),
        config: None,
        log_level: "off".to_string(),
    };

    assert!(run(&args).is_err());
}

#[test]
fn e2e_recovered_issues_are_counted() {
    let temp_dir = tempdir().expect("Failed to create temp directory");

    let run_demo = |name: &str| {
        let args = Args {
            input: demos_path().join(name).to_string_lossy().to_string(),
            output: temp_dir
                .path()
                .join(format!("{name}.out"))
                .to_string_lossy()
                .to_string(),
            config: None,
            log_level: "off".to_string(),
        };
        run(&args).expect("demo composes")
    };

    // The parts list cannot meet its height limit and is reported.
    let failed_list = run_demo("freeform_callout.toml");
    assert_eq!(failed_list.issues, 1);
    assert!(failed_list.elements > 0);

    let clean = run_demo("single_step.toml");
    assert_eq!(clean.issues, 0);
}
