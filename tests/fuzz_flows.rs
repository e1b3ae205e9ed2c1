#![cfg(unix)]

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use gridfuzz::{
    Config, FuzzOptions, GeneratorKind, GridFuzzDuration, GridFuzzError, StopReason, fuzz,
};

fn temp_workspace(name: &str) -> PathBuf {
    let root = std::env::temp_dir().join(format!("gridfuzz-flows-{name}-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&root).expect("create temp workspace");
    root
}

fn seed_corpus(ws: &Path) -> PathBuf {
    let dir = ws.join("Example_maps");
    std::fs::create_dir_all(&dir).expect("create corpus");
    std::fs::write(dir.join("small.map"), "0000\n0F00\n000M\n").expect("write seed");
    std::fs::write(dir.join("wide.map"), "WWWWWWWW\nW0P0F00W\nWWWWWWWW\n").expect("write seed");
    dir
}

fn sh_target(script: &str) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        script.to_string(),
        "target".to_string(),
    ]
}

fn config(ws: &Path, script: &str) -> Config {
    Config {
        base_dir: ws.to_path_buf(),
        corpus_dir: PathBuf::from("Example_maps"),
        target: sh_target(script),
        target_timeout: GridFuzzDuration(Duration::from_secs(5)),
        ..Config::default()
    }
}

fn runs(n: u64, seed: u64) -> FuzzOptions {
    FuzzOptions {
        seed: Some(seed),
        max_iterations: Some(n),
        max_time: Some(Duration::from_secs(120)),
        ..FuzzOptions::default()
    }
}

fn count_log_blocks(log: &str) -> usize {
    log.matches("\nfuzzed filename: ").count()
}

fn archived_maps(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .expect("read archive dir")
        .map(|e| e.expect("entry").file_name().to_string_lossy().to_string())
        .collect();
    names.sort();
    names
}

fn leftover_candidates(ws: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(ws)
        .expect("read workspace")
        .map(|e| e.expect("entry").path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("fuzzed") && n.ends_with(".map"))
        })
        .collect()
}

#[test]
fn clean_target_archives_nothing() {
    let ws = temp_workspace("clean");
    seed_corpus(&ws);
    let summary = fuzz(&config(&ws, "exit 0"), &runs(25, 1)).expect("fuzz");

    assert_eq!(summary.iterations, 25);
    assert_eq!(summary.stop_reason, StopReason::IterationLimitReached);
    assert_eq!(summary.stats.normal, 25);
    assert_eq!(summary.stats.abnormal, 0);
    assert!(summary.archived.is_empty());
    assert!(archived_maps(&ws.join("fuzzed_maps")).is_empty());

    let log = std::fs::read_to_string(ws.join("fuzzing1.log")).expect("log");
    assert_eq!(count_log_blocks(&log), 0);
    assert!(leftover_candidates(&ws).is_empty());
    assert!(ws.join("fuzzing1.json").exists());
}

#[test]
fn failing_target_archives_every_iteration() {
    let ws = temp_workspace("failing");
    seed_corpus(&ws);
    let summary = fuzz(&config(&ws, "echo crashed; exit 2"), &runs(10, 2)).expect("fuzz");

    let expected: Vec<String> = {
        let mut v: Vec<String> = (0..10).map(|i| format!("fuzz_{i}.map")).collect();
        v.sort();
        v
    };
    assert_eq!(archived_maps(&ws.join("fuzzed_maps")), expected);
    assert_eq!(summary.archived.len(), 10);
    assert_eq!(summary.stats.exit_codes.get(&2), Some(&10));
    assert_eq!(summary.stats.stdout.len(), 1);

    let log = std::fs::read_to_string(ws.join("fuzzing1.log")).expect("log");
    assert_eq!(count_log_blocks(&log), 10);
    for i in 0..10 {
        assert!(log.contains(&format!("fuzzed filename: fuzz_{i}.map\n")));
    }
    assert!(log.contains("stdout: crashed\n"));
    assert!(leftover_candidates(&ws).is_empty());
}

#[test]
fn hanging_target_is_killed_and_recorded() {
    let ws = temp_workspace("hang");
    seed_corpus(&ws);
    let mut cfg = config(&ws, "exec sleep 30");
    cfg.target_timeout = GridFuzzDuration(Duration::from_millis(200));

    let summary = fuzz(&cfg, &runs(2, 3)).expect("fuzz");
    assert_eq!(summary.stats.exit_codes.get(&-1), Some(&2));
    assert_eq!(summary.stats.faults.get("timeout"), Some(&2));
    assert_eq!(summary.archived.len(), 2);

    let log = std::fs::read_to_string(ws.join("fuzzing1.log")).expect("log");
    assert_eq!(count_log_blocks(&log), 2);
    assert!(log.contains("stderr: Execution timed out\n"));
    assert!(log.contains("return_code: -1\n"));
    assert!(leftover_candidates(&ws).is_empty());
}

#[test]
fn wrapper_targets_with_lingering_children_still_time_out() {
    for script in ["sleep 30; true", "sleep 30 & exit 0"] {
        let ws = temp_workspace("wrapper-hang");
        seed_corpus(&ws);
        let mut cfg = config(&ws, script);
        cfg.target_timeout = GridFuzzDuration(Duration::from_millis(200));

        let started = Instant::now();
        let summary = fuzz(&cfg, &runs(2, 3)).expect("fuzz");
        assert!(started.elapsed() < Duration::from_secs(5), "{script}: {:?}", started.elapsed());
        assert_eq!(summary.iterations, 2, "{script}");
        assert_eq!(summary.stats.faults.get("timeout"), Some(&2), "{script}");
        assert_eq!(summary.archived.len(), 2, "{script}");
        assert!(leftover_candidates(&ws).is_empty(), "{script}");
    }
}

#[test]
fn archive_failure_stops_the_session_and_keeps_the_candidate() {
    let ws = temp_workspace("archive-failure");
    seed_corpus(&ws);
    // The target swaps the session log for a directory, so the log append fails.
    let script = r#"d=$(dirname "$1"); rm -f "$d/fuzzing1.log"; mkdir "$d/fuzzing1.log"; exit 1"#;
    let err = fuzz(&config(&ws, script), &runs(5, 10)).expect_err("archive must fail");

    assert!(matches!(err, GridFuzzError::Archive(_)), "{err}");
    assert!(ws.join("fuzzed1_0.map").is_file());
    assert!(!ws.join("fuzzed1_1.map").exists());
    assert!(archived_maps(&ws.join("fuzzed_maps")).is_empty());
    assert!(!ws.join("fuzzing1.json").exists());
}

#[test]
fn empty_corpus_aborts_before_any_session() {
    let ws = temp_workspace("empty");
    std::fs::create_dir_all(ws.join("Example_maps")).expect("mkdir");
    let err = fuzz(&config(&ws, "exit 0"), &runs(5, 4)).expect_err("must fail");
    assert!(matches!(err, GridFuzzError::CorpusEmpty { .. }), "{err}");
    assert!(!ws.join("fuzzed_maps").exists());
    assert!(!ws.join("fuzzing1.log").exists());
}

#[test]
fn time_budget_stops_the_loop() {
    let ws = temp_workspace("budget");
    seed_corpus(&ws);
    let opt = FuzzOptions {
        seed: Some(5),
        max_iterations: Some(u64::MAX),
        max_time: Some(Duration::from_millis(300)),
        ..FuzzOptions::default()
    };
    let summary = fuzz(&config(&ws, "exit 0"), &opt).expect("fuzz");
    assert_eq!(summary.stop_reason, StopReason::TimeLimitReached);
    assert!(summary.iterations > 0);
    assert!(leftover_candidates(&ws).is_empty());
}

#[test]
fn same_seed_replays_the_same_session() {
    let script = r#"cat "$1"; echo "$2"; exit 1"#;

    let ws_a = temp_workspace("seed-a");
    seed_corpus(&ws_a);
    let a = fuzz(&config(&ws_a, script), &runs(8, 99)).expect("fuzz a");

    let ws_b = temp_workspace("seed-b");
    seed_corpus(&ws_b);
    let b = fuzz(&config(&ws_b, script), &runs(8, 99)).expect("fuzz b");

    assert_eq!(a.stats.stdout.keys().collect::<Vec<_>>(), b.stats.stdout.keys().collect::<Vec<_>>());
    assert_eq!(a.archived, b.archived);
    assert_eq!(a.ops, b.ops);
    for i in 0..8 {
        let name = format!("fuzz_{i}.map");
        let fa = std::fs::read(ws_a.join("fuzzed_maps").join(&name)).expect("read a");
        let fb = std::fs::read(ws_b.join("fuzzed_maps").join(&name)).expect("read b");
        assert_eq!(fa, fb, "{name}");
    }
}

#[test]
fn archived_map_is_what_the_target_saw() {
    let ws = temp_workspace("seen");
    seed_corpus(&ws);
    let summary = fuzz(&config(&ws, r#"cat "$1"; exit 7"#), &runs(5, 6)).expect("fuzz");
    assert_eq!(summary.archived.len(), 5);

    let log = std::fs::read_to_string(ws.join("fuzzing1.log")).expect("log");
    for crash in &summary.archived {
        let map = std::fs::read_to_string(ws.join("fuzzed_maps").join(&crash.file_name))
            .expect("archived map");
        assert!(log.contains(&format!("stdout: {map}\n")), "{}", crash.file_name);
    }
}

#[test]
fn second_session_gets_its_own_directory() {
    let ws = temp_workspace("sessions");
    seed_corpus(&ws);
    let cfg = config(&ws, "exit 1");
    let first = fuzz(&cfg, &runs(1, 7)).expect("first");
    let second = fuzz(&cfg, &runs(1, 7)).expect("second");

    assert!(first.output_dir.ends_with("fuzzed_maps"));
    assert!(second.output_dir.ends_with("fuzzed_maps2"));
    assert!(ws.join("fuzzing2.log").exists());
    assert_eq!(archived_maps(&ws.join("fuzzed_maps2")), vec!["fuzz_0.map".to_string()]);
}

#[test]
fn random_grid_generator_needs_no_corpus() {
    let ws = temp_workspace("random-grid");
    let opt = FuzzOptions {
        generator: Some(GeneratorKind::RandomGrid),
        ..runs(3, 8)
    };
    let summary = fuzz(&config(&ws, "exit 0"), &opt).expect("fuzz");
    assert_eq!(summary.iterations, 3);
    assert_eq!(summary.generator, GeneratorKind::RandomGrid);
    assert!(summary.ops.applied.is_empty() && summary.ops.noop.is_empty());
}

#[test]
fn missing_target_program_is_archived_as_launch_failure() {
    let ws = temp_workspace("launch");
    seed_corpus(&ws);
    let cfg = Config {
        target: vec!["/nonexistent/gridfuzz-target".to_string()],
        ..config(&ws, "exit 0")
    };
    let summary = fuzz(&cfg, &runs(2, 9)).expect("fuzz");
    assert_eq!(summary.stats.exit_codes.get(&-1), Some(&2));
    assert_eq!(summary.stats.faults.get("launch"), Some(&2));
    let log = std::fs::read_to_string(ws.join("fuzzing1.log")).expect("log");
    assert!(log.contains("stderr: Error: "));
}
