//! CLI tests driving the compiled binary.

use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

fn confb() -> Command {
    Command::new(env!("CARGO_BIN_EXE_confb"))
}

/// Command pre-wired to run inside `dir` against its `confb.yaml`.
fn confb_in(dir: &Path) -> Command {
    let mut cmd = confb();
    cmd.arg("--quiet").arg("-C").arg(dir).args(["-c", "confb.yaml"]);
    cmd
}

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn validate_reports_ok_for_valid_config() {
    let td = TempDir::new().unwrap();
    write_file(&td.path().join("a.txt"), "x\n");
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: cat
    format: raw
    output: ./out.txt
    sources:
      - path: ./a.txt
"#,
    );

    let output = confb_in(td.path())
        .arg("validate")
        .output()
        .expect("run confb validate");

    assert!(output.status.success(), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("validation OK"), "{stderr}");
}

#[test]
fn validate_trace_and_list_print_plan_details() {
    let td = TempDir::new().unwrap();
    write_file(&td.path().join("a.txt"), "x\n");
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: cat
    format: raw
    output: ./out.txt
    sources:
      - path: ./a.txt
"#,
    );

    let output = confb_in(td.path())
        .args(["validate", "--trace", "--list"])
        .output()
        .expect("run confb validate --trace --list");

    assert!(output.status.success(), "{output:?}");
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("confb: baseDir = "), "{stderr}");
    assert!(stderr.contains("confb: config = "), "{stderr}");
    assert!(stderr.contains("target: cat (format=raw"), "{stderr}");
    assert!(stderr.contains("validation OK"), "{stderr}");
}

#[test]
fn validate_lists_all_issues_and_fails() {
    let td = TempDir::new().unwrap();
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 7
targets:
  - name: ""
    format: wat
    output: ""
    sources: []
"#,
    );

    let output = confb_in(td.path())
        .arg("validate")
        .output()
        .expect("run confb validate");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("configuration invalid"), "{stderr}");
    assert!(stderr.contains("version must be 1"), "{stderr}");
    assert!(stderr.contains("format must be one of"), "{stderr}");
}

#[test]
fn build_writes_all_targets() {
    let td = TempDir::new().unwrap();
    write_file(&td.path().join("a.txt"), "hello\r\n");
    write_file(&td.path().join("b.ini"), "[sec]\nk=v\n");
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: cat
    format: raw
    output: ./out.txt
    sources:
      - path: ./a.txt
  - name: sec
    format: ini
    output: ./out.ini
    sources:
      - path: ./b.ini
    merge:
      rules:
        repeated_keys: last_wins
"#,
    );

    let output = confb_in(td.path())
        .arg("build")
        .output()
        .expect("run confb build");

    assert!(output.status.success(), "{output:?}");
    assert_eq!(
        fs::read_to_string(td.path().join("out.txt")).unwrap(),
        "hello\n"
    );
    assert_eq!(
        fs::read_to_string(td.path().join("out.ini")).unwrap(),
        "[sec]\nk=v\n"
    );
}

#[test]
fn dry_run_plans_but_writes_nothing() {
    let td = TempDir::new().unwrap();
    write_file(&td.path().join("a.txt"), "x\n");
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: cat
    format: raw
    output: ./out.txt
    sources:
      - path: ./a.txt
"#,
    );

    let output = confb_in(td.path())
        .args(["build", "--dry-run"])
        .output()
        .expect("run confb build --dry-run");

    assert!(output.status.success(), "{output:?}");
    assert!(!td.path().join("out.txt").exists());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("dry-run"), "{stderr}");
}

#[test]
fn build_fails_on_missing_required_source() {
    let td = TempDir::new().unwrap();
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: cat
    format: raw
    output: ./out.txt
    sources:
      - path: ./missing/*.txt
"#,
    );

    let output = confb_in(td.path())
        .arg("build")
        .output()
        .expect("run confb build");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("matched no files"), "{stderr}");
}

#[test]
fn output_override_redirects_single_target() {
    let td = TempDir::new().unwrap();
    write_file(&td.path().join("a.txt"), "x\n");
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: cat
    format: raw
    output: ./out.txt
    sources:
      - path: ./a.txt
"#,
    );

    let redirected = td.path().join("redirected.txt");
    let output = confb_in(td.path())
        .args(["build", "--output-override"])
        .arg(format!("cat={}", redirected.display()))
        .output()
        .expect("run confb build");

    assert!(output.status.success(), "{output:?}");
    assert!(redirected.is_file());
    assert!(!td.path().join("out.txt").exists());
}

#[test]
fn annotate_prepends_comment_header_for_ini() {
    let td = TempDir::new().unwrap();
    write_file(&td.path().join("b.ini"), "[sec]\nk=v\n");
    write_file(
        &td.path().join("confb.yaml"),
        r#"
version: 1
targets:
  - name: sec
    format: ini
    output: ./out.ini
    sources:
      - path: ./b.ini
    merge:
      rules:
        repeated_keys: append
"#,
    );

    let output = confb_in(td.path())
        .args(["build", "--annotate"])
        .output()
        .expect("run confb build --annotate");

    assert!(output.status.success(), "{output:?}");
    let content = fs::read_to_string(td.path().join("out.ini")).unwrap();
    assert!(content.starts_with("; confb build\n"), "{content}");
    assert!(content.contains("; merge.rules: repeated_keys=append"), "{content}");
    assert!(content.contains("sha256="), "{content}");
    assert!(content.contains("[sec]\nk=v\n"), "{content}");
}

#[test]
fn completions_generate_for_bash() {
    let output = confb()
        .args(["completions", "bash"])
        .output()
        .expect("run confb completions");

    assert!(output.status.success(), "{output:?}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("confb"), "{stdout}");
}

#[test]
fn reload_fails_cleanly_without_pidfile() {
    let td = TempDir::new().unwrap();
    let missing = td.path().join("nope.pid");

    let output = confb()
        .args(["reload", "--pid-file"])
        .arg(&missing)
        .output()
        .expect("run confb reload");

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not found"), "{stderr}");
}
