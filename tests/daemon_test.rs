//! Watch-mode end-to-end tests: initial build, debounced rebuild, hook runs.

use std::fs;
use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;

use confb::config;
use confb::daemon::{self, Options};

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Poll until `cond` holds or the deadline passes.
async fn wait_until(what: &str, timeout: Duration, mut cond: impl FnMut() -> bool) {
    let deadline = std::time::Instant::now() + timeout;
    while std::time::Instant::now() < deadline {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(40)).await;
    }
    panic!("timed out waiting for {what}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn raw_concat_rebuild_and_on_change() {
    let td = TempDir::new().unwrap();
    let src_a = td.path().join("src/a.txt");
    let src_b = td.path().join("src/b.txt");
    let out = td.path().join("out.txt");
    let marker = td.path().join("marker.txt");

    write_file(&src_a, "hello\r\n");
    write_file(&src_b, "world");

    let cfg_path = td.path().join("confb.yaml");
    write_file(
        &cfg_path,
        &format!(
            r#"
version: 1
targets:
  - name: raw
    format: raw
    output: '{out}'
    sources:
      - path: '{a}'
      - path: '{b}'
    on_change: echo done >> '{marker}'
"#,
            out = out.display(),
            a = src_a.display(),
            b = src_b.display(),
            marker = marker.display(),
        ),
    );

    let cfg = config::load(&cfg_path).unwrap();
    let daemon = tokio::spawn(daemon::run(
        cfg,
        Options {
            debounce: Duration::from_millis(120),
            config_path: cfg_path.clone(),
        },
    ));

    // Initial build: normalized concatenation, hook ran once.
    wait_until("initial output", Duration::from_secs(10), || {
        fs::read_to_string(&out).is_ok_and(|s| s == "hello\nworld\n")
    })
    .await;
    wait_until("initial hook", Duration::from_secs(10), || {
        fs::read_to_string(&marker).is_ok_and(|s| s.lines().count() == 1)
    })
    .await;

    // A burst of writes within one debounce window triggers exactly one
    // rebuild: the hook marker gains exactly one more line.
    fs::write(&src_b, "W").unwrap();
    fs::write(&src_b, "WO").unwrap();
    fs::write(&src_b, "WORLD!").unwrap();

    wait_until("rebuilt output", Duration::from_secs(10), || {
        fs::read_to_string(&out).is_ok_and(|s| s == "hello\nWORLD!\n")
    })
    .await;
    wait_until("rebuild hook", Duration::from_secs(10), || {
        fs::read_to_string(&marker).is_ok_and(|s| s.lines().count() == 2)
    })
    .await;

    // Rewriting identical content changes the mtime but not the hash: no
    // rewrite, no hook run.
    fs::write(&src_b, "WORLD!").unwrap();
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(fs::read_to_string(&out).unwrap(), "hello\nWORLD!\n");
    assert_eq!(fs::read_to_string(&marker).unwrap().lines().count(), 2);

    daemon.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn failed_rebuild_keeps_previous_output() {
    let td = TempDir::new().unwrap();
    let src = td.path().join("frag/base.json");
    let out = td.path().join("out.json");

    write_file(&src, r#"{"ok": true}"#);

    let cfg_path = td.path().join("confb.yaml");
    write_file(
        &cfg_path,
        &format!(
            r#"
version: 1
targets:
  - name: cfg
    format: json
    output: '{out}'
    sources:
      - path: '{src}'
    merge:
      rules: {{}}
"#,
            out = out.display(),
            src = src.display(),
        ),
    );

    let cfg = config::load(&cfg_path).unwrap();
    let daemon = tokio::spawn(daemon::run(
        cfg,
        Options {
            debounce: Duration::from_millis(80),
            config_path: cfg_path.clone(),
        },
    ));

    wait_until("initial output", Duration::from_secs(10), || out.is_file()).await;
    let initial = fs::read_to_string(&out).unwrap();

    // Break the fragment: the rebuild fails, the output must not change.
    fs::write(&src, "{ not json").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(fs::read_to_string(&out).unwrap(), initial);

    // Fix it again: the daemon recovers on the next change.
    fs::write(&src, r#"{"ok": false}"#).unwrap();
    wait_until("recovered output", Duration::from_secs(10), || {
        fs::read_to_string(&out).is_ok_and(|s| s.contains("false"))
    })
    .await;

    daemon.abort();
}
