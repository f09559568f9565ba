//! End-to-end tests for the harness: syslog capture, assertions and case
//! execution against a stand-in pipeline executable.

use std::fs;
use std::net::UdpSocket;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nftest_core::{
    AssertMethod, Assertion, CaseOutcome, FailureKind, HarnessEnv, RelayConfig, SyslogServer,
    TestFile, TestRunner,
};
use tracing_test::traced_test;

fn quick_relay() -> RelayConfig {
    RelayConfig {
        poll_interval: Duration::from_millis(50),
        ..RelayConfig::default()
    }
}

/// Write an executable stand-in for the pipeline.
///
/// It prints a line, waits long enough for file timestamps to move past the
/// assertion baseline, then writes `contents` to `result.txt` inside the
/// directory passed as its last argument.
fn fake_pipeline(dir: &Path, contents: &str, exit_code: i32) -> PathBuf {
    let path = dir.join("fake-pipeline");
    let script = format!(
        "#!/bin/sh\nfor arg; do out=\"$arg\"; done\necho \"fake pipeline running\"\nsleep 1\nmkdir -p \"$out\"\nprintf '{contents}' > \"$out/result.txt\"\nexit {exit_code}\n"
    );
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn harness_env(root: &Path, pipeline: &Path) -> HarnessEnv {
    let mut env = HarnessEnv::from_lookup(|_| None, root.to_path_buf());
    env.output_dir = root.join("out");
    env.temp_dir = root.join("work");
    env.pipeline = pipeline.to_string_lossy().into_owned();
    env
}

fn test_file(root: &Path, cases: &str) -> TestFile {
    let yaml = format!(
        "global:\n  temp_dir: {work}\n  clean_logs: false\ncases:\n{cases}",
        work = root.join("work").display()
    );
    TestFile::parse(&yaml, Path::new("nftest.yml")).unwrap()
}

#[tokio::test]
#[traced_test]
async fn test_relay_relevels_pipeline_records() {
    let config = quick_relay();
    let server = SyslogServer::bind(&config).await.unwrap();
    let addr = server.local_addr();
    let mut relay = server.start(config.poll_interval);

    let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
    sender
        .send_to(
            b"<132>Jan 3 12:00:25 ip-0A125232 nextflow: ERROR [main] Launcher - Unable to launch",
            addr,
        )
        .unwrap();
    sender.send_to(b"not a syslog line", addr).unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    relay.shutdown().await;

    assert!(logs_contain("WARN"));
    assert!(logs_contain("Unable to launch"));
    assert!(logs_contain("main"));
    assert!(logs_contain("ip-0A125232"));
    assert!(logs_contain("not a syslog line"));
    assert!(!logs_contain("Launcher -"));
}

#[tokio::test]
#[traced_test]
async fn test_script_output_only_logged_for_script_method() {
    let dir = tempfile::tempdir().unwrap();
    let actual = dir.path().join("actual.txt");
    let expect = dir.path().join("expect.txt");
    fs::write(&expect, "same\n").unwrap();
    fs::write(&actual, "same\n").unwrap();
    let baseline = chrono::Utc::now() - chrono::Duration::seconds(60);

    let compare = dir.path().join("compare.sh");
    fs::write(
        &compare,
        "#!/bin/sh\necho OUT-MARK-7f3a\necho ERR-MARK-9c1e >&2\nexit 0\n",
    )
    .unwrap();
    fs::set_permissions(&compare, fs::Permissions::from_mode(0o755)).unwrap();

    let checksum = Assertion::with_creation_time(
        actual.to_string_lossy(),
        expect.to_string_lossy(),
        AssertMethod::Checksum,
        baseline,
    );
    checksum.perform().await.unwrap();
    assert!(!logs_contain("OUT-MARK-7f3a"));
    assert!(!logs_contain("ERR-MARK-9c1e"));

    let script = Assertion::with_creation_time(
        actual.to_string_lossy(),
        expect.to_string_lossy(),
        AssertMethod::Script { path: compare },
        baseline,
    );
    script.perform().await.unwrap();

    logs_assert(|lines: &[&str]| {
        let level_of = |mark: &str| {
            lines
                .iter()
                .find(|line| line.contains(mark))
                .ok_or_else(|| format!("{mark} was not logged"))
                .map(|line| line.to_string())
        };
        let out = level_of("OUT-MARK-7f3a")?;
        if !out.contains("DEBUG") {
            return Err(format!("script stdout not at DEBUG: {out}"));
        }
        let err = level_of("ERR-MARK-9c1e")?;
        if !err.contains("ERROR") {
            return Err(format!("script stderr not at ERROR: {err}"));
        }
        Ok(())
    });
}

#[tokio::test]
#[traced_test]
async fn test_case_passes_with_fresh_matching_output() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = fake_pipeline(dir.path(), "hello\\n", 0);
    let expected = dir.path().join("expected.txt");
    fs::write(&expected, "hello\n").unwrap();

    let file = test_file(
        dir.path(),
        &format!(
            "  - name: produce result\n    nf_script: main.nf\n    asserts:\n      - actual: result.txt\n        expect: {}\n",
            expected.display()
        ),
    );
    let runner = TestRunner::new(file, &[]);
    let env = harness_env(dir.path(), &pipeline);

    let outcome = runner.cases()[0].run(&env).await;
    assert!(matches!(outcome, CaseOutcome::Passed), "{outcome:?}");
    assert!(dir.path().join("out/produce-result/result.txt").exists());
    assert!(logs_contain("fake pipeline running"));
    assert!(logs_contain("-syslog 127.0.0.1:"));
}

#[tokio::test]
#[traced_test]
async fn test_mismatch_and_pipeline_failure_are_reported() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().join("expected.txt");
    fs::write(&expected, "hello\n").unwrap();
    let cases = format!(
        "  - name: mismatch\n    nf_script: main.nf\n    asserts:\n      - actual: result.txt\n        expect: {}\n",
        expected.display()
    );

    let pipeline = fake_pipeline(dir.path(), "goodbye\\n", 0);
    let env = harness_env(dir.path(), &pipeline);
    let report = TestRunner::new(test_file(dir.path(), &cases), &[]).run(&env).await;
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::MismatchedContents);
    assert!(logs_contain("Assertion failed"));

    let mut env = env;
    env.pipeline = "false".to_string();
    let report = TestRunner::new(test_file(dir.path(), &cases), &[]).run(&env).await;
    assert_eq!(report.failed[0].kind, FailureKind::PipelineFailed);

    let report_path = dir.path().join("report.json");
    report.write_to(&report_path).unwrap();
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(report_path).unwrap()).unwrap();
    assert_eq!(written["failed"][0]["kind"], "pipeline_failed");
    assert_eq!(written["success"], false);
}

#[tokio::test]
#[traced_test]
async fn test_stale_output_is_not_updated() {
    let dir = tempfile::tempdir().unwrap();
    let expected = dir.path().join("expected.txt");
    fs::write(&expected, "hello\n").unwrap();

    // Output already present from an earlier run, and the pipeline writes nothing.
    let out = dir.path().join("out").join("stale");
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("result.txt"), "hello\n").unwrap();

    let cases = format!(
        "  - name: stale\n    nf_script: main.nf\n    asserts:\n      - actual: result.txt\n        expect: {}\n",
        expected.display()
    );
    let env = harness_env(dir.path(), Path::new("true"));
    let report = TestRunner::new(test_file(dir.path(), &cases), &[]).run(&env).await;

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].kind, FailureKind::NotUpdated);
}
