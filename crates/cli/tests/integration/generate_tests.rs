//! Generate command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn generate_writes_public_files() {
  let env = TestEnv::with_sources(&[("index.html", "home"), ("css/site.css", "body {}")]);

  env
    .sitegen_cmd()
    .arg("generate")
    .assert()
    .success()
    .stdout(predicate::str::contains("2 files generated"))
    .stderr(predicate::str::contains("Generated: index.html"));

  assert_eq!(env.read_public("index.html").as_deref(), Some("home"));
  assert_eq!(env.read_public("css/site.css").as_deref(), Some("body {}"));
  assert!(env.root().join("db.json").exists());
}

#[test]
fn second_run_generates_nothing() {
  let env = TestEnv::with_sources(&[("a.html", "a"), ("b.html", "b")]);

  env.sitegen_cmd().arg("generate").assert().success();

  env
    .sitegen_cmd()
    .arg("generate")
    .assert()
    .success()
    .stdout(predicate::str::contains("0 files generated"));
}

#[test]
fn changed_source_is_regenerated() {
  let env = TestEnv::with_sources(&[("a.html", "a"), ("b.html", "b")]);
  env.sitegen_cmd().arg("generate").assert().success();

  env.write_source("a.html", "a, edited");

  env
    .sitegen_cmd()
    .arg("generate")
    .assert()
    .success()
    .stdout(predicate::str::contains("1 files generated"));
  assert_eq!(env.read_public("a.html").as_deref(), Some("a, edited"));
}

#[test]
fn deleted_source_removes_output() {
  let env = TestEnv::with_sources(&[("a.html", "a"), ("old.html", "old")]);
  env.sitegen_cmd().arg("generate").assert().success();

  std::fs::remove_file(env.root().join("source/old.html")).unwrap();

  env
    .sitegen_cmd()
    .arg("generate")
    .assert()
    .success()
    .stderr(predicate::str::contains("Deleted: old.html"));
  assert!(env.read_public("old.html").is_none());
  assert!(env.read_public("a.html").is_some());
}

#[test]
fn force_rewrites_everything() {
  let env = TestEnv::with_sources(&[("a.html", "a"), ("b.html", "b")]);
  env.sitegen_cmd().arg("generate").assert().success();

  env
    .sitegen_cmd()
    .args(["generate", "--force"])
    .assert()
    .success()
    .stdout(predicate::str::contains("2 files generated"));
}

#[test]
fn ignored_sources_are_not_published() {
  let env = TestEnv::with_sources(&[("index.html", "home"), ("_partials/header.html", "hdr")]);

  env.sitegen_cmd().arg("generate").assert().success();

  assert!(env.read_public("index.html").is_some());
  assert!(env.read_public("_partials/header.html").is_none());
}

#[test]
fn config_public_dir_is_used() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);
  env.write_config("public_dir = \"dist\"\n\n[generate]\nconcurrency = 2\n");

  env.sitegen_cmd().arg("generate").assert().success();

  assert!(env.root().join("dist/index.html").exists());
  assert!(!env.root().join("public").exists());
}

#[test]
fn invalid_config_fails() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);
  env.write_config("[watch]\ninterval_ms = 0\n");

  env
    .sitegen_cmd()
    .arg("generate")
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to load site config"));
}

#[test]
fn public_path_that_is_a_file_is_reported_once() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);
  env.write_file("public", "not a directory");

  let assert = env.sitegen_cmd().arg("generate").assert().failure();

  let stderr = String::from_utf8_lossy(&assert.get_output().stderr).into_owned();
  assert_eq!(stderr.matches("is not a directory").count(), 1, "{}", stderr);
  assert!(!stderr.contains("Generate failed"), "{}", stderr);
}

#[test]
fn failed_build_is_retried_on_the_next_run() {
  let env = TestEnv::with_sources(&[("a.css", "a1"), ("z.css", "z1")]);
  env.sitegen_cmd().args(["generate", "--bail", "-c", "1"]).assert().success();

  env.write_source("a.css", "a2");
  env.write_source("z.css", "z2");
  std::fs::remove_file(env.public_path("a.css")).unwrap();
  std::fs::create_dir_all(env.public_path("a.css")).unwrap();
  env.sitegen_cmd().args(["generate", "--bail", "-c", "1"]).assert().failure();

  std::fs::remove_dir(env.public_path("a.css")).unwrap();
  env.sitegen_cmd().args(["generate", "--bail", "-c", "1"]).assert().success();

  assert_eq!(env.read_public("a.css").as_deref(), Some("a2"));
  assert_eq!(env.read_public("z.css").as_deref(), Some("z2"));
}

#[test]
fn json_output_lists_written_files() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);

  env
    .sitegen_cmd()
    .args(["-o", "json", "generate"])
    .assert()
    .success()
    .stdout(predicate::str::contains("\"written\""))
    .stdout(predicate::str::contains("index.html"));
}

#[test]
fn deploy_without_command_fails() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);

  env
    .sitegen_cmd()
    .args(["generate", "--deploy"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("[deploy] command"));

  assert!(env.read_public("index.html").is_none());
}

#[cfg(unix)]
#[test]
fn deploy_runs_configured_command() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);
  env.write_config("[deploy]\ncommand = \"cp \\\"$SITEGEN_PUBLIC_DIR/index.html\\\" deployed.html\"\n");

  env.sitegen_cmd().args(["generate", "--deploy"]).assert().success();

  let deployed = std::fs::read_to_string(env.root().join("deployed.html")).unwrap();
  assert_eq!(deployed, "home");
}

#[cfg(unix)]
#[test]
fn failing_deploy_fails_the_command() {
  let env = TestEnv::with_sources(&[("index.html", "home")]);
  env.write_config("[deploy]\ncommand = \"exit 7\"\n");

  env
    .sitegen_cmd()
    .args(["generate", "-d"])
    .assert()
    .failure()
    .stderr(predicate::str::contains("exit code"));

  assert_eq!(env.read_public("index.html").as_deref(), Some("home"));
}
