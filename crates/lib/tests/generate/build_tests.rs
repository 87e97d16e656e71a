//! Full build behavior: idempotence, hash gating, force and stale cleanup.

use std::sync::Arc;

use sitegen_lib::cache::{CacheRecord, MetadataStore};
use sitegen_lib::generate::{FileOutcome, GenerateOptions, Phase, Task};
use sitegen_lib::route::RouteSource;
use sitegen_lib::util::hash::hash_bytes;

use super::common::{RecordingDeployer, TestSite};

#[tokio::test]
async fn two_routes_then_nothing() {
  let site = TestSite::new();
  site.router.set("a.html", RouteSource::bytes("A"), true);
  site.router.set("b.html", RouteSource::bytes("B"), true);

  let summary = site.generator(GenerateOptions::default()).run().await.unwrap();

  assert_eq!(summary.generated(), 2);
  assert_eq!(site.read_public("a.html").as_deref(), Some("A"));
  assert_eq!(site.read_public("b.html").as_deref(), Some("B"));
  assert_eq!(site.cache.filter(&|r| r.id.starts_with("public/")).len(), 2);

  let again = site.generator(GenerateOptions::default()).run().await.unwrap();
  assert_eq!(again.generated(), 0);
  assert!(again.deleted.is_empty());
}

#[tokio::test]
async fn rerun_with_modified_but_identical_content_is_unchanged() {
  let site = TestSite::new();
  site.router.set("a.html", RouteSource::bytes("A"), true);
  site.generator(GenerateOptions::default()).run().await.unwrap();

  // Still flagged modified, so the content is hashed and compared
  let summary = site.generator(GenerateOptions::default()).run().await.unwrap();

  assert_eq!(summary.generated(), 0);
  assert_eq!(summary.unchanged, 1);
}

#[tokio::test]
async fn cache_survives_reopen() {
  let mut site = TestSite::new();
  site.router.set("a.html", RouteSource::bytes("A"), true);
  site.generator(GenerateOptions::default()).run().await.unwrap();

  site.reopen_cache();

  let record = site.cache.find_by_id("public/a.html").unwrap();
  assert_eq!(record.hash, hash_bytes(b"A").0);
  let summary = site.generator(GenerateOptions::default()).run().await.unwrap();
  assert_eq!(summary.generated(), 0);
}

#[tokio::test]
async fn missing_output_is_rewritten_despite_matching_hash() {
  let site = TestSite::new();
  site.router.set("a.html", RouteSource::bytes("A"), false);
  site.generator(GenerateOptions::default()).run().await.unwrap();

  std::fs::remove_file(site.public_dir().join("a.html")).unwrap();
  assert_eq!(site.cache.find_by_id("public/a.html").unwrap().hash, hash_bytes(b"A").0);

  let summary = site.generator(GenerateOptions::default()).run().await.unwrap();

  assert_eq!(summary.written, vec!["a.html".to_string()]);
  assert_eq!(site.read_public("a.html").as_deref(), Some("A"));
}

#[tokio::test]
async fn unmodified_route_with_existing_output_is_skipped() {
  let site = TestSite::new();
  site.write_public("a.html", "stale");
  site.router.set("a.html", RouteSource::bytes("fresh"), false);

  let summary = site.generator(GenerateOptions::default()).run().await.unwrap();

  assert_eq!(summary.skipped, 1);
  assert_eq!(site.read_public("a.html").as_deref(), Some("stale"));
}

#[tokio::test]
async fn force_rewrites_and_refreshes_cache() {
  let site = TestSite::new();
  site.write_public("a.html", "stale");
  site.write_public("b.html", "B");
  site.cache.save(CacheRecord::new("public/a.html", "bogus")).unwrap();
  site.cache.save(CacheRecord::new("public/b.html", hash_bytes(b"B").0)).unwrap();
  site.router.set("a.html", RouteSource::bytes("A"), false);
  site.router.set("b.html", RouteSource::bytes("B"), false);

  let options = GenerateOptions {
    force: true,
    ..GenerateOptions::default()
  };
  let summary = site.generator(options).run().await.unwrap();

  assert_eq!(summary.generated(), 2);
  assert_eq!(site.read_public("a.html").as_deref(), Some("A"));
  assert_eq!(site.cache.find_by_id("public/a.html").unwrap().hash, hash_bytes(b"A").0);
}

#[tokio::test]
async fn stale_output_is_deleted_not_generated() {
  let site = TestSite::new();
  site.write_public("old.html", "old");
  site.cache.save(CacheRecord::new("public/old.html", hash_bytes(b"old").0)).unwrap();
  site.router.set("a.html", RouteSource::bytes("A"), true);

  let generator = site.generator(GenerateOptions::default());
  assert_eq!(
    generator.plan_tasks(),
    vec![Task::Delete("old.html".to_string()), Task::Generate("a.html".to_string())]
  );

  let summary = generator.run().await.unwrap();

  assert_eq!(summary.deleted, vec!["old.html".to_string()]);
  assert_eq!(summary.written, vec!["a.html".to_string()]);
  assert!(site.read_public("old.html").is_none());
}

#[tokio::test]
async fn stale_records_accumulate_after_deletion() {
  let site = TestSite::new();
  site.router.set("old.html", RouteSource::bytes("old"), true);
  site.generator(GenerateOptions::default()).run().await.unwrap();

  site.router.remove("old.html");
  site.generator(GenerateOptions::default()).run().await.unwrap();

  // The output is gone but its record is kept; later builds re-issue a
  // delete that finds nothing.
  assert!(site.read_public("old.html").is_none());
  assert!(site.cache.find_by_id("public/old.html").is_some());

  let generator = site.generator(GenerateOptions::default());
  assert_eq!(generator.plan_tasks(), vec![Task::Delete("old.html".to_string())]);
  assert_eq!(generator.delete_file("old.html").await.unwrap(), FileOutcome::Absent);
}

#[tokio::test]
async fn nested_paths_create_directories() {
  let site = TestSite::new();
  site.router.set("blog/2024/post/index.html", RouteSource::bytes("post"), true);

  site.generator(GenerateOptions::default()).run().await.unwrap();

  assert_eq!(site.read_public("blog/2024/post/index.html").as_deref(), Some("post"));
}

#[tokio::test]
async fn file_sources_are_copied() {
  let site = TestSite::new();
  let asset = site.temp.path().join("logo.svg");
  std::fs::write(&asset, "<svg/>").unwrap();
  site.router.set("img/logo.svg", RouteSource::File(asset), true);

  site.generator(GenerateOptions::default()).run().await.unwrap();

  assert_eq!(site.read_public("img/logo.svg").as_deref(), Some("<svg/>"));
}

#[tokio::test]
async fn deploy_runs_after_build() {
  let site = TestSite::new();
  site.router.set("a.html", RouteSource::bytes("A"), true);
  let deployer = Arc::new(RecordingDeployer::default());

  let options = GenerateOptions {
    deploy: true,
    force: true,
    ..GenerateOptions::default()
  };
  let generator = Arc::new(
    sitegen_lib::generate::Generator::new(site.public_dir(), site.router.clone(), site.cache.clone(), options)
      .with_deployer(deployer.clone()),
  );
  generator.run().await.unwrap();

  let calls = deployer.calls.lock().unwrap();
  assert_eq!(calls.len(), 1);
  assert!(calls[0].force);
  assert_eq!(generator.phase(), Phase::Idle);
}

#[tokio::test]
async fn deploy_not_invoked_without_flag() {
  let site = TestSite::new();
  let deployer = Arc::new(RecordingDeployer::default());
  let generator = Arc::new(
    sitegen_lib::generate::Generator::new(
      site.public_dir(),
      site.router.clone(),
      site.cache.clone(),
      GenerateOptions::default(),
    )
    .with_deployer(deployer.clone()),
  );

  generator.run().await.unwrap();

  assert!(deployer.calls.lock().unwrap().is_empty());
}
