//! Builds driven by the source scanner across process restarts.

use std::fs;
use std::sync::Arc;

use sitegen_lib::generate::{Concurrency, GenerateError, GenerateOptions, GenerateSummary, Generator};
use sitegen_lib::route::Router;
use sitegen_lib::source::SourceScanner;

use super::common::TestSite;

fn write_source(site: &TestSite, path: &str, content: &str) {
  let file = site.temp.path().join("source").join(path);
  fs::create_dir_all(file.parent().unwrap()).unwrap();
  fs::write(file, content).unwrap();
}

/// Scan and build the way a fresh `generate` invocation does.
async fn build(site: &mut TestSite, options: GenerateOptions) -> Result<GenerateSummary, GenerateError> {
  site.reopen_cache();
  site.router = Arc::new(Router::new());

  let scanner = Arc::new(SourceScanner::new(
    site.temp.path().join("source"),
    site.router.clone(),
    site.cache.clone(),
  ));
  scanner.scan().unwrap();

  let generator = Arc::new(
    Generator::new(site.public_dir(), site.router.clone(), site.cache.clone(), options).with_observer(scanner),
  );
  generator.first_generate().await
}

fn bail_one_at_a_time() -> GenerateOptions {
  GenerateOptions {
    bail: true,
    concurrency: Concurrency::limited(1).unwrap(),
    ..GenerateOptions::default()
  }
}

#[tokio::test]
async fn bailed_build_converges_once_the_blocker_is_gone() {
  let mut site = TestSite::new();
  write_source(&site, "a.css", "a1");
  write_source(&site, "z.css", "z1");
  assert_eq!(build(&mut site, bail_one_at_a_time()).await.unwrap().generated(), 2);

  write_source(&site, "a.css", "a2");
  write_source(&site, "z.css", "z2");
  fs::remove_file(site.public_dir().join("a.css")).unwrap();
  fs::create_dir_all(site.public_dir().join("a.css")).unwrap();

  let err = build(&mut site, bail_one_at_a_time()).await.unwrap_err();
  assert!(matches!(err, GenerateError::Write { .. }));
  assert_eq!(site.read_public("z.css").as_deref(), Some("z1"));

  fs::remove_dir(site.public_dir().join("a.css")).unwrap();
  let summary = build(&mut site, bail_one_at_a_time()).await.unwrap();

  assert_eq!(summary.generated(), 2);
  assert_eq!(site.read_public("a.css").as_deref(), Some("a2"));
  assert_eq!(site.read_public("z.css").as_deref(), Some("z2"));

  let summary = build(&mut site, bail_one_at_a_time()).await.unwrap();
  assert_eq!(summary.generated(), 0);
}

#[tokio::test]
async fn only_failed_paths_are_retried_without_bail() {
  let mut site = TestSite::new();
  write_source(&site, "a.css", "a1");
  write_source(&site, "z.css", "z1");
  build(&mut site, GenerateOptions::default()).await.unwrap();

  write_source(&site, "a.css", "a2");
  write_source(&site, "z.css", "z2");
  fs::remove_file(site.public_dir().join("a.css")).unwrap();
  fs::create_dir_all(site.public_dir().join("a.css")).unwrap();

  let summary = build(&mut site, GenerateOptions::default()).await.unwrap();
  assert_eq!(summary.failed.len(), 1);
  assert_eq!(site.read_public("z.css").as_deref(), Some("z2"));

  fs::remove_dir(site.public_dir().join("a.css")).unwrap();
  let summary = build(&mut site, GenerateOptions::default()).await.unwrap();

  assert_eq!(summary.generated(), 1);
  assert_eq!(summary.skipped, 1);
  assert_eq!(site.read_public("a.css").as_deref(), Some("a2"));
}
