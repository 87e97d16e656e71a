//! sitegen-lib: incremental static site generation
//!
//! This crate turns a table of routes into files in a public directory:
//! - `route`: the route table and its change events
//! - `cache`: content hashes of previously written outputs
//! - `generate`: the hash-gated build, its scheduler and the watch loop
//! - `source`: publishes the files of a source directory as routes
//! - `deploy`, `clean`, `config`: the site-level operations around a build

pub mod cache;
pub mod clean;
pub mod config;
pub mod consts;
pub mod deploy;
pub mod generate;
pub mod route;
pub mod source;
pub mod util;
