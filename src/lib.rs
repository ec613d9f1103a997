//! scoopfind searches scoop-style buckets across heterogeneous sources:
//! local bucket directories, zip archives, remote git repositories, HTML
//! directory pages and name-to-URL redirect documents.
//!
//! The pipeline: parse `--source` specs into [`model::SourceRef`]s, have
//! [`loader::resolve`] normalize each backend into one [`model::BucketMap`]
//! shape (caching downloads via [`cache::CacheStore`]), then let
//! [`search::SearchState`] filter, rank and merge the results.

pub mod cache;
pub mod config;
pub mod loader;
pub mod manifest;
pub mod model;
pub mod output;
pub mod search;
