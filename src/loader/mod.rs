//! Backend loaders and the resolver that dispatches between them.
//!
//! Five backends normalize their formats into the same [`BucketMap`] shape:
//! local directories, zip archives, git repositories, HTML package tables
//! and name-to-URL redirect documents.

pub mod dir;
pub mod git;
pub mod html;
pub mod redirect;
pub mod zip;

use anyhow::Result;
use std::path::Path;

use crate::cache::CacheStore;
use crate::model::{AppManifest, BucketMap, SourceKind, SourceRef};

/// Loads buckets from a source, choosing the backend from the explicit kind
/// or, failing that, from the shape of the path.
///
/// Explicit kinds:
/// - `buckets` with a `.json` path is a redirect document; any other path is
///   a root directory whose subdirectories are buckets.
/// - `html` always goes to the table scraper.
///
/// Inferred (no kind): remote paths map `.html`/`.htm` to the scraper,
/// `.zip` and zipball URLs to the archive reader (through the cache) and
/// everything else to git; local paths map the same extensions to their
/// readers and everything else to a single bucket directory.
#[tracing::instrument(skip(cache))]
pub async fn resolve(cache: &CacheStore, source: &SourceRef) -> Result<BucketMap> {
    let path = source.path.as_str();

    match source.kind {
        Some(SourceKind::Buckets) => {
            if path.ends_with(".json") {
                redirect::load_buckets(cache, path).await
            } else {
                dir::load_buckets(Path::new(path)).await
            }
        }
        Some(SourceKind::Html) => html::load_buckets(cache, path).await,
        None if path.contains("://") => {
            if path.ends_with(".html") || path.ends_with(".htm") {
                html::load_buckets(cache, path).await
            } else if path.ends_with(".zip") || path.contains("/zipball/") {
                Ok(single_bucket(
                    path,
                    zip::load_app_list_from_url(cache, path).await?,
                ))
            } else {
                Ok(single_bucket(path, git::load_app_list(cache, path).await?))
            }
        }
        None => {
            if path.ends_with(".html") || path.ends_with(".htm") {
                html::load_buckets(cache, path).await
            } else if path.ends_with(".zip") {
                Ok(single_bucket(path, zip::load_app_list(Path::new(path))?))
            } else {
                Ok(single_bucket(path, dir::load_app_list(Path::new(path))?))
            }
        }
    }
}

fn single_bucket(key: &str, apps: Vec<AppManifest>) -> BucketMap {
    BucketMap::from([(key.to_string(), apps)])
}
