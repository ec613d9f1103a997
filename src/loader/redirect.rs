//! Loading buckets referenced by a `buckets.json`-style redirect document: a
//! flat JSON object mapping bucket names to source URLs.

use anyhow::{Context, Result};
use log::warn;
use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::cache::CacheStore;
use crate::model::{BucketMap, NameSourceMap, SourceCondition, SourceRef};

/// Reads a flat name-to-URL mapping document. Non-string values are dropped.
pub fn load_name_source_map(path: &Path) -> Result<NameSourceMap> {
    let body = fs::read(path)
        .with_context(|| format!("failed to read redirect file {}", path.display()))?;
    let value: Value = serde_json::from_slice(&body)
        .with_context(|| format!("invalid JSON in {}", path.display()))?;

    let mut map = NameSourceMap::new();
    if let Some(object) = value.as_object() {
        for (name, source) in object {
            if let Some(url) = source.as_str() {
                map.insert(name.clone(), url.to_string());
            }
        }
    }
    Ok(map)
}

/// Resolves every source the redirect document points at and unions the
/// resulting buckets. Keys are the resolved source identities themselves, so
/// collisions only happen when two names point at the same source.
pub async fn load_buckets(cache: &CacheStore, path: &str) -> Result<BucketMap> {
    let map = load_name_source_map(Path::new(path))?;

    let mut buckets = BucketMap::new();
    for (name, source_url) in &map {
        let source = SourceRef::new(SourceCondition::Always, None, source_url.clone());
        match Box::pin(super::resolve(cache, &source)).await {
            Ok(more) => buckets.extend(more),
            Err(err) => warn!(
                "skipping redirected bucket {} ({}): {:#}",
                name, source_url, err
            ),
        }
    }
    Ok(buckets)
}
