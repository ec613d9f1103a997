//! Loading manifests from local directories.

use anyhow::{Context, Result};
use futures_util::future::join_all;
use log::warn;
use std::fs;
use std::path::Path;

use crate::manifest::parse_manifest;
use crate::model::{AppManifest, BucketMap};

const MANIFEST_EXT: &str = ".json";

/// Reads every manifest in one bucket directory.
///
/// Scoop buckets keep their manifests either directly in the bucket root or
/// in a `bucket/` subdirectory; the subdirectory wins when it exists.
pub fn load_app_list(path: &Path) -> Result<Vec<AppManifest>> {
    let sub_bucket = path.join("bucket");
    let dir = if sub_bucket.is_dir() {
        sub_bucket
    } else {
        path.to_path_buf()
    };

    let entries = fs::read_dir(&dir)
        .with_context(|| format!("bucket directory does not exist: {}", dir.display()))?;

    let mut apps = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to scan {}", dir.display()))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let Some(name) = file_name.strip_suffix(MANIFEST_EXT) else {
            continue;
        };

        let file_path = entry.path();
        let body = fs::read(&file_path)
            .with_context(|| format!("failed to read manifest {}", file_path.display()))?;

        if let Some(mut app) = parse_manifest(&file_path.to_string_lossy(), &body).into_app() {
            app.name = name.to_string();
            apps.push(app);
        }
    }

    Ok(apps)
}

/// Treats every immediate subdirectory of `root` as a bucket and loads them
/// in parallel, one task per bucket. Each task returns its own (path, apps)
/// pair; the map is assembled sequentially once all tasks finished.
#[tracing::instrument]
pub async fn load_buckets(root: &Path) -> Result<BucketMap> {
    let entries = fs::read_dir(root)
        .with_context(|| format!("buckets folder does not exist: {}", root.display()))?;

    let mut tasks = Vec::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to scan {}", root.display()))?;
        let bucket_path = entry.path();
        if !bucket_path.is_dir() {
            continue;
        }
        tasks.push(tokio::task::spawn_blocking(move || {
            let key = bucket_path.to_string_lossy().into_owned();
            let apps = load_app_list(&bucket_path);
            (key, apps)
        }));
    }

    let mut buckets = BucketMap::new();
    for joined in join_all(tasks).await {
        let (key, apps) = joined.context("bucket scan task panicked")?;
        match apps {
            Ok(apps) => {
                buckets.insert(key, apps);
            }
            // one unreadable bucket does not fail the whole source
            Err(err) => warn!("skipping bucket {}: {:#}", key, err),
        }
    }
    Ok(buckets)
}
