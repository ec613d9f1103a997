//! Loading manifests out of a bucket packed as a zip archive, e.g. a
//! repository's zipball download.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::LazyLock;
use zip::ZipArchive;

use crate::cache::CacheStore;
use crate::manifest::parse_manifest;
use crate::model::AppManifest;

/// Manifests live either at the archive root or below a `bucket/` directory
/// at any depth; one `bucket/` boundary, no deeper nesting of manifests.
static MANIFEST_ENTRY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(^|(?:^|/|\\)bucket(?:/|\\))([^/\\]*)\.json$").expect("manifest entry regex is valid")
});

/// Reads every manifest entry from a local zip archive.
#[tracing::instrument]
pub fn load_app_list(archive_path: &Path) -> Result<Vec<AppManifest>> {
    let file = File::open(archive_path)
        .with_context(|| format!("failed to open archive {}", archive_path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("corrupt zip archive {}", archive_path.display()))?;

    let mut apps = Vec::new();
    for index in 0..archive.len() {
        let mut entry = archive
            .by_index(index)
            .with_context(|| format!("failed to read zip entry {}", index))?;

        let inner_path = entry.name().to_string();
        if !MANIFEST_ENTRY.is_match(&inner_path) {
            continue;
        }

        let mut body = Vec::new();
        entry
            .read_to_end(&mut body)
            .with_context(|| format!("failed to decompress {}", inner_path))?;

        let label = format!("{}:{}", archive_path.display(), inner_path);
        if let Some(mut app) = parse_manifest(&label, &body).into_app() {
            let base = inner_path
                .rsplit(['/', '\\'])
                .next()
                .unwrap_or(&inner_path);
            app.name = base.strip_suffix(".json").unwrap_or(base).to_string();
            apps.push(app);
        }
    }

    Ok(apps)
}

/// Downloads a bucket zip through the cache, then reads its manifests.
pub async fn load_app_list_from_url(cache: &CacheStore, url: &str) -> Result<Vec<AppManifest>> {
    let cache_path = cache.cache_path(url, "zip");
    cache
        .fetch(&cache_path, url)
        .await
        .with_context(|| format!("unable to download bucket archive {}", url))?;
    load_app_list(&cache_path)
}
