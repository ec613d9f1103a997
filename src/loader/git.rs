//! Loading a bucket by cloning (or updating) its git repository.

use anyhow::Result;
use log::{debug, info, warn};
use std::path::Path;
use tokio::process::Command;

use crate::cache::CacheStore;
use crate::model::AppManifest;

use super::dir;

/// Clones or updates the repository into the bucket cache, then reads its
/// manifests like any local bucket directory.
///
/// Subprocess failures are logged but never abort the run: whatever working
/// copy exists after the attempt (possibly stale, possibly partial) is
/// scanned anyway.
#[tracing::instrument(skip(cache))]
pub async fn load_app_list(cache: &CacheStore, url: &str) -> Result<Vec<AppManifest>> {
    let repo_path = cache.repo_path(url);
    sync_repo(&repo_path, url).await;
    dir::load_app_list(&repo_path)
}

async fn sync_repo(repo_path: &Path, url: &str) {
    if let Err(err) = std::fs::create_dir_all(repo_path) {
        warn!("can't create repository cache {}: {}", repo_path.display(), err);
        return;
    }

    let mut command = Command::new("git");
    if repo_path.join(".git").exists() {
        info!("updating repository cache: {}", repo_path.display());
        command.arg("pull").current_dir(repo_path);
    } else {
        info!("cloning repository: {}", url);
        command.args(["clone", url]).arg(repo_path);
    }

    match command.output().await {
        Ok(output) if output.status.success() => {
            debug!("git: {}", String::from_utf8_lossy(&output.stdout).trim());
        }
        Ok(output) => {
            warn!(
                "git failed ({}): {} -- trying to continue anyway",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Err(err) => {
            warn!("failed to run git: {} -- trying to continue anyway", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn cache_in(dir: &Path) -> CacheStore {
        CacheStore::new(dir.to_path_buf(), Duration::ZERO, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_failed_clone_still_reads_existing_contents() {
        // the "repository" already holds manifests from an earlier run; the
        // clone of a bogus URL fails but the stale contents are used
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(tmp.path());
        let url = "file:///no/such/repo.git";

        let repo_path = cache.repo_path(url);
        fs::create_dir_all(&repo_path).unwrap();
        fs::write(repo_path.join("tool.json"), r#"{"version": "1.0"}"#).unwrap();

        let apps = load_app_list(&cache, url).await.unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0].name, "tool");
    }

    #[tokio::test]
    async fn test_failed_clone_yields_empty_bucket() {
        let tmp = TempDir::new().unwrap();
        let cache = cache_in(tmp.path());

        // clone fails and leaves an empty directory; an empty bucket is not
        // an error, it just has no manifests
        let apps = load_app_list(&cache, "file:///no/such/repo.git").await.unwrap();
        assert!(apps.is_empty());
    }
}
