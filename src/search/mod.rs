//! Filtering, ordering and renaming of loaded buckets.

mod state;

pub use state::{RunOptions, SearchState};

use anyhow::{Context, Result};
use log::debug;
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::config::ScoopConfig;
use crate::loader::redirect;
use crate::model::{AppManifest, BucketMap, NameSourceMap};

/// Manifest fields a query can be matched against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Name,
    Bins,
    Description,
}

impl fmt::Display for SearchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchField::Name => write!(f, "name"),
            SearchField::Bins => write!(f, "bins"),
            SearchField::Description => write!(f, "description"),
        }
    }
}

impl FromStr for SearchField {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "name" => Ok(SearchField::Name),
            "bins" => Ok(SearchField::Bins),
            "description" => Ok(SearchField::Description),
            other => anyhow::bail!(
                "unknown search field: {}. Expected name, bins or description.",
                other
            ),
        }
    }
}

/// A compiled query: the pattern plus the fields it applies to.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub pattern: Regex,
    pub fields: Vec<SearchField>,
}

impl SearchQuery {
    /// Compiles a query term. `(?i)` is prepended so matching is
    /// case-insensitive unless the term itself starts with `(?-i)`.
    pub fn new(term: &str, fields: Vec<SearchField>) -> Result<Self> {
        let pattern = Regex::new(&format!("(?i){}", term))
            .context("failed to parse search term regexp")?;
        Ok(Self { pattern, fields })
    }
}

/// Matches one record against the query, mutating it along the way:
/// a name match clears the binaries (they are redundant once the name
/// matched), a bins match narrows the binaries to the matching ones.
pub fn filter_app(query: &SearchQuery, app: &mut AppManifest) -> bool {
    let mut found = false;
    for field in &query.fields {
        match field {
            SearchField::Name => {
                if query.pattern.is_match(&app.name) {
                    app.bins.clear();
                    found = true;
                }
            }
            SearchField::Bins => {
                let bins: Vec<String> = app
                    .bins
                    .iter()
                    .map(|bin| base_name(bin))
                    .filter(|bin| query.pattern.is_match(strip_extension(bin)))
                    .collect();
                if !bins.is_empty() {
                    found = true;
                }
                app.bins = bins;
            }
            SearchField::Description => {
                if query.pattern.is_match(&app.description) {
                    found = true;
                }
            }
        }
    }
    found
}

/// Filters a bucket's records and sorts the survivors by name,
/// case-insensitively and ignoring hyphens; ties keep their input order.
pub fn filter_app_list(query: &SearchQuery, apps: Vec<AppManifest>) -> Vec<AppManifest> {
    let mut matches: Vec<AppManifest> = apps
        .into_iter()
        .filter_map(|mut app| filter_app(query, &mut app).then_some(app))
        .collect();
    matches.sort_by_cached_key(|app| app.name.to_lowercase().replace('-', ""));
    matches
}

/// Filtered buckets from one source, with the total record count.
#[derive(Debug, Default)]
pub struct BucketsMatch {
    pub buckets: BucketMap,
    pub num_apps: usize,
}

/// Applies the query to every bucket, keeping only buckets that still have
/// records afterwards.
pub fn filter_buckets(query: &SearchQuery, buckets: BucketMap) -> BucketsMatch {
    let mut match_ = BucketsMatch::default();
    for (source, apps) in buckets {
        let apps = filter_app_list(query, apps);
        if !apps.is_empty() {
            match_.num_apps += apps.len();
            match_.buckets.insert(source, apps);
        }
    }
    match_
}

/// Rewrites bucket keys to friendlier names where possible, using scoop's
/// own `buckets.json` registry: a source listed there gets its canonical
/// short name; a path under the local buckets root gets the root stripped;
/// anything else keeps its key. `prefix` is prepended to every renamed key.
pub fn rename_buckets_to_known_names(
    config: &ScoopConfig,
    buckets: BucketMap,
    prefix: &str,
) -> BucketMap {
    let by_source = known_sources(&config.known_buckets_file());
    let buckets_root = format!(
        "{}{}",
        config.buckets_dir().display(),
        std::path::MAIN_SEPARATOR
    );

    let mut renamed = BucketMap::new();
    for (source, apps) in buckets {
        let key = if let Some(name) = by_source.get(&source) {
            format!("{}{}", prefix, name)
        } else if let Some(local) = source.strip_prefix(&buckets_root) {
            format!("{}{}", prefix, local)
        } else {
            source
        };
        renamed.insert(key, apps);
    }
    renamed
}

/// Reverse (source to name) view of scoop's known-bucket registry. A missing
/// or unreadable registry just means nothing gets renamed.
fn known_sources(registry_file: &Path) -> NameSourceMap {
    match redirect::load_name_source_map(registry_file) {
        Ok(by_name) => by_name.into_iter().map(|(name, source)| (source, name)).collect(),
        Err(err) => {
            debug!("no bucket name registry: {:#}", err);
            NameSourceMap::new()
        }
    }
}

fn base_name(path: &str) -> String {
    path.rsplit(['/', '\\']).next().unwrap_or(path).to_string()
}

fn strip_extension(file_name: &str) -> &str {
    match file_name.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file_name,
    }
}

/// Reads installed app names (user or global) as a name-to-path map.
pub fn load_installed_apps(apps_dir: &Path) -> Result<NameSourceMap> {
    let entries = std::fs::read_dir(apps_dir)
        .with_context(|| format!("apps path does not exist: {}", apps_dir.display()))?;

    let mut apps = NameSourceMap::new();
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to scan {}", apps_dir.display()))?;
        apps.insert(
            entry.file_name().to_string_lossy().into_owned(),
            entry.path().to_string_lossy().into_owned(),
        );
    }
    Ok(apps)
}
