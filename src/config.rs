//! Resolution of scoop's directories and settings.
//!
//! Precedence mirrors scoop itself: environment variables override
//! `<config-home>/scoop/config.json`, which overrides the built-in defaults.
//! Everything is resolved once at startup into an explicit [`ScoopConfig`]
//! that is passed into the resolver and cache components.

use anyhow::{Context, Result};
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::{SourceCondition, SourceKind, SourceRef};

/// The rasa scoop directory, the one HTML source everybody knows.
pub const RASA_DIRECTORY_URL: &str = "https://rasa.github.io/scoop-directory/by-score.html";

/// Relevant subset of `~/.config/scoop/config.json`.
#[derive(Debug, Default, Deserialize)]
struct ScoopConfigFile {
    #[serde(default)]
    root_path: Option<String>,
    #[serde(default)]
    global_path: Option<String>,
    #[serde(default)]
    cache_path: Option<String>,
    #[serde(default)]
    proxy: Option<String>,
}

/// Resolved scoop directories and settings for one invocation.
#[derive(Debug, Clone)]
pub struct ScoopConfig {
    pub user_home: PathBuf,
    pub config_file: PathBuf,
    /// Scoop root directory (`$SCOOP`, config `root_path`, `~/scoop`).
    pub scoop_dir: PathBuf,
    /// Global apps directory (`$SCOOP_GLOBAL`, config `global_path`).
    pub global_dir: PathBuf,
    /// Download cache directory (`$SCOOP_CACHE`, config `cache_path`,
    /// `<scoop>/cache`).
    pub cache_dir: PathBuf,
    /// Proxy host[:port] for outbound requests, without scheme.
    pub proxy: Option<String>,
    /// Maximum age before a cached download is refreshed.
    pub cache_ttl: Duration,
}

impl ScoopConfig {
    /// Loads the configuration from the real environment.
    ///
    /// The only fatal condition is an undeterminable home directory; a
    /// missing or unreadable config file falls back to defaults.
    pub fn load(cache_ttl: Duration) -> Result<Self> {
        let home = dirs::home_dir().context("could not determine user's home directory")?;
        Ok(Self::resolve(
            home,
            |key| env::var(key).ok(),
            cache_ttl,
        ))
    }

    /// Pure resolution against an explicit home directory and environment.
    pub fn resolve(
        user_home: PathBuf,
        env_var: impl Fn(&str) -> Option<String>,
        cache_ttl: Duration,
    ) -> Self {
        let config_home = env_var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| user_home.join(".config"));
        let config_file = config_home.join("scoop").join("config.json");

        let file = read_config_file(&config_file);

        let scoop_dir = env_var("SCOOP")
            .or(file.root_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| user_home.join("scoop"));

        let global_dir = env_var("SCOOP_GLOBAL")
            .or(file.global_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| {
                // %ProgramData%\scoop on Windows; unset elsewhere
                PathBuf::from(env_var("ProgramData").unwrap_or_default()).join("scoop")
            });

        let cache_dir = env_var("SCOOP_CACHE")
            .or(file.cache_path)
            .map(PathBuf::from)
            .unwrap_or_else(|| scoop_dir.join("cache"));

        Self {
            user_home,
            config_file,
            scoop_dir,
            global_dir,
            cache_dir,
            proxy: file.proxy,
            cache_ttl,
        }
    }

    /// Directory holding the locally added buckets.
    pub fn buckets_dir(&self) -> PathBuf {
        self.scoop_dir.join("buckets")
    }

    /// Directory of per-user installed apps.
    pub fn apps_dir(&self) -> PathBuf {
        self.scoop_dir.join("apps")
    }

    /// Directory of globally installed apps.
    pub fn global_apps_dir(&self) -> PathBuf {
        self.global_dir.join("apps")
    }

    /// Cache directory for downloaded buckets (zip, html, git checkouts).
    pub fn bucket_cache_dir(&self) -> PathBuf {
        self.cache_dir.join("buckets")
    }

    /// Registry mapping canonical bucket names to their source URLs,
    /// maintained by scoop itself.
    pub fn known_buckets_file(&self) -> PathBuf {
        self.scoop_dir
            .join("apps")
            .join("scoop")
            .join("current")
            .join("buckets.json")
    }

    /// Built-in source aliases usable as `:name` in a `--source` spec.
    pub fn named_sources(&self) -> BTreeMap<String, SourceRef> {
        let mut map = BTreeMap::new();
        map.insert(
            "active".to_string(),
            SourceRef::new(
                SourceCondition::Always,
                Some(SourceKind::Buckets),
                self.buckets_dir().to_string_lossy().into_owned(),
            ),
        );
        map.insert(
            "rasa".to_string(),
            SourceRef::new(
                SourceCondition::Always,
                Some(SourceKind::Html),
                RASA_DIRECTORY_URL,
            ),
        );
        map
    }

    /// Default sources when none are given on the command line: the local
    /// buckets first, the rasa directory only if nothing matched locally.
    pub fn default_sources(&self) -> Vec<SourceRef> {
        let named = self.named_sources();
        let mut active = named["active"].clone();
        active.condition = SourceCondition::Always;
        let mut rasa = named["rasa"].clone();
        rasa.condition = SourceCondition::IfNoMatches;
        vec![active, rasa]
    }

    /// Builds the HTTP client all network fetches go through, applying the
    /// configured proxy if any.
    pub fn http_client(&self) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder().user_agent(concat!(
            env!("CARGO_PKG_NAME"),
            "/",
            env!("CARGO_PKG_VERSION")
        ));
        if let Some(proxy) = &self.proxy {
            let url = format!("http://{}", proxy);
            debug!("using proxy {}", url);
            builder = builder.proxy(
                reqwest::Proxy::all(&url)
                    .with_context(|| format!("invalid proxy address: {}", proxy))?,
            );
        }
        builder.build().context("failed to build HTTP client")
    }
}

fn read_config_file(path: &Path) -> ScoopConfigFile {
    match fs::read(path) {
        Ok(body) if !body.is_empty() => match serde_json::from_slice(&body) {
            Ok(file) => {
                debug!("loaded scoop config from {}", path.display());
                file
            }
            Err(err) => {
                debug!("ignoring unparsable {}: {}", path.display(), err);
                ScoopConfigFile::default()
            }
        },
        _ => ScoopConfigFile::default(),
    }
}
