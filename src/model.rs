//! Core data types shared by the loaders and the search pipeline.

use anyhow::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;

/// One package manifest, normalized from whatever format the source used.
///
/// `name` is always assigned by the loader (from the manifest's file name or
/// table row), never taken from manifest content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppManifest {
    pub name: String,
    pub version: String,
    pub description: String,
    pub homepage: String,
    pub bins: Vec<String>,
}

/// Buckets keyed by their source identity (directory path, archive path or
/// repository URL). Keys are unique within one map; merging later maps over
/// earlier ones is last-write-wins.
pub type BucketMap = BTreeMap<String, Vec<AppManifest>>;

/// Flat bucket-name to source-URL mapping, as found in scoop's `buckets.json`.
pub type NameSourceMap = BTreeMap<String, String>;

/// When a configured source should be consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceCondition {
    #[default]
    Always,
    /// Fallback source: only searched if no earlier source produced a match.
    IfNoMatches,
}

impl fmt::Display for SourceCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceCondition::Always => Ok(()),
            SourceCondition::IfNoMatches => write!(f, "if0:"),
        }
    }
}

/// Explicitly requested backend kind. `None` on a [`SourceRef`] means the
/// backend is inferred from the path shape (scheme, extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// A root directory whose immediate subdirectories are buckets, or a
    /// name-to-URL redirect document when the path ends in `.json`.
    Buckets,
    /// An HTML page listing packages in tables.
    Html,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Buckets => write!(f, "buckets"),
            SourceKind::Html => write!(f, "html"),
        }
    }
}

/// A configured origin to load buckets from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef {
    pub condition: SourceCondition,
    pub kind: Option<SourceKind>,
    pub path: String,
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.condition == SourceCondition::IfNoMatches {
            write!(f, "if0: ")?;
        }
        if let Some(kind) = self.kind {
            write!(f, "[{}] ", kind)?;
        }
        write!(f, "{}", self.path)
    }
}

/// Human-readable form of the `--source` grammar, used in error messages.
pub const SOURCE_PATTERN_HUMAN: &str =
    r#""<if0:> [<bucket|buckets|html>] <:active|:rasa or path/url>""#;

static SOURCE_FORMAT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<cond>if0): )?(?:\[(?P<kind>bucket|buckets|html)\] )?(?P<path>.*)$")
        .expect("source grammar regex is valid")
});

impl SourceRef {
    pub fn new(condition: SourceCondition, kind: Option<SourceKind>, path: impl Into<String>) -> Self {
        Self {
            condition,
            kind,
            path: path.into(),
        }
    }

    /// Parses the `--source` grammar: `[if0: ][[kind] ]path-or-alias`.
    ///
    /// A `:name` path is resolved against `aliases` at parse time; the
    /// explicitly given condition, if any, is carried forward onto the
    /// resolved source. The `bucket` kind keyword leaves the backend
    /// inferred, matching how a bare URL or path behaves.
    pub fn parse(value: &str, aliases: &BTreeMap<String, SourceRef>) -> Result<Self> {
        let captures = SOURCE_FORMAT.captures(value).ok_or_else(|| {
            anyhow::anyhow!(
                "source does not match the required pattern:\nPATTERN: {}\nGIVEN:   {}",
                SOURCE_PATTERN_HUMAN,
                value
            )
        })?;

        let condition = match captures.name("cond") {
            Some(_) => SourceCondition::IfNoMatches,
            None => SourceCondition::Always,
        };
        let kind = match captures.name("kind").map(|m| m.as_str()) {
            Some("buckets") => Some(SourceKind::Buckets),
            Some("html") => Some(SourceKind::Html),
            // `bucket` selects the single-bucket behavior of an inferred path
            Some(_) | None => None,
        };
        let path = captures
            .name("path")
            .map(|m| m.as_str())
            .unwrap_or_default();

        if let Some(alias) = path.strip_prefix(':')
            && let Some(named) = aliases.get(alias)
        {
            return Ok(SourceRef {
                condition,
                kind: named.kind,
                path: named.path.clone(),
            });
        }

        Ok(SourceRef::new(condition, kind, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases() -> BTreeMap<String, SourceRef> {
        let mut map = BTreeMap::new();
        map.insert(
            "active".to_string(),
            SourceRef::new(
                SourceCondition::Always,
                Some(SourceKind::Buckets),
                "/home/user/scoop/buckets",
            ),
        );
        map.insert(
            "rasa".to_string(),
            SourceRef::new(
                SourceCondition::Always,
                Some(SourceKind::Html),
                "https://rasa.github.io/scoop-directory/by-score.html",
            ),
        );
        map
    }

    #[test]
    fn test_parse_plain_path() {
        let src = SourceRef::parse(r"C:\scoop\buckets\main", &aliases()).unwrap();
        assert_eq!(src.condition, SourceCondition::Always);
        assert_eq!(src.kind, None);
        assert_eq!(src.path, r"C:\scoop\buckets\main");
    }

    #[test]
    fn test_parse_condition_and_kind() {
        let src = SourceRef::parse("if0: [html] page.html", &aliases()).unwrap();
        assert_eq!(src.condition, SourceCondition::IfNoMatches);
        assert_eq!(src.kind, Some(SourceKind::Html));
        assert_eq!(src.path, "page.html");
    }

    #[test]
    fn test_parse_buckets_kind() {
        let src = SourceRef::parse("[buckets] /srv/buckets", &aliases()).unwrap();
        assert_eq!(src.kind, Some(SourceKind::Buckets));
    }

    #[test]
    fn test_parse_bucket_kind_stays_inferred() {
        // `[bucket] url` loads a single bucket, which is the inferred behavior
        let src =
            SourceRef::parse("[bucket] https://github.com/ScoopInstaller/Versions", &aliases())
                .unwrap();
        assert_eq!(src.kind, None);
        assert_eq!(src.path, "https://github.com/ScoopInstaller/Versions");
    }

    #[test]
    fn test_parse_alias_carries_condition() {
        let src = SourceRef::parse("if0: :rasa", &aliases()).unwrap();
        assert_eq!(src.condition, SourceCondition::IfNoMatches);
        assert_eq!(src.kind, Some(SourceKind::Html));
        assert_eq!(
            src.path,
            "https://rasa.github.io/scoop-directory/by-score.html"
        );
    }

    #[test]
    fn test_parse_alias_plain() {
        let src = SourceRef::parse(":active", &aliases()).unwrap();
        assert_eq!(src.condition, SourceCondition::Always);
        assert_eq!(src.kind, Some(SourceKind::Buckets));
        assert_eq!(src.path, "/home/user/scoop/buckets");
    }

    #[test]
    fn test_parse_unknown_alias_passes_through() {
        // an unknown :name is kept verbatim; the resolver will fail on it later
        let src = SourceRef::parse(":nosuch", &aliases()).unwrap();
        assert_eq!(src.path, ":nosuch");
    }

    #[test]
    fn test_display_round_trip() {
        let src = SourceRef::new(
            SourceCondition::IfNoMatches,
            Some(SourceKind::Html),
            "page.html",
        );
        assert_eq!(src.to_string(), "if0: [html] page.html");
        let reparsed = SourceRef::parse(&src.to_string(), &BTreeMap::new()).unwrap();
        assert_eq!(reparsed, src);
    }
}
