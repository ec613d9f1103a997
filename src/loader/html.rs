//! Scraping package listings out of HTML tables, primarily the rasa scoop
//! directory pages.
//!
//! Each table with a recognizable `Name` column becomes one bucket. The
//! bucket's source identity is the nearest forge link preceding the table;
//! version and description columns are picked up when present.

use anyhow::{Context, Result};
use scraper::{ElementRef, Html, Selector};
use std::fs;
use std::sync::LazyLock;

use crate::cache::CacheStore;
use crate::model::{AppManifest, BucketMap};

/// Hosting domains whose links identify a bucket's source repository.
const FORGE_HOSTS: &[&str] = &["github.com", "gitlab.com"];

struct Selectors {
    table: Selector,
    tr: Selector,
    th: Selector,
    td: Selector,
    anchor: Selector,
}

static SELECTORS: LazyLock<Selectors> = LazyLock::new(|| Selectors {
    table: Selector::parse("table").expect("valid selector"),
    tr: Selector::parse("tr").expect("valid selector"),
    th: Selector::parse("th").expect("valid selector"),
    td: Selector::parse("td").expect("valid selector"),
    anchor: Selector::parse("a[href]").expect("valid selector"),
});

/// Loads buckets from an HTML document, fetching through the cache when the
/// path is a URL and reading directly when it is a local file.
#[tracing::instrument(skip(cache))]
pub async fn load_buckets(cache: &CacheStore, path: &str) -> Result<BucketMap> {
    let body = if path.contains("://") {
        let cache_path = cache.cache_path(path, "html");
        cache
            .fetch(&cache_path, path)
            .await
            .with_context(|| format!("unable to download directory page {}", path))?;
        fs::read_to_string(&cache_path)
            .with_context(|| format!("failed to read cache file {}", cache_path.display()))?
    } else {
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?
    };

    Ok(parse_tables(&body))
}

/// Parses every package table in the document into a bucket.
pub fn parse_tables(html: &str) -> BucketMap {
    let document = Html::parse_document(html);
    let mut buckets = BucketMap::new();

    for table in document.select(&SELECTORS.table) {
        let mut headings = Vec::new();
        let mut rows: Vec<Vec<String>> = Vec::new();

        for tr in table.select(&SELECTORS.tr) {
            for th in tr.select(&SELECTORS.th) {
                headings.push(cell_text(th));
            }
            let row: Vec<String> = tr.select(&SELECTORS.td).map(cell_text).collect();
            if !row.is_empty() {
                rows.push(row);
            }
        }

        let mut name_col = None;
        let mut version_col = None;
        let mut description_col = None;
        for (index, heading) in headings.iter().enumerate() {
            let label = heading.to_lowercase();
            if label.contains("name") {
                name_col = Some(index);
            } else if label.contains("ver") {
                version_col = Some(index);
            } else if label.contains("desc") {
                description_col = Some(index);
            }
        }

        // a table without a name column is not package data
        let Some(name_col) = name_col else {
            continue;
        };

        let source = preceding_forge_link(table).unwrap_or_default();

        let mut apps = Vec::new();
        for row in rows {
            let Some(name) = row.get(name_col) else {
                continue;
            };
            apps.push(AppManifest {
                name: name.clone(),
                version: cell_at(&row, version_col),
                description: cell_at(&row, description_col),
                ..AppManifest::default()
            });
        }

        buckets.insert(source, apps);
    }

    buckets
}

fn cell_text(cell: ElementRef<'_>) -> String {
    cell.text().collect::<String>().trim().to_string()
}

fn cell_at(row: &[String], col: Option<usize>) -> String {
    col.and_then(|index| row.get(index)).cloned().unwrap_or_default()
}

fn is_forge_href(href: &str) -> bool {
    FORGE_HOSTS.iter().any(|host| href.contains(host))
}

/// Scans backward through the table's preceding siblings for the closest
/// hyperlink to a known forge host; the first forge link in each sibling (in
/// document order) is considered. The scan stops at a preceding table, whose
/// links pertain to that table instead.
fn preceding_forge_link(table: ElementRef<'_>) -> Option<String> {
    for sibling in table.prev_siblings() {
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        if element.value().name() == "table" {
            return None;
        }
        if element.value().name() == "a"
            && let Some(href) = element.value().attr("href")
            && is_forge_href(href)
        {
            return Some(href.to_string());
        }
        for anchor in element.select(&SELECTORS.anchor) {
            if let Some(href) = anchor.value().attr("href")
                && is_forge_href(href)
            {
                return Some(href.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIRECTORY_PAGE: &str = r#"
        <html><body>
          <h2><a href="https://github.com/org/repo">org/repo</a></h2>
          <table>
            <tr><th>Name</th><th>Version</th><th>Description</th></tr>
            <tr><td>mytool</td><td>1.2</td><td>does things</td></tr>
            <tr><td> spaced </td><td> 2.0 </td><td>  trimmed  </td></tr>
          </table>
          <h2><a href="/local-link">no forge here</a></h2>
          <h2><a href="https://github.com/other/bucket">other/bucket</a></h2>
          <table>
            <tr><th>Name</th><th>Version</th><th>Description</th></tr>
            <tr><td>second</td><td>0.1</td><td>another</td></tr>
          </table>
        </body></html>
    "#;

    #[test]
    fn test_parse_tables_keyed_by_preceding_link() {
        let buckets = parse_tables(DIRECTORY_PAGE);
        assert_eq!(buckets.len(), 2);

        let first = &buckets["https://github.com/org/repo"];
        assert_eq!(first.len(), 2);
        assert_eq!(first[0].name, "mytool");
        assert_eq!(first[0].version, "1.2");
        assert_eq!(first[0].description, "does things");
        // binaries and homepage are not available in this format
        assert!(first[0].bins.is_empty());
        assert_eq!(first[0].homepage, "");

        assert_eq!(first[1].name, "spaced");
        assert_eq!(first[1].version, "2.0");
        assert_eq!(first[1].description, "trimmed");

        let second = &buckets["https://github.com/other/bucket"];
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].name, "second");
    }

    #[test]
    fn test_table_without_name_column_is_skipped() {
        let html = r#"
            <table>
              <tr><th>Size</th><th>Date</th></tr>
              <tr><td>1k</td><td>today</td></tr>
            </table>
        "#;
        assert!(parse_tables(html).is_empty());
    }

    #[test]
    fn test_table_without_preceding_link_gets_empty_source() {
        let html = r#"
            <table>
              <tr><th>Name</th><th>Ver</th></tr>
              <tr><td>lonely</td><td>1.0</td></tr>
            </table>
        "#;
        let buckets = parse_tables(html);
        assert_eq!(buckets.len(), 1);
        assert_eq!(buckets[""][0].name, "lonely");
        assert_eq!(buckets[""][0].version, "1.0");
    }

    #[test]
    fn test_missing_optional_columns() {
        let html = r#"
            <a href="https://github.com/org/min"></a>
            <table>
              <tr><th>Package Name</th></tr>
              <tr><td>bare</td></tr>
            </table>
        "#;
        let buckets = parse_tables(html);
        let apps = &buckets["https://github.com/org/min"];
        assert_eq!(apps[0].name, "bare");
        assert_eq!(apps[0].version, "");
        assert_eq!(apps[0].description, "");
    }

    #[test]
    fn test_direct_anchor_sibling_is_found() {
        let html = r#"
            <div>
              <a href="https://gitlab.com/org/thing">link</a>
              <table>
                <tr><th>Name</th></tr>
                <tr><td>tool</td></tr>
              </table>
            </div>
        "#;
        let buckets = parse_tables(html);
        assert!(buckets.contains_key("https://gitlab.com/org/thing"));
    }

    #[tokio::test]
    async fn test_load_buckets_from_local_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let page = tmp.path().join("directory.html");
        fs::write(&page, DIRECTORY_PAGE).unwrap();

        let cache = CacheStore::new(
            tmp.path().join("cache"),
            std::time::Duration::ZERO,
            reqwest::Client::new(),
        );
        let buckets = load_buckets(&cache, &page.to_string_lossy()).await.unwrap();
        assert_eq!(buckets.len(), 2);
    }
}
