//! One search run: resolving each configured source in order, filtering its
//! buckets and accumulating the results.

use anyhow::{Context, Result};
use log::{debug, warn};

use crate::cache::CacheStore;
use crate::config::ScoopConfig;
use crate::loader;
use crate::model::{SourceCondition, SourceRef};
use crate::output::ResultPrinter;

use super::{BucketsMatch, SearchQuery, filter_buckets, rename_buckets_to_known_names};

const DIVIDER: &str = "____________________";

/// Presentation options for a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Union all sources' results into one deduplicated listing at the end,
    /// instead of printing each source as it completes.
    pub merge: bool,
    /// Maximum output line length; descriptions are truncated to fit.
    pub line_len: usize,
}

/// State for one invocation: the query, the ordered sources, and everything
/// accumulated while processing them.
pub struct SearchState<'a> {
    config: &'a ScoopConfig,
    cache: &'a CacheStore,
    query: SearchQuery,
    sources: Vec<SourceRef>,
    /// One entry per successfully searched source, in order.
    pub matches: Vec<BucketsMatch>,
    pub num_app_matches: usize,
    pub num_sources_searched: usize,
}

impl<'a> SearchState<'a> {
    pub fn new(
        config: &'a ScoopConfig,
        cache: &'a CacheStore,
        query: SearchQuery,
        sources: Vec<SourceRef>,
    ) -> Self {
        Self {
            config,
            cache,
            query,
            sources,
            matches: Vec::new(),
            num_app_matches: 0,
            num_sources_searched: 0,
        }
    }

    /// Processes every source in order. A source marked `if0:` is skipped
    /// entirely (not resolved, not counted as searched) once any earlier
    /// source produced a match. Failures of individual sources are reported
    /// and do not stop the remaining ones.
    pub async fn run(&mut self, options: &RunOptions) -> Result<()> {
        let printer = ResultPrinter::new(self.config, options.line_len);

        for index in 0..self.sources.len() {
            let source = self.sources[index].clone();
            if source.condition == SourceCondition::IfNoMatches && self.num_app_matches > 0 {
                debug!("skipping fallback source {}: already have matches", source);
                continue;
            }

            println!("{}", DIVIDER);
            println!("#{} Searching {}", index + 1, source);

            match self.search_source(&source).await {
                Ok(found) => {
                    if !options.merge {
                        printer.print(&found.buckets);
                    }
                    self.num_app_matches += found.num_apps;
                    self.matches.push(found);
                }
                Err(err) => warn!("{:#}", err),
            }
            self.num_sources_searched += 1;
        }

        let num_buckets: usize = self.matches.iter().map(|m| m.buckets.len()).sum();
        println!("{}", DIVIDER);
        println!(
            "TOTAL: {} apps matched in {} buckets from {} sources\n",
            self.num_app_matches, num_buckets, self.num_sources_searched
        );

        if options.merge {
            println!("MERGED RESULTS:\n");
            printer.print(&self.merged().buckets);
        }

        Ok(())
    }

    /// Loads and filters one source. The returned match carries the renamed
    /// buckets; accumulation into the run totals is the caller's job.
    async fn search_source(&self, source: &SourceRef) -> Result<BucketsMatch> {
        let buckets = loader::resolve(self.cache, source)
            .await
            .with_context(|| format!("unable to get buckets from source: {}", source))?;
        let total_buckets = buckets.len();

        let mut found = filter_buckets(&self.query, buckets);
        found.buckets = rename_buckets_to_known_names(self.config, found.buckets, "/");

        println!(
            "- {} apps matched in {}/{} buckets\n",
            found.num_apps,
            found.buckets.len(),
            total_buckets
        );
        Ok(found)
    }

    /// Union of all per-source results, keyed by the already-renamed bucket
    /// names; later sources overwrite earlier ones on collision.
    pub fn merged(&self) -> BucketsMatch {
        let mut merged = BucketsMatch::default();
        for found in &self.matches {
            for (name, apps) in &found.buckets {
                if let Some(previous) = merged.buckets.insert(name.clone(), apps.clone()) {
                    merged.num_apps -= previous.len();
                }
                merged.num_apps += apps.len();
            }
        }
        merged
    }
}
