use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;

use scoopfind::cache::CacheStore;
use scoopfind::config::ScoopConfig;
use scoopfind::model::{SOURCE_PATTERN_HUMAN, SourceRef};
use scoopfind::search::{RunOptions, SearchField, SearchQuery, SearchState};

/// scoopfind - search scoop buckets: local, remote, zip, html
///
/// The search term is a case-insensitive regular expression; prefix it with
/// "(?-i)" for a case-sensitive match.
///
/// Examples:
///   scoopfind python
///   scoopfind --source mybucket.zip --source "if0: :rasa" python
///   scoopfind --source "[html] https://rasa.github.io/scoop-directory/by-score.html" actools
///   scoopfind --source "[bucket] https://github.com/ScoopInstaller/Versions" python
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Cli {
    /// The search term or regular expression
    #[arg(value_name = "PATTERN")]
    pattern: String,

    /// A source to search (repeatable). Format: "<if0:> [<bucket|buckets|html>] <:active|:rasa or path/url>".
    /// "if0:" marks a fallback only used when earlier sources had no matches.
    #[arg(long = "source", value_name = "SPEC")]
    sources: Vec<String>,

    /// Manifest fields to search, comma separated: name, bins, description
    #[arg(long, value_name = "LIST", default_value = "name,bins")]
    fields: String,

    /// Merge the results from all sources into a single output (avoids duplicates)
    #[arg(
        long,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true",
        action = clap::ArgAction::Set
    )]
    merge: bool,

    /// Cache duration in days for downloaded sources
    #[arg(long, value_name = "DAYS", default_value_t = 1.0)]
    cache: f64,

    /// Max line length for results (trims descriptions)
    #[arg(long, value_name = "N", default_value_t = 120)]
    linelen: usize,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    if cli.pattern.is_empty() {
        anyhow::bail!("the search pattern must not be empty (use \".\" to list everything)");
    }

    let ttl = Duration::from_secs_f64(cli.cache.max(0.0) * 24.0 * 3600.0);
    let config = ScoopConfig::load(ttl)?;
    let cache = CacheStore::new(config.bucket_cache_dir(), ttl, config.http_client()?);

    let sources = if cli.sources.is_empty() {
        config.default_sources()
    } else {
        let aliases = config.named_sources();
        cli.sources
            .iter()
            .map(|spec| SourceRef::parse(spec, &aliases))
            .collect::<Result<Vec<_>>>()
            .with_context(|| format!("usage: --source {}", SOURCE_PATTERN_HUMAN))?
    };

    let fields = cli
        .fields
        .split(',')
        .map(str::parse::<SearchField>)
        .collect::<Result<Vec<_>>>()?;
    let query = SearchQuery::new(&cli.pattern, fields)?;

    let mut state = SearchState::new(&config, &cache, query, sources);
    state
        .run(&RunOptions {
            merge: cli.merge,
            line_len: cli.linelen,
        })
        .await?;

    // the exit status reflects whether anything matched at all
    Ok(if state.num_app_matches == 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
