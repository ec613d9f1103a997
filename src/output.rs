//! Plain-text rendering of search results.

use log::debug;
use std::fmt::Write;

use crate::config::ScoopConfig;
use crate::model::{BucketMap, NameSourceMap};
use crate::search::load_installed_apps;

/// Renders matched buckets, marking installed apps and truncating
/// descriptions to a maximum line length.
pub struct ResultPrinter {
    line_len: usize,
    user_installed: NameSourceMap,
    global_installed: NameSourceMap,
}

impl ResultPrinter {
    /// Missing apps directories are normal on a machine without scoop; they
    /// just mean nothing is marked as installed.
    pub fn new(config: &ScoopConfig, line_len: usize) -> Self {
        let user_installed = load_installed_apps(&config.apps_dir()).unwrap_or_else(|err| {
            debug!("{:#}", err);
            NameSourceMap::new()
        });
        let global_installed =
            load_installed_apps(&config.global_apps_dir()).unwrap_or_default();
        Self {
            line_len,
            user_installed,
            global_installed,
        }
    }

    /// Prints the buckets to stdout; returns whether anything was printed.
    pub fn print(&self, buckets: &BucketMap) -> bool {
        let (display, any_matches) = self.render(buckets);
        print!("{}", display);
        any_matches
    }

    /// One bucket header per bucket, then one line per app:
    /// `    name (version) [first-bin]: description`.
    /// Installed apps are marked `**` (user) or `G*` (global).
    pub fn render(&self, buckets: &BucketMap) -> (String, bool) {
        let mut display = String::new();
        let mut any_matches = false;

        for (bucket, apps) in buckets {
            if apps.is_empty() {
                continue;
            }
            any_matches = true;
            let _ = writeln!(display, "'{}' bucket:", bucket);

            for app in apps {
                let marker = if self.user_installed.contains_key(&app.name) {
                    " ** "
                } else if self.global_installed.contains_key(&app.name) {
                    " G* "
                } else {
                    "    "
                };

                let mut line = format!("{}{} ({})", marker, app.name, app.version);
                if let Some(bin) = app.bins.first() {
                    let _ = write!(line, " [{}]", bin);
                }

                let remainder = self.line_len.saturating_sub(line.chars().count() + 2);
                if !app.description.is_empty() && remainder > 0 {
                    let _ = write!(
                        line,
                        ": {}",
                        app.description.chars().take(remainder).collect::<String>()
                    );
                }
                display.push_str(&line);
                display.push('\n');
            }
            display.push('\n');
        }

        if !any_matches {
            display.push_str("No matches found.\n");
        }
        (display, any_matches)
    }
}
