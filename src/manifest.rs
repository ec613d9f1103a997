//! Parsing of individual scoop app manifests.
//!
//! A manifest is one JSON document per package with `version`, `description`,
//! `homepage` and `bin` fields, all optional. See
//! <https://github.com/ScoopInstaller/scoop/wiki/App-Manifests>.

use log::warn;
use serde_json::Value;

use crate::model::AppManifest;

/// Per-document parse outcome. Failures never abort a bucket scan: a
/// malformed document is dropped, a document with an unexpected `bin` shape
/// is kept with whatever was parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedManifest {
    Complete(AppManifest),
    /// Parsed, but the `bin` field had an unrecognized shape.
    Anomalous(AppManifest),
    /// The document is not valid JSON; no record produced.
    Malformed,
}

impl ParsedManifest {
    /// The record, if one was produced.
    pub fn into_app(self) -> Option<AppManifest> {
        match self {
            ParsedManifest::Complete(app) | ParsedManifest::Anomalous(app) => Some(app),
            ParsedManifest::Malformed => None,
        }
    }
}

/// Parses one manifest document, warning (with `label` identifying the
/// source) on anything out of shape. The returned record has an empty name;
/// callers assign it from the manifest's file name.
pub fn parse_manifest(label: &str, body: &[u8]) -> ParsedManifest {
    let value: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(err) => {
            warn!("*** skipped BROKEN manifest ({}): {}", err, label);
            return ParsedManifest::Malformed;
        }
    };

    let mut app = AppManifest {
        version: string_field(&value, "version"),
        description: string_field(&value, "description"),
        homepage: string_field(&value, "homepage"),
        ..AppManifest::default()
    };

    let mut anomaly = false;
    match value.get("bin") {
        // "bin" is optional
        None | Some(Value::Null) => {}
        // "bin": "myprog.exe"
        Some(Value::String(bin)) => app.bins.push(bin.clone()),
        // "bin": [ "myprog.exe", [ "program.exe", "alias", "--arg1" ] ]
        Some(Value::Array(entries)) => {
            for entry in entries {
                match entry {
                    Value::String(bin) => app.bins.push(bin.clone()),
                    Value::Array(parts) => {
                        // first two entries are the executable and its
                        // alias; anything after that is invocation flags
                        app.bins
                            .extend(parts.iter().take(2).filter_map(Value::as_str).map(String::from));
                    }
                    _ => anomaly = true,
                }
            }
        }
        Some(_) => anomaly = true,
    }

    if anomaly {
        warn!("*** including BROKEN manifest (bad \"bin\"): {}", label);
        ParsedManifest::Anomalous(app)
    } else {
        ParsedManifest::Complete(app)
    }
}

fn string_field(value: &Value, field: &str) -> String {
    value
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
