use crate::parser::unquote;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Rename and status maps from `git diff --name-status -M` output
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameStatus {
    /// old path -> new path
    pub renames: HashMap<String, String>,

    /// path -> status letter (`A`, `M`, `D`, `R`, `C`, `T`, ...)
    pub statuses: HashMap<String, char>,
}

impl NameStatus {
    #[must_use]
    pub fn status_of(&self, path: &str) -> Option<char> {
        self.statuses.get(path).copied()
    }

    #[must_use]
    pub fn is_deleted(&self, path: &str) -> bool {
        self.status_of(path) == Some('D')
    }

    /// Where `path` lives after the change
    #[must_use]
    pub fn resolve<'a>(&'a self, path: &'a str) -> &'a str {
        self.renames.get(path).map_or(path, String::as_str)
    }
}

/// Parse tab-separated name-status lines (`M\tpath`, `R087\told\tnew`).
///
/// Lines that don't fit the format are logged and ignored.
#[must_use]
pub fn parse_name_status(text: &str) -> NameStatus {
    let mut out = NameStatus::default();

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split('\t').collect();
        let Some(status) = fields.first().and_then(|s| s.chars().next()) else {
            continue;
        };

        match (status, fields.len()) {
            ('R', 3) => {
                let old = unquote(fields[1]);
                let new = unquote(fields[2]);
                out.statuses.insert(old.clone(), 'R');
                out.statuses.insert(new.clone(), 'R');
                out.renames.insert(old, new);
            }
            ('C', 3) => {
                // the source of a copy is untouched
                out.statuses.insert(unquote(fields[2]), 'C');
            }
            (_, 2) if status.is_ascii_uppercase() && !matches!(status, 'R' | 'C') => {
                out.statuses.insert(unquote(fields[1]), status);
            }
            _ => log::warn!("Ignoring malformed name-status line: {line:?}"),
        }
    }

    out
}
