use crate::cache::{ConstructCache, FileSnapshot};
use crate::config::ScanConfig;
use crate::provider::ContentProvider;
use crate::result::{Proposal, Trigger};
use codesub_constructs::{IndexerPool, Language};
use codesub_diff::{
    parse_name_status, parse_unified_diff, DiffParse, FileDiff, NameStatus, SkippedBlock,
};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Statuses whose path exists after the change
const LIVE_STATUSES: [char; 5] = ['A', 'M', 'R', 'C', 'T'];

/// Outcome of evaluating one subscription; both halves empty means unchanged
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Evaluation {
    pub trigger: Option<Trigger>,
    pub proposal: Option<Proposal>,
}

impl Evaluation {
    pub fn unchanged() -> Self {
        Self::default()
    }

    pub fn triggered(trigger: Trigger) -> Self {
        Self {
            trigger: Some(trigger),
            proposal: None,
        }
    }

    pub fn is_unchanged(&self) -> bool {
        self.trigger.is_none() && self.proposal.is_none()
    }
}

/// Everything derived from the diff once per scan, shared read-only by all workers
pub(crate) struct ScanContext<'a> {
    pub diff: DiffParse,
    pub name_status: NameStatus,
    /// old path -> new path, from name-status and rename preambles
    renames: HashMap<String, String>,
    pub target_ref: Option<&'a str>,
    pub config: &'a ScanConfig,
    provider: &'a dyn ContentProvider,
    cache: &'a ConstructCache,
}

impl<'a> ScanContext<'a> {
    pub fn new(
        diff_text: &str,
        name_status_text: &str,
        target_ref: Option<&'a str>,
        config: &'a ScanConfig,
        provider: &'a dyn ContentProvider,
        cache: &'a ConstructCache,
    ) -> Self {
        let diff = parse_unified_diff(diff_text);
        let name_status = parse_name_status(name_status_text);

        let mut renames = name_status.renames.clone();
        for file in diff.files.iter().filter(|f| f.is_rename) {
            renames
                .entry(file.old_path.clone())
                .or_insert_with(|| file.new_path.clone());
        }

        log::debug!(
            "Diff: {} files ({} skipped), {} status entries, {} renames",
            diff.files.len(),
            diff.skipped.len(),
            name_status.statuses.len(),
            renames.len()
        );

        Self {
            diff,
            name_status,
            renames,
            target_ref,
            config,
            provider,
            cache,
        }
    }

    /// Where `path` lives after the change
    pub fn resolve<'p>(&'p self, path: &'p str) -> &'p str {
        self.renames.get(path).map_or(path, String::as_str)
    }

    /// File diff whose pre-change path is `path`
    pub fn file_diff(&self, path: &str) -> Option<&FileDiff> {
        self.diff.file_for_old_path(path)
    }

    /// Diff block about `path` that could not be parsed
    pub fn unparsed_block(&self, path: &str) -> Option<&SkippedBlock> {
        self.diff.skipped_for_path(path)
    }

    pub fn is_deleted(&self, path: &str) -> bool {
        self.name_status.is_deleted(path)
            || self.file_diff(path).is_some_and(|f| f.is_deleted_file)
    }

    /// The diff says anything at all about `path`
    pub fn is_touched(&self, path: &str) -> bool {
        self.name_status.status_of(path).is_some()
            || self.renames.contains_key(path)
            || self.file_diff(path).is_some()
            || self.unparsed_block(path).is_some()
    }

    /// Snapshot of `path` at the target revision
    pub fn snapshot(&self, path: &str, pool: &mut IndexerPool) -> Arc<FileSnapshot> {
        self.cache.get_or_index(
            path,
            self.target_ref,
            self.provider,
            pool,
            self.config.max_file_bytes,
        )
    }

    /// Post-change paths of every live, non-binary file the diff touches, in `language`,
    /// sorted
    pub fn changed_paths(&self, language: Language) -> Vec<String> {
        let from_diff = self
            .diff
            .files
            .iter()
            .filter(|f| !f.is_deleted_file && !f.is_binary)
            .map(|f| f.new_path.as_str());
        let from_skipped = self
            .diff
            .skipped
            .iter()
            .filter_map(|b| b.new_path.as_deref());
        let from_status = self
            .name_status
            .statuses
            .iter()
            .filter(|(_, status)| LIVE_STATUSES.contains(status))
            .map(|(path, _)| path.as_str())
            // the old side of a rename is gone
            .filter(|path| !self.renames.contains_key(*path));

        from_diff
            .chain(from_skipped)
            .chain(from_status)
            .filter(|path| !self.is_deleted(path))
            .filter(|path| Language::from_path(path) == Some(language))
            .map(str::to_string)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
