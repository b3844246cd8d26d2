use crate::provider::ContentProvider;
use codesub_constructs::{ConstructError, IndexedFile, IndexerPool};
use dashmap::DashMap;
use std::sync::Arc;

/// What a file looks like at one revision, as far as the matcher cares
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSnapshot {
    Indexed(IndexedFile),
    /// Provider failure, binary or oversized content; the reason is for diagnostics
    Unreadable(String),
    /// No indexer for the file's extension
    Unsupported,
}

type CacheKey = (Option<String>, String);

/// Per-scan memo of indexed files keyed by `(revision, path)`.
///
/// Shared by every worker of one scan; each file is read and parsed about once no
/// matter how many subscriptions point at it.
#[derive(Debug, Default)]
pub struct ConstructCache {
    entries: DashMap<CacheKey, Arc<FileSnapshot>>,
}

impl ConstructCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Cached snapshot of `path` at `revision`, reading and indexing it on first use
    pub fn get_or_index(
        &self,
        path: &str,
        revision: Option<&str>,
        provider: &dyn ContentProvider,
        pool: &mut IndexerPool,
        max_file_bytes: usize,
    ) -> Arc<FileSnapshot> {
        let key: CacheKey = (revision.map(str::to_string), path.to_string());
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit.value());
        }

        // Parse outside the shard lock; a concurrent duplicate parse loses the race below
        let snapshot = Arc::new(load(path, revision, provider, pool, max_file_bytes));
        Arc::clone(self.entries.entry(key).or_insert(snapshot).value())
    }
}

fn load(
    path: &str,
    revision: Option<&str>,
    provider: &dyn ContentProvider,
    pool: &mut IndexerPool,
    max_file_bytes: usize,
) -> FileSnapshot {
    let source = match provider.read(path, revision) {
        Ok(source) => source,
        Err(e) => {
            log::warn!("Cannot read {path}: {e}");
            return FileSnapshot::Unreadable(e.to_string());
        }
    };

    if source.len() > max_file_bytes {
        log::warn!(
            "Skipping large file {path} ({} bytes > {max_file_bytes})",
            source.len()
        );
        return FileSnapshot::Unreadable(format!("file exceeds {max_file_bytes} bytes"));
    }
    if source.contains('\0') {
        return FileSnapshot::Unreadable("binary content".to_string());
    }

    match pool.index_file(&source, path) {
        Ok(file) => {
            log::debug!(
                "Indexed {path}: {} constructs{}",
                file.constructs.len(),
                if file.has_parse_error { " (with parse errors)" } else { "" }
            );
            FileSnapshot::Indexed(file)
        }
        Err(ConstructError::UnsupportedLanguage(_)) => FileSnapshot::Unsupported,
        Err(e) => {
            log::warn!("Indexing {path} failed: {e}");
            FileSnapshot::Unreadable(e.to_string())
        }
    }
}
