use serde::{Deserialize, Serialize};

/// One `@@ -a,b +c,d @@` block of a unified diff (1-based lines)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hunk {
    pub old_start: usize,
    pub old_count: usize,
    pub new_start: usize,
    pub new_count: usize,
}

impl Hunk {
    #[must_use]
    pub const fn new(old_start: usize, old_count: usize, new_start: usize, new_count: usize) -> Self {
        Self {
            old_start,
            old_count,
            new_start,
            new_count,
        }
    }

    /// Pure insertion: nothing removed from the old file.
    ///
    /// For these hunks `old_start` is the line *after which* the new lines were inserted
    /// (0 means "before the first line").
    #[must_use]
    pub const fn is_insertion(&self) -> bool {
        self.old_count == 0
    }

    /// Last old line touched by the hunk (inclusive). Meaningless for insertions.
    #[must_use]
    pub const fn old_end(&self) -> usize {
        (self.old_start + self.old_count).saturating_sub(1)
    }

    /// Net change in line count introduced by this hunk
    #[must_use]
    pub const fn delta(&self) -> i64 {
        self.new_count as i64 - self.old_count as i64
    }

    /// Whether the old side of the hunk intersects `[start, end]` (inclusive)
    #[must_use]
    pub const fn overlaps(&self, start: usize, end: usize) -> bool {
        !self.is_insertion() && self.old_start <= end && self.old_end() >= start
    }
}

/// Every hunk and file-level flag for one file touched by a diff
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FileDiff {
    pub old_path: String,
    pub new_path: String,

    /// Sorted ascending by `old_start`
    pub hunks: Vec<Hunk>,

    pub is_rename: bool,
    pub is_new_file: bool,
    pub is_deleted_file: bool,
    pub is_binary: bool,
}

impl FileDiff {
    /// Path the file has after the change (old path for deletions)
    #[must_use]
    pub fn effective_path(&self) -> &str {
        if self.is_deleted_file {
            &self.old_path
        } else {
            &self.new_path
        }
    }
}

/// A file block the parser could not make sense of
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedBlock {
    pub raw: String,
    pub reason: String,

    /// Paths named by the block's header, when it was readable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

impl SkippedBlock {
    /// Whether the block was about `path` on either side of the change
    #[must_use]
    pub fn mentions(&self, path: &str) -> bool {
        self.old_path.as_deref() == Some(path) || self.new_path.as_deref() == Some(path)
    }
}

/// Output of [`crate::parse_unified_diff`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffParse {
    pub files: Vec<FileDiff>,

    /// Blocks that were dropped, kept verbatim for diagnostics
    #[serde(default)]
    pub skipped: Vec<SkippedBlock>,
}

impl DiffParse {
    /// File diff whose pre-change path is `path`
    #[must_use]
    pub fn file_for_old_path(&self, path: &str) -> Option<&FileDiff> {
        self.files.iter().find(|f| f.old_path == path)
    }

    /// File diff whose post-change path is `path`
    #[must_use]
    pub fn file_for_new_path(&self, path: &str) -> Option<&FileDiff> {
        self.files.iter().find(|f| f.new_path == path)
    }

    /// Dropped block that was about `path`; its hunks are unknown
    #[must_use]
    pub fn skipped_for_path(&self, path: &str) -> Option<&SkippedBlock> {
        self.skipped.iter().find(|b| b.mentions(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_old_end_and_delta() {
        let hunk = Hunk::new(10, 3, 12, 1);
        assert_eq!(hunk.old_end(), 12);
        assert_eq!(hunk.delta(), -2);
        assert!(!hunk.is_insertion());
    }

    #[test]
    fn test_insertion_never_overlaps() {
        let hunk = Hunk::new(5, 0, 6, 4);
        assert!(hunk.is_insertion());
        assert!(!hunk.overlaps(1, 100));
    }

    #[test]
    fn test_overlap_boundaries() {
        let hunk = Hunk::new(10, 2, 10, 2);
        assert!(hunk.overlaps(11, 20));
        assert!(hunk.overlaps(1, 10));
        assert!(!hunk.overlaps(12, 20));
        assert!(!hunk.overlaps(1, 9));
    }
}
