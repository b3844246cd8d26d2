use crate::types::Hunk;
use serde::{Deserialize, Serialize};

/// Why a watched line range counts as changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShiftTrigger {
    FileDeleted,
    OverlapHunk,
    InsertInsideRange,
}

impl ShiftTrigger {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FileDeleted => "file_deleted",
            Self::OverlapHunk => "overlap_hunk",
            Self::InsertInsideRange => "insert_inside_range",
        }
    }
}

/// Result of re-aligning `[start, end]` against a file's hunks
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShiftOutcome {
    /// The range itself was touched; reasons are deduplicated, in detection order
    Triggered(Vec<ShiftTrigger>),

    /// Untouched; the range moved by `shift` lines
    Shifted {
        shift: i64,
        new_start: usize,
        new_end: usize,
    },
}

impl ShiftOutcome {
    #[must_use]
    pub const fn is_triggered(&self) -> bool {
        matches!(self, Self::Triggered(_))
    }
}

/// Decide whether the 1-based inclusive range `[start, end]` was changed by `hunks`
/// and, if not, where it moved to.
///
/// `hunks` must be sorted ascending by `old_start`.
#[must_use]
pub fn compute_shift(start: usize, end: usize, hunks: &[Hunk], file_deleted: bool) -> ShiftOutcome {
    let reasons = trigger_reasons(start, end, hunks, file_deleted);
    if !reasons.is_empty() {
        return ShiftOutcome::Triggered(reasons);
    }

    let mut shift: i64 = 0;
    for hunk in hunks {
        if hunk.is_insertion() {
            if hunk.old_start < start {
                shift += hunk.delta();
            } else if hunk.old_start > end {
                break;
            }
        } else if hunk.old_end() < start {
            shift += hunk.delta();
        } else if hunk.old_start > end {
            break;
        }
    }

    ShiftOutcome::Shifted {
        shift,
        new_start: apply(start, shift),
        new_end: apply(end, shift),
    }
}

fn trigger_reasons(start: usize, end: usize, hunks: &[Hunk], file_deleted: bool) -> Vec<ShiftTrigger> {
    let mut reasons = Vec::new();
    let mut push = |reason: ShiftTrigger| {
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    };

    if file_deleted {
        push(ShiftTrigger::FileDeleted);
    }

    for hunk in hunks {
        if hunk.is_insertion() {
            if start <= hunk.old_start && hunk.old_start < end {
                push(ShiftTrigger::InsertInsideRange);
            }
        } else if hunk.overlaps(start, end) {
            push(ShiftTrigger::OverlapHunk);
        }
    }

    reasons
}

fn apply(line: usize, shift: i64) -> usize {
    (line as i64 + shift).max(1) as usize
}
