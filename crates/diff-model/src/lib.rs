//! # codesub diff model
//!
//! Pure parsing of the two pieces of diff evidence a scan needs, plus the line-shift
//! arithmetic that keeps line-range subscriptions aligned across unrelated edits.
//!
//! ```text
//! git diff -U0 ──────────> parse_unified_diff ──> DiffParse { FileDiff[] { Hunk[] } }
//! git diff --name-status ─> parse_name_status ──> NameStatus { renames, statuses }
//!
//! ([start, end], Hunk[]) ─> compute_shift ──────> Triggered(reasons) | Shifted { shift }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codesub_diff::{compute_shift, parse_unified_diff, ShiftOutcome};
//!
//! let diff = "diff --git a/app.py b/app.py\n--- a/app.py\n+++ b/app.py\n@@ -1,0 +2 @@\n+import os\n";
//! let parse = parse_unified_diff(diff);
//! let file = parse.file_for_old_path("app.py").unwrap();
//!
//! match compute_shift(4, 5, &file.hunks, file.is_deleted_file) {
//!     ShiftOutcome::Shifted { new_start, new_end, .. } => assert_eq!((new_start, new_end), (5, 6)),
//!     ShiftOutcome::Triggered(reasons) => panic!("unexpected trigger: {reasons:?}"),
//! }
//! ```

mod name_status;
mod parser;
mod shift;
mod types;

pub use name_status::{parse_name_status, NameStatus};
pub use parser::parse_unified_diff;
pub use shift::{compute_shift, ShiftOutcome, ShiftTrigger};
pub use types::{DiffParse, FileDiff, Hunk, SkippedBlock};
