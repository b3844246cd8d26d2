//! # codesub detector
//!
//! Decides, from diff evidence alone, whether each subscription's target changed, moved
//! or disappeared.
//!
//! ## Architecture
//!
//! ```text
//! ScanRequest (diff text, name-status text)
//!     │
//!     ├──> ScanContext: parsed hunks, rename and status maps (once per scan)
//!     │
//!     └──> per active subscription (rayon, one IndexerPool per worker)
//!          ├─> line range ──> line-shift calculator ──> Trigger | Proposal | unchanged
//!          └─> semantic ────> ConstructCache (revision, path) → IndexedFile
//!                             └─> matcher: exact name → same-file hashes → other files
//!
//! ScanResult { triggers, proposals, unchanged }
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codesub_detector::{scan, InMemoryProvider, ScanRequest, Subscription};
//!
//! let diff = "diff --git a/app.py b/app.py\n--- a/app.py\n+++ b/app.py\n@@ -1,0 +2 @@\n+import os\n";
//! let subs = vec![Subscription::line("config-block", "app.py", 4, 5)];
//!
//! let request = ScanRequest::new("HEAD~1", diff, "M\tapp.py\n");
//! let result = scan(&request, &subs, &InMemoryProvider::new()).unwrap();
//!
//! let proposal = result.proposal_for("config-block").unwrap();
//! assert_eq!(proposal.shift, Some(1));
//! assert!(result.triggers.is_empty());
//! ```

mod cache;
mod config;
mod context;
mod detector;
mod error;
mod line_tracker;
mod matcher;
mod provider;
mod result;
mod subscription;

pub use cache::{ConstructCache, FileSnapshot};
pub use config::ScanConfig;
pub use detector::{scan, Detector, ScanRequest};
pub use error::{DetectorError, Result};
pub use provider::{ContentError, ContentProvider, InMemoryProvider};
pub use result::{ChangeType, Confidence, Proposal, ScanResult, Trigger};
pub use subscription::{SemanticTarget, Subscription};
