//! # codesub constructs
//!
//! Error-tolerant extraction of named code constructs, with content fingerprints that
//! survive renames and moves.
//!
//! ## Architecture
//!
//! ```text
//! Source Code + path
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Registry → per-language ConstructIndexer (owns a tree-sitter Parser)
//!     │
//!     ├──> Scope walk
//!     │    ├─> module / class level assignments → Variable / Field
//!     │    ├─> functions and methods (decorated too) → Function / Method
//!     │    └─> classes, structs, traits → Class (recursed into)
//!     │
//!     └──> Fingerprint Engine
//!          ├─> interface hash: kind, annotation, decorators, parameters
//!          └─> body hash: leaf tokens without comments
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codesub_constructs::{ConstructKind, IndexerPool};
//!
//! let mut pool = IndexerPool::new();
//! let code = "class Foo:\n    def bar(self) -> int:\n        return 1\n";
//!
//! let file = pool.index_file(code, "foo.py").unwrap();
//! let bar = file.find_unique("Foo.bar", Some(ConstructKind::Method)).unwrap();
//! assert_eq!((bar.start_line, bar.end_line), (2, 3));
//! assert_eq!(bar.interface_hash.len(), 16);
//! ```

mod error;
pub mod fingerprint;
mod indexer;
mod language;
mod python;
mod rust;
mod types;

pub use error::{ConstructError, Result};
pub use fingerprint::{FINGERPRINT_VERSION, HASH_HEX_LEN};
pub use indexer::{
    indexer_for, indexer_for_path, is_supported_path, supported_extensions, ConstructIndexer,
    IndexerPool,
};
pub use language::Language;
pub use python::PythonIndexer;
pub use rust::RustIndexer;
pub use types::{Construct, ConstructKind, IndexedFile, ROLE_CONST};
