use crate::language::Language;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role marker for constants (`UPPER_CASE` names, Rust `const` items)
pub const ROLE_CONST: &str = "const";

/// A named, typed unit of source code extracted from a parse tree
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Construct {
    /// Source file path
    pub path: String,

    pub kind: ConstructKind,

    /// Dotted path through enclosing scopes (e.g. "Outer.Inner.method")
    pub qualname: String,

    /// Special-case marker, see [`ROLE_CONST`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Hash of kind, annotation, decorators and parameters (name excluded)
    pub interface_hash: String,

    /// Hash of the implementation/value tokens, comments stripped
    pub body_hash: String,

    /// The construct's subtree contains syntax errors
    pub has_parse_error: bool,
}

impl Construct {
    /// Last segment of the qualname
    #[must_use]
    pub fn name(&self) -> &str {
        self.qualname.rsplit('.').next().unwrap_or(&self.qualname)
    }

    /// Both fingerprint halves equal
    #[must_use]
    pub fn same_fingerprint(&self, interface_hash: &str, body_hash: &str) -> bool {
        self.interface_hash == interface_hash && self.body_hash == body_hash
    }
}

/// Closed set of construct kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstructKind {
    /// Module-level assignment, `const`/`static` item
    Variable,
    /// Class-level assignment, struct field, associated const
    Field,
    /// Function defined inside a class, impl or trait
    Method,
    /// Free function
    Function,
    /// Class, struct, enum, trait
    Class,
}

impl ConstructKind {
    pub const ALL: [ConstructKind; 5] = [
        Self::Variable,
        Self::Field,
        Self::Method,
        Self::Function,
        Self::Class,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Variable => "variable",
            Self::Field => "field",
            Self::Method => "method",
            Self::Function => "function",
            Self::Class => "class",
        }
    }

    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Kinds whose body is a value rather than a block of statements
    #[must_use]
    pub const fn is_value(self) -> bool {
        match self {
            Self::Variable | Self::Field => true,
            Self::Method | Self::Function | Self::Class => false,
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every construct found in one file
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedFile {
    pub path: String,
    pub language: Language,

    /// In document order
    pub constructs: Vec<Construct>,

    /// The tree has at least one ERROR or MISSING node
    pub has_parse_error: bool,
}

impl IndexedFile {
    /// Constructs matching `qualname` (and `kind`, when given), in document order
    #[must_use]
    pub fn lookup(&self, qualname: &str, kind: Option<ConstructKind>) -> Vec<&Construct> {
        self.constructs
            .iter()
            .filter(|c| c.qualname == qualname && kind.map_or(true, |k| c.kind == k))
            .collect()
    }

    /// The single construct matching `(qualname, kind)`; `None` if absent or ambiguous
    #[must_use]
    pub fn find_unique(&self, qualname: &str, kind: Option<ConstructKind>) -> Option<&Construct> {
        match self.lookup(qualname, kind).as_slice() {
            [] => None,
            [only] => Some(*only),
            hits => {
                log::debug!(
                    "{}: {} constructs named {qualname}, refusing to pick one",
                    self.path,
                    hits.len()
                );
                None
            }
        }
    }
}
