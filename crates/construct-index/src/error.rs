use thiserror::Error;

/// Result type for construct indexing
pub type Result<T> = std::result::Result<T, ConstructError>;

/// Errors that can occur while indexing a source file.
///
/// Syntax errors in the source are *not* errors: they are reported through
/// `has_parse_error` on the produced constructs.
#[derive(Error, Debug)]
pub enum ConstructError {
    /// No indexer is registered for the file's language
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    /// Tree-sitter refused to build a parser or a tree
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),
}

impl ConstructError {
    /// Create an unsupported language error
    pub fn unsupported_language(lang: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(lang.into())
    }

    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }
}
