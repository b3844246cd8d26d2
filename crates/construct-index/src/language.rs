use serde::{Deserialize, Serialize};
use std::path::Path;

/// Source language a construct indexer exists for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    Rust,
}

impl Language {
    /// Every language with a registered indexer
    pub const ALL: [Language; 2] = [Language::Python, Language::Rust];

    /// File extensions (lowercase, no dot) handled by this language
    #[must_use]
    pub const fn extensions(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["py", "pyi", "pyw"],
            Language::Rust => &["rs"],
        }
    }

    /// Detect language from file extension
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        let ext = ext.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.extensions().contains(&ext.as_str()))
    }

    /// Detect language from file path
    #[must_use]
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse the name stored in a semantic target (`"python"`, `"rust"`)
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|lang| lang.as_str().eq_ignore_ascii_case(name))
    }

    /// Get language name as string
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::Rust => "rust",
        }
    }

    /// Get Tree-sitter language instance
    #[must_use]
    pub fn tree_sitter_language(self) -> tree_sitter::Language {
        match self {
            Language::Python => tree_sitter_python::LANGUAGE.into(),
            Language::Rust => tree_sitter_rust::LANGUAGE.into(),
        }
    }

    /// Node kinds that are comments in this grammar (skipped by body hashing)
    #[must_use]
    pub const fn comment_kinds(self) -> &'static [&'static str] {
        match self {
            Language::Python => &["comment"],
            Language::Rust => &["line_comment", "block_comment"],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("PY"), Some(Language::Python));
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("go"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/main.py"), Some(Language::Python));
        assert_eq!(Language::from_path("lib.rs"), Some(Language::Rust));
        assert_eq!(Language::from_path("no_extension"), None);
    }

    #[test]
    fn test_from_name_round_trips() {
        for lang in Language::ALL {
            assert_eq!(Language::from_name(lang.as_str()), Some(lang));
        }
        assert_eq!(Language::from_name("cobol"), None);
    }

    #[test]
    fn test_tree_sitter_language() {
        let mut parser = tree_sitter::Parser::new();
        for lang in Language::ALL {
            assert!(parser.set_language(&lang.tree_sitter_language()).is_ok());
        }
    }

    #[test]
    fn test_comment_kinds() {
        assert!(Language::Python.comment_kinds().contains(&"comment"));
        assert!(Language::Rust.comment_kinds().contains(&"line_comment"));
    }
}
