use crate::error::{ConstructError, Result};
use crate::fingerprint::{body_hash, interface_hash};
use crate::language::Language;
use crate::python::PythonIndexer;
use crate::rust::RustIndexer;
use crate::types::{Construct, ConstructKind, IndexedFile};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tree_sitter::{Node, Parser, Tree};

/// Extracts constructs from one language's source files.
///
/// Implementations own their tree-sitter parser, so an indexer must not be shared
/// between threads; give each worker its own (see [`IndexerPool`]).
pub trait ConstructIndexer: Send {
    fn language(&self) -> Language;

    /// File extensions this indexer is selected for
    fn supported_extensions(&self) -> &'static [&'static str] {
        self.language().extensions()
    }

    /// Parse `source` and return every construct in it.
    ///
    /// Syntax errors never fail the call; they surface as `has_parse_error`.
    fn index_file(&mut self, source: &str, path: &str) -> Result<IndexedFile>;

    /// The one construct named `qualname` (of `kind`, if given).
    ///
    /// Returns `Ok(None)` when there are zero or several candidates.
    fn find_construct(
        &mut self,
        source: &str,
        path: &str,
        qualname: &str,
        kind: Option<ConstructKind>,
    ) -> Result<Option<Construct>> {
        let file = self.index_file(source, path)?;
        Ok(file.find_unique(qualname, kind).cloned())
    }
}

struct Registration {
    language: Language,
    build: fn() -> Result<Box<dyn ConstructIndexer>>,
}

static REGISTRY: &[Registration] = &[
    Registration {
        language: Language::Python,
        build: build_python,
    },
    Registration {
        language: Language::Rust,
        build: build_rust,
    },
];

fn build_python() -> Result<Box<dyn ConstructIndexer>> {
    Ok(Box::new(PythonIndexer::new()?))
}

fn build_rust() -> Result<Box<dyn ConstructIndexer>> {
    Ok(Box::new(RustIndexer::new()?))
}

/// Construct a fresh indexer for `language`
pub fn indexer_for(language: Language) -> Result<Box<dyn ConstructIndexer>> {
    let registration = REGISTRY
        .iter()
        .find(|r| r.language == language)
        .ok_or_else(|| ConstructError::unsupported_language(language.as_str()))?;
    (registration.build)()
}

/// Construct a fresh indexer selected by the extension of `path`
pub fn indexer_for_path(path: &str) -> Result<Box<dyn ConstructIndexer>> {
    let language =
        Language::from_path(path).ok_or_else(|| ConstructError::unsupported_language(path))?;
    indexer_for(language)
}

/// Every extension some registered indexer handles
#[must_use]
pub fn supported_extensions() -> Vec<&'static str> {
    REGISTRY
        .iter()
        .flat_map(|r| r.language.extensions().iter().copied())
        .collect()
}

/// Whether `path` has an indexer
#[must_use]
pub fn is_supported_path(path: &str) -> bool {
    Language::from_path(path).is_some_and(|lang| REGISTRY.iter().any(|r| r.language == lang))
}

/// Lazily built indexers, one per language, owned by a single worker
#[derive(Default)]
pub struct IndexerPool {
    indexers: HashMap<Language, Box<dyn ConstructIndexer>>,
}

impl IndexerPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn indexer(&mut self, language: Language) -> Result<&mut Box<dyn ConstructIndexer>> {
        match self.indexers.entry(language) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                log::debug!("Building {} indexer", language.as_str());
                Ok(entry.insert(indexer_for(language)?))
            }
        }
    }

    pub fn index_file(&mut self, source: &str, path: &str) -> Result<IndexedFile> {
        let language =
            Language::from_path(path).ok_or_else(|| ConstructError::unsupported_language(path))?;
        self.indexer(language)?.index_file(source, path)
    }

    pub fn find_construct(
        &mut self,
        source: &str,
        path: &str,
        qualname: &str,
        kind: Option<ConstructKind>,
    ) -> Result<Option<Construct>> {
        let language =
            Language::from_path(path).ok_or_else(|| ConstructError::unsupported_language(path))?;
        self.indexer(language)?
            .find_construct(source, path, qualname, kind)
    }
}

/// Build a parser bound to `language`
pub(crate) fn new_parser(language: Language) -> Result<Parser> {
    let mut parser = Parser::new();
    parser
        .set_language(&language.tree_sitter_language())
        .map_err(|e| ConstructError::tree_sitter(format!("Failed to set language: {e}")))?;
    Ok(parser)
}

pub(crate) fn parse_source(parser: &mut Parser, source: &str) -> Result<Tree> {
    parser
        .parse(source, None)
        .ok_or_else(|| ConstructError::tree_sitter("Failed to parse source code"))
}

/// Text of `node`, empty if the byte range is not valid in `source`
pub(crate) fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    source.get(node.byte_range()).unwrap_or_default()
}

/// Raw material for one construct, turned into a [`Construct`] by [`ConstructSpec::finish`]
pub(crate) struct ConstructSpec<'t> {
    pub kind: ConstructKind,
    pub qualname: String,
    pub role: Option<&'static str>,
    /// Node whose rows give the construct's line range
    pub span: Node<'t>,
    /// First row when leading attributes/decorators sit outside `span`
    pub start_row: Option<usize>,
    pub annotation: Option<String>,
    pub decorators: Vec<String>,
    pub params: Option<String>,
    pub body: Option<Node<'t>>,
}

impl<'t> ConstructSpec<'t> {
    pub fn new(kind: ConstructKind, qualname: String, span: Node<'t>) -> Self {
        Self {
            kind,
            qualname,
            role: None,
            span,
            start_row: None,
            annotation: None,
            decorators: Vec::new(),
            params: None,
            body: None,
        }
    }

    pub fn finish(self, path: &str, source: &str, language: Language) -> Construct {
        let start_row = self
            .start_row
            .map_or(self.span.start_position().row, |row| {
                row.min(self.span.start_position().row)
            });

        Construct {
            path: path.to_string(),
            kind: self.kind,
            qualname: self.qualname,
            role: self.role.map(str::to_string),
            start_line: start_row + 1,
            end_line: self.span.end_position().row + 1,
            interface_hash: interface_hash(
                self.kind,
                self.annotation.as_deref(),
                &self.decorators,
                self.params.as_deref(),
            ),
            body_hash: body_hash(self.body, source, language.comment_kinds()),
            has_parse_error: self.span.has_error(),
        }
    }
}

/// Join an enclosing scope and a name with `.`
pub(crate) fn qualify(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}.{name}", scope.join("."))
    }
}

/// `UPPER_CASE` naming convention for constants
pub(crate) fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
