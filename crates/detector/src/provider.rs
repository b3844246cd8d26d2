use std::collections::HashMap;
use thiserror::Error;

/// Why file content could not be supplied
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContentError {
    #[error("{path} not found at {}", .revision.as_deref().unwrap_or("working tree"))]
    NotFound {
        path: String,
        revision: Option<String>,
    },

    #[error("{0} is binary")]
    Binary(String),

    #[error("{0} is not valid UTF-8")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// The single I/O seam of a scan: file content at a revision (`None` = working tree).
///
/// Called from worker threads, hence `Sync`. Any closure with the right shape works.
pub trait ContentProvider: Sync {
    fn read(&self, path: &str, revision: Option<&str>) -> Result<String, ContentError>;
}

impl<F> ContentProvider for F
where
    F: Fn(&str, Option<&str>) -> Result<String, ContentError> + Sync,
{
    fn read(&self, path: &str, revision: Option<&str>) -> Result<String, ContentError> {
        self(path, revision)
    }
}

/// Content provider backed by a map, keyed by `(revision, path)`
#[derive(Debug, Clone, Default)]
pub struct InMemoryProvider {
    files: HashMap<(Option<String>, String), String>,
}

impl InMemoryProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: add a file
    #[must_use]
    pub fn with_file(
        mut self,
        revision: Option<&str>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        self.insert(revision, path, content);
        self
    }

    pub fn insert(
        &mut self,
        revision: Option<&str>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.files
            .insert((revision.map(str::to_string), path.into()), content.into());
    }
}

impl ContentProvider for InMemoryProvider {
    fn read(&self, path: &str, revision: Option<&str>) -> Result<String, ContentError> {
        self.files
            .get(&(revision.map(str::to_string), path.to_string()))
            .cloned()
            .ok_or_else(|| ContentError::NotFound {
                path: path.to_string(),
                revision: revision.map(str::to_string),
            })
    }
}
