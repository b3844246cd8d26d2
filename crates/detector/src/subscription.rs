use crate::error::{DetectorError, Result};
use codesub_constructs::fingerprint::is_fingerprint;
use codesub_constructs::{Construct, ConstructError, ConstructKind, Language, FINGERPRINT_VERSION};
use serde::{Deserialize, Serialize};

/// The fingerprint a semantic subscription remembers from when it was created or last
/// updated
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticTarget {
    /// Language name, see [`Language::as_str`]
    pub language: String,
    pub kind: ConstructKind,
    pub qualname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub interface_hash: String,
    pub body_hash: String,
    pub fingerprint_version: u32,
}

impl SemanticTarget {
    /// Snapshot a freshly indexed construct
    pub fn from_construct(construct: &Construct) -> Result<Self> {
        let language = Language::from_path(&construct.path)
            .ok_or_else(|| ConstructError::unsupported_language(construct.path.as_str()))?;
        Ok(Self {
            language: language.as_str().to_string(),
            kind: construct.kind,
            qualname: construct.qualname.clone(),
            role: construct.role.clone(),
            interface_hash: construct.interface_hash.clone(),
            body_hash: construct.body_hash.clone(),
            fingerprint_version: FINGERPRINT_VERSION,
        })
    }

    #[must_use]
    pub fn language(&self) -> Option<Language> {
        Language::from_name(&self.language)
    }
}

/// A watch on a line range or on a named construct.
///
/// Line-based when `semantic` is `None`. For semantic subscriptions the line range is
/// the construct's location when the fingerprint was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic: Option<SemanticTarget>,

    #[serde(default = "default_active")]
    pub active: bool,

    /// Trigger when an identical copy of the construct shows up elsewhere;
    /// `None` defers to `ScanConfig::default_trigger_on_duplicate`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger_on_duplicate: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

const fn default_active() -> bool {
    true
}

impl Subscription {
    /// Watch lines `[start_line, end_line]` of `path`
    pub fn line(
        id: impl Into<String>,
        path: impl Into<String>,
        start_line: usize,
        end_line: usize,
    ) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            start_line,
            end_line,
            semantic: None,
            active: true,
            trigger_on_duplicate: None,
            label: None,
            description: None,
        }
    }

    /// Watch `construct` by identity
    pub fn semantic(id: impl Into<String>, construct: &Construct) -> Result<Self> {
        Ok(Self {
            semantic: Some(SemanticTarget::from_construct(construct)?),
            ..Self::line(
                id,
                construct.path.clone(),
                construct.start_line,
                construct.end_line,
            )
        })
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub const fn is_semantic(&self) -> bool {
        self.semantic.is_some()
    }

    /// Reject subscriptions the engine cannot evaluate
    pub fn validate(&self) -> Result<()> {
        let fail = |reason: String| Err(DetectorError::invalid_subscription(&self.id, reason));

        if self.id.trim().is_empty() {
            return fail("empty id".to_string());
        }
        if self.path.trim().is_empty() {
            return fail("empty path".to_string());
        }
        if self.start_line == 0 || self.end_line < self.start_line {
            return fail(format!(
                "invalid line range {}-{}",
                self.start_line, self.end_line
            ));
        }

        let Some(target) = &self.semantic else {
            return Ok(());
        };

        if target.qualname.trim().is_empty() {
            return fail("semantic target has an empty qualname".to_string());
        }
        if target.fingerprint_version != FINGERPRINT_VERSION {
            return fail(format!(
                "fingerprint version {} is not supported (expected {FINGERPRINT_VERSION})",
                target.fingerprint_version
            ));
        }
        for (name, hash) in [
            ("interface_hash", &target.interface_hash),
            ("body_hash", &target.body_hash),
        ] {
            if !is_fingerprint(hash) {
                return fail(format!("{name} {hash:?} is not a fingerprint"));
            }
        }

        let Some(language) = target.language() else {
            return fail(format!("unknown language {:?}", target.language));
        };
        if Language::from_path(&self.path) != Some(language) {
            return fail(format!(
                "path {} is not a {} source file",
                self.path, target.language
            ));
        }

        Ok(())
    }
}
