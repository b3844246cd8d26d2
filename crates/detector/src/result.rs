use crate::subscription::Subscription;
use codesub_constructs::ConstructKind;
use serde::{Deserialize, Serialize};

/// How a watched target changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeType {
    /// Signature, annotation or decorators changed
    Structural,
    /// Body or value changed, or lines inside a watched range were edited
    Content,
    /// File or construct is gone
    Missing,
    /// Several equally good candidates; a human has to pick
    Ambiguous,
    /// The file no longer parses and the target could not be found
    ParseError,
}

impl ChangeType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Structural => "STRUCTURAL",
            Self::Content => "CONTENT",
            Self::Missing => "MISSING",
            Self::Ambiguous => "AMBIGUOUS",
            Self::ParseError => "PARSE_ERROR",
        }
    }
}

/// "Tell the human to look"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trigger {
    pub subscription_id: String,
    pub path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub reasons: Vec<String>,
    pub change_type: ChangeType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl Trigger {
    pub(crate) fn for_subscription(
        sub: &Subscription,
        change_type: ChangeType,
        reasons: Vec<String>,
    ) -> Self {
        Self {
            subscription_id: sub.id.clone(),
            path: sub.path.clone(),
            start_line: sub.start_line,
            end_line: sub.end_line,
            reasons,
            change_type,
            details: None,
        }
    }

    #[must_use]
    pub(crate) fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn has_reason(&self, reason: &str) -> bool {
        self.reasons.iter().any(|r| r == reason)
    }
}

/// How sure the matcher is about a proposed relocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// "Update the subscription's coordinates"; no notification needed on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub subscription_id: String,
    pub old_path: String,
    pub old_start: usize,
    pub old_end: usize,
    pub new_path: String,
    pub new_start: usize,
    pub new_end: usize,
    pub reasons: Vec<String>,
    pub confidence: Confidence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_qualname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_kind: Option<ConstructKind>,
}

impl Proposal {
    pub(crate) fn relocate(
        sub: &Subscription,
        new_path: &str,
        new_start: usize,
        new_end: usize,
        reasons: Vec<String>,
        confidence: Confidence,
    ) -> Self {
        Self {
            subscription_id: sub.id.clone(),
            old_path: sub.path.clone(),
            old_start: sub.start_line,
            old_end: sub.end_line,
            new_path: new_path.to_string(),
            new_start,
            new_end,
            reasons,
            confidence,
            shift: None,
            new_qualname: None,
            new_kind: None,
        }
    }

    /// The subscription with this proposal's coordinates.
    ///
    /// Only location and identity move; stored fingerprints are left as they were, so a
    /// construct that also changed keeps triggering until its fingerprint is refreshed.
    #[must_use]
    pub fn apply(&self, sub: &Subscription) -> Subscription {
        let mut updated = sub.clone();
        updated.path = self.new_path.clone();
        updated.start_line = self.new_start;
        updated.end_line = self.new_end;
        if let Some(target) = updated.semantic.as_mut() {
            if let Some(qualname) = &self.new_qualname {
                target.qualname = qualname.clone();
            }
            if let Some(kind) = self.new_kind {
                target.kind = kind;
            }
        }
        updated
    }
}

/// Everything one scan found
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub base_ref: String,
    /// `None` when the target is the working tree
    pub target_ref: Option<String>,
    pub triggers: Vec<Trigger>,
    pub proposals: Vec<Proposal>,
    pub unchanged: Vec<Subscription>,
}

impl ScanResult {
    /// No triggers and no proposals
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.triggers.is_empty() && self.proposals.is_empty()
    }

    #[must_use]
    pub fn trigger_for(&self, subscription_id: &str) -> Option<&Trigger> {
        self.triggers
            .iter()
            .find(|t| t.subscription_id == subscription_id)
    }

    #[must_use]
    pub fn proposal_for(&self, subscription_id: &str) -> Option<&Proposal> {
        self.proposals
            .iter()
            .find(|p| p.subscription_id == subscription_id)
    }
}
