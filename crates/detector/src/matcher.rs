//! Staged identity matching for semantic subscriptions.
//!
//! 1. exact `(qualname, kind)` lookup in the file the subscription points at (after
//!    renames)
//! 2. fingerprint search among same-kind constructs of that file
//! 3. the same search across the other changed files of the diff (opt-in)
//!
//! Every fingerprint search walks the tiers exact, body-only, interface-only, and stops at
//! the first tier with any hit. Several hits at that tier is an ambiguity; weaker tiers are
//! never consulted to break it.

use crate::cache::FileSnapshot;
use crate::context::{Evaluation, ScanContext};
use crate::result::{ChangeType, Confidence, Proposal, Trigger};
use crate::subscription::{SemanticTarget, Subscription};
use codesub_constructs::{Construct, IndexedFile, IndexerPool};
use serde_json::json;
use std::sync::Arc;

/// Fingerprint search strength, strongest first
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Tier {
    /// Interface and body both match
    Exact,
    Body,
    Interface,
}

impl Tier {
    const ORDER: [Tier; 3] = [Self::Exact, Self::Body, Self::Interface];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Body => "body",
            Self::Interface => "interface",
        }
    }

    const fn confidence(self) -> Confidence {
        match self {
            Self::Exact => Confidence::High,
            Self::Body => Confidence::Medium,
            Self::Interface => Confidence::Low,
        }
    }

    fn matches(self, target: &SemanticTarget, construct: &Construct) -> bool {
        let interface = construct.interface_hash == target.interface_hash;
        let body = construct.body_hash == target.body_hash;
        match self {
            Self::Exact => interface && body,
            Self::Body => body,
            Self::Interface => interface,
        }
    }
}

#[derive(Debug)]
pub(crate) enum Search<'c> {
    Unique(Tier, &'c Construct),
    Ambiguous(Tier, Vec<&'c Construct>),
    NotFound,
}

/// Search `candidates` (already filtered to the target's kind) tier by tier
pub(crate) fn tiered_search<'c>(target: &SemanticTarget, candidates: &[&'c Construct]) -> Search<'c> {
    for tier in Tier::ORDER {
        let mut hits: Vec<&'c Construct> = candidates
            .iter()
            .copied()
            .filter(|c| tier.matches(target, c))
            .collect();
        match hits.len() {
            0 => continue,
            1 => return Search::Unique(tier, hits.remove(0)),
            _ => return Search::Ambiguous(tier, hits),
        }
    }
    Search::NotFound
}

enum Located<'c> {
    /// Stage 1
    Exact(&'c Construct),
    /// Stage 2 or 3
    Relocated {
        tier: Tier,
        construct: &'c Construct,
        cross_file: bool,
    },
    Ambiguous {
        reason: &'static str,
        tier: Option<Tier>,
        candidates: Vec<&'c Construct>,
    },
    NotFound,
}

/// Evaluate a semantic subscription
pub(crate) fn evaluate_semantic(
    sub: &Subscription,
    target: &SemanticTarget,
    ctx: &ScanContext<'_>,
    pool: &mut IndexerPool,
) -> Evaluation {
    let cross_file = ctx.config.cross_file_search;
    let check_duplicates = sub
        .trigger_on_duplicate
        .unwrap_or(ctx.config.default_trigger_on_duplicate);

    if !ctx.is_touched(&sub.path) && !(check_duplicates && cross_file) {
        log::debug!("{}: {} not in diff", sub.id, sub.path);
        return Evaluation::unchanged();
    }

    let deleted = ctx.is_deleted(&sub.path);
    let new_path = ctx.resolve(&sub.path);
    let snapshot = (!deleted).then(|| ctx.snapshot(new_path, pool));
    let file = match snapshot.as_deref() {
        Some(FileSnapshot::Indexed(file)) => Some(file),
        _ => None,
    };

    let located = file.map_or(Located::NotFound, |file| locate_in_file(target, file));

    let needs_others = cross_file && (check_duplicates || matches!(located, Located::NotFound));
    let others = if needs_others {
        other_files(ctx, target, new_path, pool)
    } else {
        Vec::new()
    };
    let other_constructs: Vec<&Construct> = indexed(&others)
        .flat_map(|f| f.constructs.iter())
        .collect();

    let located = match located {
        Located::NotFound if cross_file => locate_across(target, &other_constructs),
        located => located,
    };

    let (mut evaluation, current) = match located {
        Located::Exact(construct) => (found(sub, target, construct, None), construct),
        Located::Relocated {
            tier,
            construct,
            cross_file,
        } => (
            found(sub, target, construct, Some((tier, cross_file))),
            construct,
        ),
        Located::Ambiguous {
            reason,
            tier,
            candidates,
        } => {
            log::debug!(
                "{}: {} candidates for {}",
                sub.id,
                candidates.len(),
                target.qualname
            );
            return Evaluation::triggered(
                Trigger::for_subscription(sub, ChangeType::Ambiguous, vec![reason.to_string()])
                    .with_details(json!({
                        "tier": tier.map(Tier::as_str),
                        "candidates": candidates.iter().map(|c| locate_json(c)).collect::<Vec<_>>(),
                    })),
            );
        }
        Located::NotFound => {
            return not_found(sub, target, deleted, snapshot.as_deref(), cross_file);
        }
    };

    if check_duplicates {
        let same_file = file.map_or(&[][..], |f| f.constructs.as_slice());
        let duplicates: Vec<&Construct> = same_file
            .iter()
            .chain(other_constructs.iter().copied())
            .filter(|c| !std::ptr::eq(*c, current))
            .filter(|c| c.same_fingerprint(&current.interface_hash, &current.body_hash))
            .collect();
        if !duplicates.is_empty() {
            flag_duplicates(sub, &mut evaluation, &duplicates);
        }
    }

    evaluation
}

/// Stages 1 and 2 inside a single file
fn locate_in_file<'c>(target: &SemanticTarget, file: &'c IndexedFile) -> Located<'c> {
    let same_kind: Vec<&Construct> = file
        .constructs
        .iter()
        .filter(|c| c.kind == target.kind)
        .collect();

    let named = file.lookup(&target.qualname, Some(target.kind));
    match named.len() {
        0 => from_search(tiered_search(target, &same_kind), false),
        1 => Located::Exact(named[0]),
        _ => {
            // Same-named overloads (property getter and setter, one method per trait impl):
            // a unique exact fingerprint in the file still identifies the target.
            let exact: Vec<&Construct> = same_kind
                .iter()
                .copied()
                .filter(|c| Tier::Exact.matches(target, c))
                .collect();
            if exact.len() == 1 && exact[0].qualname == target.qualname {
                Located::Exact(exact[0])
            } else {
                Located::Ambiguous {
                    reason: "ambiguous_qualname",
                    tier: None,
                    candidates: named,
                }
            }
        }
    }
}

/// Stage 3 over the union of all other changed files
fn locate_across<'c>(target: &SemanticTarget, constructs: &[&'c Construct]) -> Located<'c> {
    let same_kind: Vec<&Construct> = constructs
        .iter()
        .copied()
        .filter(|c| c.kind == target.kind)
        .collect();
    from_search(tiered_search(target, &same_kind), true)
}

fn from_search(search: Search<'_>, cross_file: bool) -> Located<'_> {
    match search {
        Search::Unique(tier, construct) => Located::Relocated {
            tier,
            construct,
            cross_file,
        },
        Search::Ambiguous(tier, candidates) => Located::Ambiguous {
            reason: "ambiguous_match",
            tier: Some(tier),
            candidates,
        },
        Search::NotFound => Located::NotFound,
    }
}

fn other_files(
    ctx: &ScanContext<'_>,
    target: &SemanticTarget,
    exclude: &str,
    pool: &mut IndexerPool,
) -> Vec<Arc<FileSnapshot>> {
    let Some(language) = target.language() else {
        return Vec::new();
    };
    ctx.changed_paths(language)
        .iter()
        .filter(|path| path.as_str() != exclude)
        .map(|path| ctx.snapshot(path, pool))
        .collect()
}

fn indexed(snapshots: &[Arc<FileSnapshot>]) -> impl Iterator<Item = &IndexedFile> {
    snapshots.iter().filter_map(|s| match s.as_ref() {
        FileSnapshot::Indexed(file) => Some(file),
        _ => None,
    })
}

/// Interface or body drift between the stored fingerprint and `construct`
fn classify(target: &SemanticTarget, construct: &Construct) -> Option<(ChangeType, Vec<String>)> {
    let interface_changed = construct.interface_hash != target.interface_hash;
    let body_changed = construct.body_hash != target.body_hash;

    match (interface_changed, body_changed) {
        (true, true) => Some((
            ChangeType::Structural,
            vec!["interface_changed".to_string(), "body_changed".to_string()],
        )),
        (true, false) => Some((ChangeType::Structural, vec!["interface_changed".to_string()])),
        (false, true) => Some((ChangeType::Content, vec!["body_changed".to_string()])),
        (false, false) => None,
    }
}

fn found(
    sub: &Subscription,
    target: &SemanticTarget,
    construct: &Construct,
    relocation: Option<(Tier, bool)>,
) -> Evaluation {
    let trigger = classify(target, construct).map(|(change_type, reasons)| {
        Trigger::for_subscription(sub, change_type, reasons).with_details(json!({
            "qualname": construct.qualname,
            "kind": construct.kind,
            "location": locate_json(construct),
            "interface_hash": { "old": target.interface_hash, "new": construct.interface_hash },
            "body_hash": { "old": target.body_hash, "new": construct.body_hash },
        }))
    });

    let proposal = match relocation {
        None => {
            let path_changed = construct.path != sub.path;
            let moved = construct.start_line != sub.start_line || construct.end_line != sub.end_line;
            (path_changed || moved).then(|| {
                let reason = if path_changed { "rename" } else { "line_shift" };
                let mut proposal = Proposal::relocate(
                    sub,
                    &construct.path,
                    construct.start_line,
                    construct.end_line,
                    vec![reason.to_string()],
                    Confidence::High,
                );
                proposal.shift = Some(construct.start_line as i64 - sub.start_line as i64);
                proposal
            })
        }
        Some((tier, cross_file)) => {
            let mut reasons = vec!["semantic_location".to_string()];
            if cross_file {
                reasons.push("cross_file".to_string());
            }
            let mut proposal = Proposal::relocate(
                sub,
                &construct.path,
                construct.start_line,
                construct.end_line,
                reasons,
                tier.confidence(),
            );
            proposal.new_qualname = Some(construct.qualname.clone());
            proposal.new_kind = Some(construct.kind);
            Some(proposal)
        }
    };

    log::debug!(
        "{}: {} at {}:{} ({}{})",
        sub.id,
        construct.qualname,
        construct.path,
        construct.start_line,
        trigger.as_ref().map_or("unchanged", |t| t.change_type.as_str()),
        relocation.map_or(String::new(), |(tier, _)| format!(", {} match", tier.as_str()))
    );

    Evaluation { trigger, proposal }
}

fn flag_duplicates(sub: &Subscription, evaluation: &mut Evaluation, duplicates: &[&Construct]) {
    log::debug!("{}: {} identical copies found", sub.id, duplicates.len());
    let copies = json!(duplicates.iter().map(|c| locate_json(c)).collect::<Vec<_>>());

    match evaluation.trigger.as_mut() {
        Some(trigger) => {
            trigger.reasons.push("duplicate_found".to_string());
            if let Some(serde_json::Value::Object(details)) = trigger.details.as_mut() {
                details.insert("duplicates".to_string(), copies);
            }
        }
        None => {
            evaluation.trigger = Some(
                Trigger::for_subscription(
                    sub,
                    ChangeType::Ambiguous,
                    vec!["duplicate_found".to_string()],
                )
                .with_details(json!({ "duplicates": copies })),
            );
        }
    }
}

fn not_found(
    sub: &Subscription,
    target: &SemanticTarget,
    deleted: bool,
    snapshot: Option<&FileSnapshot>,
    cross_file: bool,
) -> Evaluation {
    let (change_type, reason, cause) = match snapshot {
        _ if deleted => (ChangeType::Missing, "file_deleted", None),
        None => (ChangeType::Missing, "file_deleted", None),
        Some(FileSnapshot::Unreadable(why)) => {
            (ChangeType::Missing, "file_unreadable", Some(why.clone()))
        }
        Some(FileSnapshot::Unsupported) => (ChangeType::Missing, "unsupported_language", None),
        Some(FileSnapshot::Indexed(file)) if file.has_parse_error => {
            (ChangeType::ParseError, "parse_error", None)
        }
        Some(FileSnapshot::Indexed(_)) => (ChangeType::Missing, "construct_absent", None),
    };

    log::debug!("{}: {} not found ({reason})", sub.id, target.qualname);
    Evaluation::triggered(
        Trigger::for_subscription(sub, change_type, vec![reason.to_string()]).with_details(json!({
            "qualname": target.qualname,
            "kind": target.kind,
            "cause": cause,
            "cross_file_searched": cross_file,
        })),
    )
}

fn locate_json(construct: &Construct) -> serde_json::Value {
    json!({
        "path": construct.path,
        "qualname": construct.qualname,
        "start_line": construct.start_line,
        "end_line": construct.end_line,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use codesub_constructs::ConstructKind;

    fn construct(qualname: &str, interface: &str, body: &str) -> Construct {
        Construct {
            path: "a.py".to_string(),
            kind: ConstructKind::Method,
            qualname: qualname.to_string(),
            role: None,
            start_line: 1,
            end_line: 2,
            interface_hash: interface.to_string(),
            body_hash: body.to_string(),
            has_parse_error: false,
        }
    }

    fn target(interface: &str, body: &str) -> SemanticTarget {
        SemanticTarget {
            language: "python".to_string(),
            kind: ConstructKind::Method,
            qualname: "Foo.bar".to_string(),
            role: None,
            interface_hash: interface.to_string(),
            body_hash: body.to_string(),
            fingerprint_version: 1,
        }
    }

    #[test]
    fn test_exact_tier_wins_over_weaker_hits() {
        let exact = construct("Foo.baz", "i1", "b1");
        let body_only = construct("Foo.qux", "i2", "b1");
        let candidates = vec![&exact, &body_only];

        match tiered_search(&target("i1", "b1"), &candidates) {
            Search::Unique(Tier::Exact, hit) => assert_eq!(hit.qualname, "Foo.baz"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_ambiguous_tier_does_not_fall_through() {
        let a = construct("Foo.a", "i2", "b1");
        let b = construct("Foo.b", "i3", "b1");
        let interface_only = construct("Foo.c", "i1", "b9");
        let candidates = vec![&a, &b, &interface_only];

        match tiered_search(&target("i1", "b1"), &candidates) {
            Search::Ambiguous(Tier::Body, hits) => assert_eq!(hits.len(), 2),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_interface_tier_is_last_resort() {
        let a = construct("Foo.a", "i1", "b2");
        let b = construct("Foo.b", "i9", "b9");
        let candidates = vec![&a, &b];

        match tiered_search(&target("i1", "b1"), &candidates) {
            Search::Unique(tier, hit) => {
                assert_eq!(tier, Tier::Interface);
                assert_eq!(tier.confidence(), Confidence::Low);
                assert_eq!(hit.qualname, "Foo.a");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(tiered_search(&target("x", "y"), &candidates), Search::NotFound));
    }

    #[test]
    fn test_classify() {
        let t = target("i1", "b1");
        assert_eq!(classify(&t, &construct("x", "i1", "b1")), None);
        assert_eq!(
            classify(&t, &construct("x", "i1", "b2")).map(|(ct, _)| ct),
            Some(ChangeType::Content)
        );
        let (ct, reasons) = classify(&t, &construct("x", "i2", "b2")).unwrap();
        assert_eq!(ct, ChangeType::Structural);
        assert_eq!(reasons, vec!["interface_changed", "body_changed"]);
    }
}
