use crate::context::{Evaluation, ScanContext};
use crate::result::{ChangeType, Confidence, Proposal, Trigger};
use crate::subscription::Subscription;
use codesub_diff::{compute_shift, ShiftOutcome, ShiftTrigger};
use serde_json::json;

/// Evaluate a line-range subscription against the diff's hunks
pub(crate) fn evaluate_lines(sub: &Subscription, ctx: &ScanContext<'_>) -> Evaluation {
    let file_diff = ctx.file_diff(&sub.path);
    let deleted = ctx.is_deleted(&sub.path);
    let new_path = ctx.resolve(&sub.path);

    if !deleted && file_diff.is_some_and(|f| f.is_binary) {
        log::debug!("{}: binary change in {}", sub.id, sub.path);
        return Evaluation::triggered(Trigger::for_subscription(
            sub,
            ChangeType::Content,
            vec!["binary_changed".to_string()],
        ));
    }

    if !deleted {
        if let Some(block) = ctx.unparsed_block(&sub.path) {
            log::debug!("{}: diff for {} unparseable: {}", sub.id, sub.path, block.reason);
            return Evaluation::triggered(
                Trigger::for_subscription(
                    sub,
                    ChangeType::ParseError,
                    vec!["diff_unparseable".to_string()],
                )
                .with_details(json!({ "cause": block.reason })),
            );
        }
    }

    let hunks = file_diff.map_or(&[][..], |f| f.hunks.as_slice());
    match compute_shift(sub.start_line, sub.end_line, hunks, deleted) {
        ShiftOutcome::Triggered(reasons) => {
            let change_type = if reasons.contains(&ShiftTrigger::FileDeleted) {
                ChangeType::Missing
            } else {
                ChangeType::Content
            };
            log::debug!("{}: {} {:?}", sub.id, change_type.as_str(), reasons);
            Evaluation::triggered(Trigger::for_subscription(
                sub,
                change_type,
                reasons.iter().map(|r| r.as_str().to_string()).collect(),
            ))
        }
        ShiftOutcome::Shifted {
            shift,
            new_start,
            new_end,
        } => {
            let renamed = new_path != sub.path;
            if shift == 0 && !renamed {
                return Evaluation::unchanged();
            }

            let mut reasons = Vec::new();
            if renamed {
                reasons.push("rename".to_string());
            }
            if shift != 0 {
                reasons.push("line_shift".to_string());
            }

            let mut proposal =
                Proposal::relocate(sub, new_path, new_start, new_end, reasons, Confidence::High);
            proposal.shift = Some(shift);
            Evaluation {
                trigger: None,
                proposal: Some(proposal),
            }
        }
    }
}
