use codesub_detector::{Detector, InMemoryProvider, ScanConfig, ScanRequest, Subscription};
use proptest::prelude::*;
use std::fmt::Write as _;

const PATHS: [&str; 2] = ["a.py", "b.py"];

/// `(gap, old_count, new_count)` steps laid out left to right so hunks never overlap
fn hunk_steps() -> impl Strategy<Value = Vec<(usize, usize, usize)>> {
    prop::collection::vec((0usize..15, 0usize..4, 0usize..4), 0..6)
}

fn file_diff(path: &str, steps: &[(usize, usize, usize)]) -> String {
    let mut text = format!("diff --git a/{path} b/{path}\n--- a/{path}\n+++ b/{path}\n");
    let mut cursor = 0usize;
    let mut delta = 0i64;
    for &(gap, old_count, new_count) in steps {
        let old_start = cursor + gap + 1;
        let new_start = (old_start as i64 + delta).max(0);
        let _ = writeln!(text, "@@ -{old_start},{old_count} +{new_start},{new_count} @@");
        for _ in 0..old_count {
            text.push_str("-old\n");
        }
        for _ in 0..new_count {
            text.push_str("+new\n");
        }
        cursor = old_start + old_count;
        delta += new_count as i64 - old_count as i64;
    }
    text
}

fn line_subscriptions() -> impl Strategy<Value = Vec<Subscription>> {
    prop::collection::vec((0usize..3, 1usize..120, 0usize..10), 1..8).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (file, start, len))| {
                // index 2 is a path the diff never mentions
                let path = PATHS.get(file).copied().unwrap_or("c.py");
                Subscription::line(format!("sub-{i}"), path, start, start + len)
            })
            .collect()
    })
}

fn scan(config: ScanConfig, diff: &str, subs: &[Subscription]) -> codesub_detector::ScanResult {
    let detector = Detector::new(config).expect("config");
    let request = ScanRequest::new("main", diff, "M\ta.py\nM\tb.py\n");
    detector
        .scan(&request, subs, &InMemoryProvider::new())
        .expect("scan")
}

proptest! {
    #[test]
    fn line_scans_are_repeatable_and_order_independent(
        subs in line_subscriptions(),
        first in hunk_steps(),
        second in hunk_steps(),
    ) {
        let diff = format!("{}{}", file_diff(PATHS[0], &first), file_diff(PATHS[1], &second));

        let once = scan(ScanConfig::default(), &diff, &subs);
        let again = scan(ScanConfig::default(), &diff, &subs);
        let sequential = scan(ScanConfig::sequential(), &diff, &subs);
        prop_assert_eq!(&once, &again);
        prop_assert_eq!(&once, &sequential);

        for sub in &subs {
            let trigger = once.trigger_for(&sub.id);
            let proposal = once.proposal_for(&sub.id);
            prop_assert!(trigger.is_none() || proposal.is_none(), "{} has both", sub.id);
            if sub.path == "c.py" {
                prop_assert!(trigger.is_none() && proposal.is_none());
            }
            if let Some(proposal) = proposal {
                let shift = proposal.shift.unwrap_or_default();
                prop_assert_eq!(proposal.new_start as i64 - sub.start_line as i64, shift);
                prop_assert_eq!(proposal.new_end as i64 - sub.end_line as i64, shift);
            }
        }
    }
}
