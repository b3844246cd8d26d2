use crate::types::{DiffParse, FileDiff, Hunk, SkippedBlock};
use once_cell::sync::Lazy;
use regex::Regex;

static HUNK_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^@@ -(\d+)(?:,(\d+))? \+(\d+)(?:,(\d+))? @@").expect("valid hunk header regex")
});

const GIT_HEADER: &str = "diff --git ";
const DEV_NULL: &str = "/dev/null";

/// Parse `git diff -U0` style output into per-file hunks.
///
/// Never fails as a whole: a file block that cannot be understood is recorded in
/// [`DiffParse::skipped`] and the rest of the diff is still returned.
#[must_use]
pub fn parse_unified_diff(text: &str) -> DiffParse {
    let mut parse = DiffParse::default();
    let (orphans, blocks) = split_blocks(text);

    if !orphans.is_empty() {
        parse.skipped.extend(orphan_blocks(&orphans));
    }

    for block in blocks {
        match parse_block(&block) {
            Ok(file) => parse.files.push(file),
            Err(reason) => {
                log::warn!("Skipping unparseable diff block: {reason}");
                let (old_path, new_path) = block
                    .first()
                    .and_then(|header| parse_git_header(header))
                    .map_or((None, None), |(old, new)| (Some(old), Some(new)));
                parse.skipped.push(SkippedBlock {
                    raw: block.join("\n"),
                    reason,
                    old_path,
                    new_path,
                });
            }
        }
    }

    parse
}

/// Split the diff into blocks, each starting at a `diff --git` line.
///
/// Non-blank lines before the first block are returned separately.
fn split_blocks(text: &str) -> (Vec<&str>, Vec<Vec<&str>>) {
    let mut orphans = Vec::new();
    let mut blocks: Vec<Vec<&str>> = Vec::new();
    for line in text.lines() {
        if line.starts_with(GIT_HEADER) {
            blocks.push(vec![line]);
        } else if let Some(current) = blocks.last_mut() {
            current.push(line);
        } else if !line.trim().is_empty() {
            orphans.push(line);
        }
    }
    (orphans, blocks)
}

/// Record content outside any `diff --git` block (plain `diff -u` output, stray text).
///
/// Each `---`/`+++` pair starts a new record so the affected paths stay visible.
fn orphan_blocks(lines: &[&str]) -> Vec<SkippedBlock> {
    const REASON: &str = "no `diff --git` header";

    let mut out: Vec<SkippedBlock> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    let mut paths: (Option<String>, Option<String>) = (None, None);

    for (idx, line) in lines.iter().enumerate() {
        let next_is_new_side = lines.get(idx + 1).is_some_and(|l| l.starts_with("+++ "));
        if let Some(old) = line.strip_prefix("--- ").filter(|_| next_is_new_side) {
            if current.iter().any(|l| l.starts_with("@@")) {
                out.push(orphan(&current, REASON, paths));
                current = Vec::new();
            }
            paths = (plain_path(old, "a/"), None);
        } else if let Some(new) = line.strip_prefix("+++ ") {
            if paths.1.is_none() {
                paths.1 = plain_path(new, "b/");
            }
        }
        current.push(line);
    }
    if !current.is_empty() {
        out.push(orphan(&current, REASON, paths));
    }

    for block in &out {
        log::warn!(
            "Ignoring diff text outside a `diff --git` block ({})",
            block
                .new_path
                .as_deref()
                .or(block.old_path.as_deref())
                .unwrap_or("unknown file")
        );
    }
    out
}

fn orphan(lines: &[&str], reason: &str, paths: (Option<String>, Option<String>)) -> SkippedBlock {
    SkippedBlock {
        raw: lines.join("\n"),
        reason: reason.to_string(),
        old_path: paths.0,
        new_path: paths.1,
    }
}

/// Path of a plain `---`/`+++` line, without timestamp or side prefix
fn plain_path(rest: &str, prefix: &str) -> Option<String> {
    let raw = rest.split('\t').next().unwrap_or(rest);
    let path = unquote(raw);
    (path != DEV_NULL && !path.is_empty()).then(|| strip_side_prefix(&path, prefix))
}

fn parse_block(lines: &[&str]) -> Result<FileDiff, String> {
    let header = lines.first().ok_or_else(|| "empty block".to_string())?;
    let (mut old_path, mut new_path) = parse_git_header(header).unwrap_or_default();

    let mut file = FileDiff::default();
    let mut in_hunks = false;

    for line in &lines[1..] {
        if line.starts_with("@@") {
            in_hunks = true;
            file.hunks.push(parse_hunk_header(line)?);
            continue;
        }
        if in_hunks {
            // Hunk body lines carry no information the model needs
            continue;
        }

        if line.starts_with("new file mode") {
            file.is_new_file = true;
        } else if line.starts_with("deleted file mode") {
            file.is_deleted_file = true;
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            old_path = unquote(rest);
            file.is_rename = true;
        } else if let Some(rest) = line.strip_prefix("rename to ") {
            new_path = unquote(rest);
            file.is_rename = true;
        } else if line.starts_with("Binary files ") || line.starts_with("GIT binary patch") {
            file.is_binary = true;
        } else if let Some(rest) = line.strip_prefix("--- ") {
            let path = unquote(rest);
            if path == DEV_NULL {
                file.is_new_file = true;
            } else {
                old_path = strip_side_prefix(&path, "a/");
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            let path = unquote(rest);
            if path == DEV_NULL {
                file.is_deleted_file = true;
            } else {
                new_path = strip_side_prefix(&path, "b/");
            }
        }
    }

    if old_path.is_empty() && new_path.is_empty() {
        return Err(format!("no file paths in block starting with {header:?}"));
    }
    if old_path.is_empty() {
        old_path = new_path.clone();
    }
    if new_path.is_empty() {
        new_path = old_path.clone();
    }

    file.old_path = old_path;
    file.new_path = new_path;
    file.hunks.sort_by_key(|h| (h.old_start, h.new_start));
    Ok(file)
}

fn parse_hunk_header(line: &str) -> Result<Hunk, String> {
    let caps = HUNK_HEADER
        .captures(line)
        .ok_or_else(|| format!("malformed hunk header: {line:?}"))?;

    let number = |idx: usize, default: usize| -> Result<usize, String> {
        match caps.get(idx) {
            Some(m) => m
                .as_str()
                .parse::<usize>()
                .map_err(|e| format!("bad number in hunk header {line:?}: {e}")),
            None => Ok(default),
        }
    };

    Ok(Hunk {
        old_start: number(1, 0)?,
        old_count: number(2, 1)?,
        new_start: number(3, 0)?,
        new_count: number(4, 1)?,
    })
}

/// Extract `(old, new)` from `diff --git a/OLD b/NEW`.
///
/// Unquoted headers are ambiguous when paths contain `" b/"`; the split where both sides
/// agree wins, otherwise the first candidate. Rename and `---`/`+++` lines override this.
fn parse_git_header(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix(GIT_HEADER)?.trim_end();

    if rest.starts_with('"') {
        let (old, tail) = split_quoted(rest)?;
        let tail = tail.trim_start();
        let new = if tail.starts_with('"') {
            split_quoted(tail)?.0
        } else {
            tail.to_string()
        };
        return Some((strip_side_prefix(&old, "a/"), strip_side_prefix(&new, "b/")));
    }

    let body = rest.strip_prefix("a/")?;
    let candidates: Vec<usize> = body.match_indices(" b/").map(|(idx, _)| idx).collect();
    let split = candidates
        .iter()
        .copied()
        .find(|&idx| body[..idx] == body[idx + 3..])
        .or_else(|| candidates.first().copied())?;

    Some((body[..split].to_string(), body[split + 3..].to_string()))
}

/// Split a leading C-quoted string off `text`, returning the unquoted value and the rest.
fn split_quoted(text: &str) -> Option<(String, &str)> {
    let inner = text.strip_prefix('"')?;
    let mut escaped = false;
    for (idx, ch) in inner.char_indices() {
        if escaped {
            escaped = false;
        } else if ch == '\\' {
            escaped = true;
        } else if ch == '"' {
            return Some((unescape(&inner[..idx]), &inner[idx + 1..]));
        }
    }
    None
}

/// Undo git's path quoting (`"a/with space.py"`, `\t`, `\"`, octal bytes).
pub(crate) fn unquote(raw: &str) -> String {
    let raw = raw.trim_end_matches(['\t', '\r']);
    match split_quoted(raw) {
        Some((value, _)) => value,
        None => raw.to_string(),
    }
}

fn unescape(text: &str) -> String {
    let mut bytes = Vec::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some('"') => bytes.push(b'"'),
            Some('\\') => bytes.push(b'\\'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                bytes.push(b'\\');
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }
    String::from_utf8_lossy(&bytes).into_owned()
}

fn strip_side_prefix(path: &str, prefix: &str) -> String {
    path.strip_prefix(prefix).unwrap_or(path).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MODIFY: &str = "\
diff --git a/src/app.py b/src/app.py
index 83db48f..bf269f4 100644
--- a/src/app.py
+++ b/src/app.py
@@ -3,0 +4,2 @@ import os
+import sys
+import re
@@ -1 +1 @@
-x = 1
+x = 2
";

    #[test]
    fn test_parse_modify_block() {
        let parse = parse_unified_diff(MODIFY);
        assert!(parse.skipped.is_empty());
        assert_eq!(parse.files.len(), 1);

        let file = &parse.files[0];
        assert_eq!(file.old_path, "src/app.py");
        assert_eq!(file.new_path, "src/app.py");
        assert!(!file.is_rename && !file.is_new_file && !file.is_deleted_file);
        // sorted by old_start even though the diff listed them out of order
        assert_eq!(file.hunks, vec![Hunk::new(1, 1, 1, 1), Hunk::new(3, 0, 4, 2)]);
    }

    #[test]
    fn test_parse_new_deleted_and_binary() {
        let diff = "\
diff --git a/new.py b/new.py
new file mode 100644
index 0000000..e69de29
--- /dev/null
+++ b/new.py
@@ -0,0 +1,2 @@
+a = 1
+b = 2
diff --git a/gone.py b/gone.py
deleted file mode 100644
index e69de29..0000000
--- a/gone.py
+++ /dev/null
@@ -1,3 +0,0 @@
-a
-b
-c
diff --git a/logo.png b/logo.png
index 1111111..2222222 100644
Binary files a/logo.png and b/logo.png differ
";
        let parse = parse_unified_diff(diff);
        assert_eq!(parse.files.len(), 3);

        assert!(parse.files[0].is_new_file);
        assert_eq!(parse.files[0].old_path, "new.py");
        assert_eq!(parse.files[0].hunks, vec![Hunk::new(0, 0, 1, 2)]);

        assert!(parse.files[1].is_deleted_file);
        assert_eq!(parse.files[1].effective_path(), "gone.py");
        assert_eq!(parse.files[1].hunks, vec![Hunk::new(1, 3, 0, 0)]);

        assert!(parse.files[2].is_binary);
        assert!(parse.files[2].hunks.is_empty());
    }

    #[test]
    fn test_parse_rename_preamble() {
        let diff = "\
diff --git a/old/name.py b/new/name.py
similarity index 95%
rename from old/name.py
rename to new/name.py
index 1..2 100644
--- a/old/name.py
+++ b/new/name.py
@@ -10,2 +10,3 @@ def f():
";
        let parse = parse_unified_diff(diff);
        let file = parse.file_for_old_path("old/name.py").expect("renamed file");
        assert!(file.is_rename);
        assert_eq!(file.new_path, "new/name.py");
        assert_eq!(file.hunks, vec![Hunk::new(10, 2, 10, 3)]);
        assert!(parse.file_for_new_path("new/name.py").is_some());
    }

    #[test]
    fn test_malformed_block_is_skipped_not_fatal() {
        let diff = "\
diff --git a/bad.py b/bad.py
--- a/bad.py
+++ b/bad.py
@@ -x,1 +1 @@
diff --git a/good.py b/good.py
--- a/good.py
+++ b/good.py
@@ -5,2 +5,0 @@
";
        let parse = parse_unified_diff(diff);
        assert_eq!(parse.files.len(), 1);
        assert_eq!(parse.files[0].old_path, "good.py");
        assert_eq!(parse.skipped.len(), 1);
        assert!(parse.skipped[0].raw.contains("@@ -x,1 +1 @@"));
        assert!(parse.skipped[0].reason.contains("malformed hunk header"));
        assert_eq!(parse.skipped[0].old_path.as_deref(), Some("bad.py"));
        assert!(parse.skipped_for_path("bad.py").is_some());
        assert!(parse.skipped_for_path("good.py").is_none());
    }

    #[test]
    fn test_plain_unified_diff_is_recorded_as_skipped() {
        let diff = "\
--- a/app.py\t2024-01-01 10:00:00
+++ b/app.py\t2024-01-02 10:00:00
@@ -3 +3 @@
-x = 1
+x = 2
--- lib.py
+++ lib.py
@@ -1,0 +2 @@
+import os
";
        let parse = parse_unified_diff(diff);
        assert!(parse.files.is_empty());
        assert_eq!(parse.skipped.len(), 2);
        assert_eq!(parse.skipped[0].old_path.as_deref(), Some("app.py"));
        assert_eq!(parse.skipped[0].new_path.as_deref(), Some("app.py"));
        assert!(parse.skipped[0].raw.contains("@@ -3 +3 @@"));
        assert_eq!(parse.skipped[1].new_path.as_deref(), Some("lib.py"));
        assert!(parse.skipped_for_path("lib.py").is_some());
    }

    #[test]
    fn test_stray_text_before_first_block() {
        let parse = parse_unified_diff("warning: LF will be replaced\ndiff --git a/a.py b/a.py\n@@ -1 +1 @@\n");
        assert_eq!(parse.files.len(), 1);
        assert_eq!(parse.skipped.len(), 1);
        assert_eq!(parse.skipped[0].old_path, None);
    }

    #[test]
    fn test_removed_line_resembling_header_is_ignored() {
        let diff = "\
diff --git a/q.sql b/q.sql
--- a/q.sql
+++ b/q.sql
@@ -2 +1,0 @@
--- a comment
";
        let parse = parse_unified_diff(diff);
        assert_eq!(parse.files[0].old_path, "q.sql");
        assert_eq!(parse.files[0].hunks.len(), 1);
    }

    #[test]
    fn test_quoted_paths() {
        let diff = "\
diff --git \"a/dir/with space.py\" \"b/dir/with space.py\"
--- \"a/dir/with space.py\"
+++ \"b/dir/with space.py\"
@@ -1 +1 @@
";
        let parse = parse_unified_diff(diff);
        assert_eq!(parse.files[0].old_path, "dir/with space.py");
        assert_eq!(parse.files[0].new_path, "dir/with space.py");
    }

    #[test]
    fn test_header_split_prefers_symmetric_paths() {
        let (old, new) = parse_git_header("diff --git a/x b/y.py b/x b/y.py").expect("header");
        assert_eq!(old, "x b/y.py");
        assert_eq!(new, "x b/y.py");
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote("\"tab\\there\""), "tab\there");
        assert_eq!(unquote("\"caf\\303\\251.py\""), "café.py");
        assert_eq!(unquote("plain.py"), "plain.py");
    }

    #[test]
    fn test_hunk_header_defaults() {
        assert_eq!(parse_hunk_header("@@ -7 +8 @@").unwrap(), Hunk::new(7, 1, 8, 1));
        assert_eq!(
            parse_hunk_header("@@ -7,0 +8,3 @@ fn x()").unwrap(),
            Hunk::new(7, 0, 8, 3)
        );
        assert!(parse_hunk_header("@@ garbage @@").is_err());
    }
}
