//! Content-derived construct fingerprints.
//!
//! A fingerprint is the pair `(interface_hash, body_hash)`. Neither half includes the
//! construct's name or location, so a renamed or moved construct keeps its fingerprint.

use crate::types::ConstructKind;
use sha2::{Digest, Sha256};
use tree_sitter::Node;

/// Bumped whenever the hashed material changes; stored fingerprints with another
/// version cannot be compared.
pub const FINGERPRINT_VERSION: u32 = 1;

/// Hex characters kept from the SHA-256 digest (64 bits)
pub const HASH_HEX_LEN: usize = 16;

const NO_ANNOTATION: &str = "<no-annotation>";
const NO_PARAMS: &str = "<no-params>";
const NO_VALUE: &str = "<no-value>";

/// SHA-256 over the NUL-joined components, truncated to [`HASH_HEX_LEN`] hex chars
#[must_use]
pub fn hash_components<S: AsRef<str>>(components: &[S]) -> String {
    let mut hasher = Sha256::new();
    for (idx, component) in components.iter().enumerate() {
        if idx > 0 {
            hasher.update([0u8]);
        }
        hasher.update(component.as_ref().as_bytes());
    }
    let digest = hasher.finalize();
    digest
        .iter()
        .take(HASH_HEX_LEN / 2)
        .map(|byte| format!("{byte:02x}"))
        .collect()
}

/// Hash of everything that makes up a construct's outward shape.
///
/// Parameters are taken exactly as written (whitespace-collapsed), so renaming a
/// parameter is an interface change.
#[must_use]
pub fn interface_hash(
    kind: ConstructKind,
    annotation: Option<&str>,
    decorators: &[String],
    params: Option<&str>,
) -> String {
    let mut decorators: Vec<String> = decorators.iter().map(|d| collapse_whitespace(d)).collect();
    decorators.sort();

    let mut components: Vec<String> = Vec::with_capacity(decorators.len() + 5);
    components.push("interface".to_string());
    components.push(kind.as_str().to_string());
    components.push(annotation.map_or_else(|| NO_ANNOTATION.to_string(), collapse_whitespace));
    components.push(format!("decorators:{}", decorators.len()));
    components.extend(decorators);
    components.push(params.map_or_else(|| NO_PARAMS.to_string(), collapse_whitespace));

    hash_components(components.as_slice())
}

/// Hash of the leaf tokens under `node` in document order, comments skipped.
///
/// `None` (no value, e.g. `x: int`) hashes a sentinel so it never equals an empty value.
#[must_use]
pub fn body_hash(node: Option<Node<'_>>, source: &str, comment_kinds: &[&str]) -> String {
    match node {
        None => hash_components(&["body", NO_VALUE]),
        Some(node) => {
            let mut components = vec!["body"];
            components.extend(leaf_tokens(node, source, comment_kinds));
            hash_components(components.as_slice())
        }
    }
}

/// Leaf token texts under `node`, skipping comment subtrees and zero-width MISSING nodes
#[must_use]
pub fn leaf_tokens<'a>(node: Node<'a>, source: &'a str, comment_kinds: &[&str]) -> Vec<&'a str> {
    let mut tokens = Vec::new();
    let mut cursor = node.walk();
    let mut ascending = false;

    loop {
        if !ascending {
            let current = cursor.node();
            if comment_kinds.contains(&current.kind()) {
                // skip the whole comment subtree
            } else if current.child_count() == 0 {
                if !current.is_missing() {
                    if let Some(text) = source.get(current.byte_range()) {
                        if !text.is_empty() {
                            tokens.push(text);
                        }
                    }
                }
            } else if cursor.goto_first_child() {
                continue;
            }
        }

        if cursor.goto_next_sibling() {
            ascending = false;
        } else if cursor.goto_parent() {
            ascending = true;
        } else {
            break;
        }
    }

    tokens
}

/// Collapse every whitespace run to a single space and trim the ends
#[must_use]
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Whether `value` has the shape of a hash produced by this module
#[must_use]
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == HASH_HEX_LEN
        && value
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
}
