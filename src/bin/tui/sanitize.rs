//! Response sanitizer
//!
//! Raw model output may wrap internal reasoning in `<think>`/`</think>`
//! markers. They are stripped before display; the persisted record keeps
//! the raw text.

use regex::Regex;
use std::sync::OnceLock;

fn think_markers() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?think>").expect("static pattern"))
}

/// Strip every reasoning delimiter token and trim surrounding whitespace.
///
/// Tokens are removed regardless of pairing or nesting — no attempt to
/// balance them. Removal runs to a fixpoint so that token fragments joined
/// by a removal are also stripped, which makes the function idempotent.
pub fn sanitize(raw: &str) -> String {
    let re = think_markers();
    let mut text = raw.to_string();
    while re.is_match(&text) {
        text = re.replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}
