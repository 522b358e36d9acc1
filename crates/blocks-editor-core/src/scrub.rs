//! Corrupt token scrubbing.
//!
//! The clipboard bug injects runs of the word "drag" into copied and pasted
//! text. Every stage of the pipeline uses the same rule: a case-insensitive
//! maximal run of `drag` repeated one or more times. A lone "drag" and "drag"
//! inside a longer word are removed too.
//!
//! Removal repeats until nothing matches, because cutting a run out can join
//! its neighbours into a new one ("drdragag" -> "drag" -> "").

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

/// One maximal run of the corrupt token.
pub static DRAG_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)(?:drag)+").unwrap());

static ONLY_DRAG_RUN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\A(?:drag)+\z").unwrap());

/// Remove every corrupt token from `text`.
///
/// Borrows when there is nothing to remove. Idempotent.
pub fn scrub(text: &str) -> Cow<'_, str> {
    if !DRAG_RUN_RE.is_match(text) {
        return Cow::Borrowed(text);
    }

    let mut current = DRAG_RUN_RE.replace_all(text, "").into_owned();
    while DRAG_RUN_RE.is_match(&current) {
        current = DRAG_RUN_RE.replace_all(&current, "").into_owned();
    }
    Cow::Owned(current)
}

/// Whether `text` contains the corrupt token anywhere.
pub fn contains_token(text: &str) -> bool {
    DRAG_RUN_RE.is_match(text)
}

/// Whether `text`, once trimmed, is nothing but one token run.
pub fn is_only_token(text: &str) -> bool {
    ONLY_DRAG_RUN_RE.is_match(text.trim())
}

/// Scrub the text of an HTML string without parsing it.
///
/// Only the character data between tags is touched; tags, attribute values
/// and comments pass through verbatim. Meant for outgoing copy/cut payloads
/// where a DOM round trip would be too slow.
pub fn scrub_markup(html: &str) -> Cow<'_, str> {
    if !contains_token(html) {
        return Cow::Borrowed(html);
    }

    let mut out = String::with_capacity(html.len());
    let mut rest = html;
    while !rest.is_empty() {
        match rest.find('<') {
            Some(0) => {
                // Unterminated tags run to the end of the input.
                let end = rest.find('>').map_or(rest.len(), |i| i + 1);
                out.push_str(&rest[..end]);
                rest = &rest[end..];
            }
            Some(lt) => {
                out.push_str(&scrub(&rest[..lt]));
                rest = &rest[lt..];
            }
            None => {
                out.push_str(&scrub(rest));
                rest = "";
            }
        }
    }

    if out == html {
        Cow::Borrowed(html)
    } else {
        Cow::Owned(out)
    }
}
