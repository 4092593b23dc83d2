//! Route patterns: literal paths and delimited regular expressions.
//!
//! A pattern is *delimited* when it reads `<d>body<d>flags`, where `<d>` is a
//! character that is neither alphanumeric, whitespace nor a backslash and the
//! flags are drawn from `imsxUuDA`. Bracket delimiters pair up (`(...)`,
//! `[...]`, `{...}`, `<...>`). Everything else is matched literally only.
//!
//! ```text
//! /page                  literal
//! /^\/page\/([0-9]+)$/   regex, one capture group
//! #^/Admin/#i            regex, case-insensitive
//! ```

use crate::error::{RouterError, RouterResult};
use regex::Regex;
use smallvec::SmallVec;
use std::fmt;

/// Capture groups kept inline before spilling to the heap.
pub const MAX_INLINE_CAPTURES: usize = 8;

/// Capture groups of a successful pattern match; index 0 is the full match.
/// Groups that did not participate are `None`.
pub type CaptureVec = SmallVec<[Option<String>; MAX_INLINE_CAPTURES]>;

const PATTERN_FLAGS: &str = "imsxUuDA";

/// A registered route key with its compiled regex, if it has one.
#[derive(Clone)]
pub struct RoutePattern {
    raw: String,
    regex: Option<Regex>,
}

impl fmt::Debug for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutePattern")
            .field("raw", &self.raw)
            .field("regex", &self.regex.as_ref().map(Regex::as_str))
            .finish()
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl RoutePattern {
    /// Parse a route key. Delimited keys are compiled; a delimited key whose
    /// body is not a valid regex is an error.
    pub fn parse(raw: &str) -> RouterResult<Self> {
        let regex = match split_delimited(raw) {
            Some((body, flags)) => Some(compile(raw, body, flags)?),
            None => None,
        };
        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    /// The key as registered.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn is_regex(&self) -> bool {
        self.regex.is_some()
    }

    /// Regex captures for `path`, or `None` for literal keys and non-matches.
    #[must_use]
    pub fn captures(&self, path: &str) -> Option<CaptureVec> {
        let caps = self.regex.as_ref()?.captures(path)?;
        Some(
            caps.iter()
                .map(|group| group.map(|m| m.as_str().to_string()))
                .collect(),
        )
    }
}

/// Split `<d>body<d>flags`, or `None` when `raw` is not delimited.
fn split_delimited(raw: &str) -> Option<(&str, &str)> {
    let open = raw.chars().next()?;
    if open.is_alphanumeric() || open.is_whitespace() || open == '\\' {
        return None;
    }
    let close = match open {
        '(' => ')',
        '[' => ']',
        '{' => '}',
        '<' => '>',
        other => other,
    };
    let rest = &raw[open.len_utf8()..];
    let end = closing_delimiter(rest, close)?;
    let body = &rest[..end];
    let flags = &rest[end + close.len_utf8()..];
    if flags.chars().all(|c| PATTERN_FLAGS.contains(c)) {
        Some((body, flags))
    } else {
        None
    }
}

/// Byte offset of the first `close` in `rest` not escaped by a backslash.
fn closing_delimiter(rest: &str, close: char) -> Option<usize> {
    let mut escaped = false;
    for (idx, c) in rest.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == close {
            return Some(idx);
        }
    }
    None
}

fn compile(raw: &str, body: &str, flags: &str) -> RouterResult<Regex> {
    // `u` and `D` describe the default behaviour of the regex engine.
    let inline: String = flags
        .chars()
        .filter(|c| matches!(c, 'i' | 'm' | 's' | 'x' | 'U'))
        .collect();
    let mut source = String::with_capacity(body.len() + inline.len() + 8);
    if !inline.is_empty() {
        source.push_str("(?");
        source.push_str(&inline);
        source.push(')');
    }
    if flags.contains('A') {
        source.push_str(r"\A(?:");
        source.push_str(body);
        source.push(')');
    } else {
        source.push_str(body);
    }
    Regex::new(&source).map_err(|source| RouterError::Pattern {
        pattern: raw.to_string(),
        source,
    })
}
