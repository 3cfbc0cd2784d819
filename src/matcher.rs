//! Boolean-composable predicates over `(path, depth)`.
//!
//! Mirrors the `Matcher` wrapper in the upstream Python bindings, which
//! overloads `~`/`|`/`&` onto a native matcher object
//! (`streamson.matcher.Matcher.__invert__`/`__or__`/`__and__`). Rust has
//! no `~`/`|`/`&` for arbitrary wrapping this cheaply without operator
//! traits, so `Matcher` implements [`std::ops::Not`], [`std::ops::BitOr`]
//! and [`std::ops::BitAnd`] directly and gets the same `!m`, `a | b`,
//! `a & b` ergonomics.

use crate::error::{Result, StreamsonError};
use crate::path::{Path, PathElement};
use regex::Regex;
use std::ops::{BitAnd, BitOr, Not};
use std::sync::Arc;

/// One segment of a [`Matcher::Simple`] pattern.
#[derive(Clone, Debug, PartialEq, Eq)]
enum PatternSegment {
    Key(String),
    Index(usize),
    AnyKey,
    AnyIndex,
}

impl PatternSegment {
    fn matches(&self, element: &PathElement) -> bool {
        match (self, element) {
            (PatternSegment::Key(k), PathElement::Key(pk)) => k == pk,
            (PatternSegment::Index(i), PathElement::Index(pi)) => i == pi,
            (PatternSegment::AnyKey, PathElement::Key(_)) => true,
            (PatternSegment::AnyIndex, PathElement::Index(_)) => true,
            _ => false,
        }
    }
}

/// A stateless predicate over `(path, depth)`. Cheap to clone: the
/// compiled forms (`Regex`, the parsed `Simple` segment list) live behind
/// an `Arc` so composing matchers with `|`/`&`/`!` never recompiles a
/// pattern.
#[derive(Clone, Debug)]
pub enum Matcher {
    Simple(Arc<Vec<PatternSegment>>),
    Depth(usize, Option<usize>),
    Regex(Arc<Regex>),
    All,
    Not(Arc<Matcher>),
    And(Arc<Matcher>, Arc<Matcher>),
    Or(Arc<Matcher>, Arc<Matcher>),
}

impl Matcher {
    pub fn all() -> Self {
        Matcher::All
    }

    /// Parse a Simple-matcher path pattern (spec.md §6): segments of
    /// `{"key"}`, `[index]`, `{}` (any key), or `[]` (any index); the
    /// empty string matches only the root.
    pub fn parse_simple(pattern: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let bytes = pattern.as_bytes();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'{' => {
                    let close = find_unescaped(bytes, i, b'}').ok_or_else(|| {
                        StreamsonError::matcher_parse(pattern, "unterminated '{' segment")
                    })?;
                    let inner = &pattern[i + 1..close];
                    if inner.is_empty() {
                        segments.push(PatternSegment::AnyKey);
                    } else {
                        let key = parse_quoted_key(inner).ok_or_else(|| {
                            StreamsonError::matcher_parse(
                                pattern,
                                format!("expected a quoted key, found {inner:?}"),
                            )
                        })?;
                        segments.push(PatternSegment::Key(key));
                    }
                    i = close + 1;
                }
                b'[' => {
                    let close = find_unescaped(bytes, i, b']').ok_or_else(|| {
                        StreamsonError::matcher_parse(pattern, "unterminated '[' segment")
                    })?;
                    let inner = &pattern[i + 1..close];
                    if inner.is_empty() {
                        segments.push(PatternSegment::AnyIndex);
                    } else {
                        let idx: usize = inner.parse().map_err(|_| {
                            StreamsonError::matcher_parse(
                                pattern,
                                format!("expected a decimal index, found {inner:?}"),
                            )
                        })?;
                        segments.push(PatternSegment::Index(idx));
                    }
                    i = close + 1;
                }
                _ => {
                    return Err(StreamsonError::matcher_parse(
                        pattern,
                        format!("unexpected character '{}' at byte {i}", bytes[i] as char),
                    ));
                }
            }
        }
        Ok(Matcher::Simple(Arc::new(segments)))
    }

    /// Parse a Depth-matcher textual form: `"N"` or `"N-M"`.
    pub fn parse_depth(spec: &str) -> Result<Self> {
        if let Some((lo, hi)) = spec.split_once('-') {
            let lo: usize = lo
                .parse()
                .map_err(|_| StreamsonError::matcher_parse(spec, "invalid depth lower bound"))?;
            let hi: usize = hi
                .parse()
                .map_err(|_| StreamsonError::matcher_parse(spec, "invalid depth upper bound"))?;
            if hi < lo {
                return Err(StreamsonError::matcher_parse(
                    spec,
                    "upper bound must be >= lower bound",
                ));
            }
            Ok(Matcher::Depth(lo, Some(hi)))
        } else {
            let n: usize = spec
                .parse()
                .map_err(|_| StreamsonError::matcher_parse(spec, "invalid depth value"))?;
            Ok(Matcher::Depth(n, Some(n)))
        }
    }

    pub fn regex(pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern).map_err(|source| StreamsonError::InvalidRegex {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Matcher::Regex(Arc::new(re)))
    }

    /// Evaluate the predicate against a path captured at `Start`.
    pub fn matches(&self, path: &Path) -> bool {
        match self {
            Matcher::Simple(segments) => {
                if segments.len() != path.depth() {
                    return false;
                }
                segments
                    .iter()
                    .zip(path.elements())
                    .all(|(seg, el)| seg.matches(el))
            }
            Matcher::Depth(min, max) => {
                let depth = path.depth();
                depth >= *min && max.map(|m| depth <= m).unwrap_or(true)
            }
            Matcher::Regex(re) => re.is_match(&path.serialize()),
            Matcher::All => true,
            Matcher::Not(m) => !m.matches(path),
            Matcher::And(a, b) => a.matches(path) && b.matches(path),
            Matcher::Or(a, b) => a.matches(path) || b.matches(path),
        }
    }
}

fn find_unescaped(bytes: &[u8], start: usize, target: u8) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            i += 2;
            continue;
        }
        if bytes[i] == target {
            return Some(i);
        }
        i += 1;
    }
    None
}

fn parse_quoted_key(inner: &str) -> Option<String> {
    let bytes = inner.as_bytes();
    if bytes.len() < 2 || bytes[0] != b'"' || bytes[bytes.len() - 1] != b'"' {
        return None;
    }
    Some(inner[1..inner.len() - 1].to_string())
}

impl Not for Matcher {
    type Output = Matcher;
    fn not(self) -> Matcher {
        Matcher::Not(Arc::new(self))
    }
}

impl BitOr for Matcher {
    type Output = Matcher;
    fn bitor(self, rhs: Matcher) -> Matcher {
        Matcher::Or(Arc::new(self), Arc::new(rhs))
    }
}

impl BitAnd for Matcher {
    type Output = Matcher;
    fn bitand(self, rhs: Matcher) -> Matcher {
        Matcher::And(Arc::new(self), Arc::new(rhs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_from(segments: &[PathElement]) -> Path {
        let mut p = Path::new();
        for s in segments {
            match s {
                PathElement::Key(k) => p.push_key(k.clone()),
                PathElement::Index(i) => p.push_index(*i),
            }
        }
        p
    }

    // Scenarios below reproduce test_extract.py's matcher-algebra cases
    // against the same document: {"users": ["john","carl","bob"]}.

    #[test]
    fn simple_matches_exact_path() {
        let m = Matcher::parse_simple("{\"users\"}[1]").unwrap();
        let p = path_from(&[PathElement::Key("users".into()), PathElement::Index(1)]);
        assert!(m.matches(&p));
        let other = path_from(&[PathElement::Key("users".into()), PathElement::Index(2)]);
        assert!(!m.matches(&other));
    }

    #[test]
    fn simple_wildcard_any_index() {
        let m = Matcher::parse_simple("{\"users\"}[]").unwrap();
        for i in 0..3 {
            let p = path_from(&[PathElement::Key("users".into()), PathElement::Index(i)]);
            assert!(m.matches(&p));
        }
    }

    #[test]
    fn depth_range() {
        let m = Matcher::parse_depth("0-1").unwrap();
        assert!(m.matches(&Path::new()));
        assert!(m.matches(&path_from(&[PathElement::Key("users".into())])));
        assert!(!m.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(0)
        ])));
    }

    #[test]
    fn invert_all_matches_nothing() {
        let m = !Matcher::All;
        assert!(!m.matches(&Path::new()));
    }

    #[test]
    fn any_combines_with_or() {
        let a = Matcher::parse_simple("{\"users\"}[0]").unwrap();
        let b = Matcher::parse_simple("{\"users\"}[2]").unwrap();
        let combined = a | b;
        assert!(combined.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(0)
        ])));
        assert!(!combined.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(1)
        ])));
    }

    #[test]
    fn all_combines_with_and() {
        let depth = Matcher::parse_depth("2").unwrap();
        let under_users = Matcher::parse_simple("{\"users\"}[]").unwrap();
        let combined = depth & under_users;
        assert!(combined.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(0)
        ])));
    }

    #[test]
    fn complex_combinator_expression() {
        let m = (Matcher::parse_simple("{\"users\"}[0]").unwrap()
            | Matcher::parse_simple("{\"users\"}[2]").unwrap())
            & !Matcher::parse_simple("{\"users\"}[2]").unwrap();
        assert!(m.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(0)
        ])));
        assert!(!m.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(2)
        ])));
    }

    #[test]
    fn algebra_laws() {
        let m = Matcher::parse_depth("1").unwrap();
        let p = path_from(&[PathElement::Key("a".into())]);
        assert_eq!((!(!m.clone())).matches(&p), m.matches(&p));
        assert_eq!(
            (Matcher::All.clone() & m.clone()).matches(&p),
            m.matches(&p)
        );
        assert!((Matcher::All | m).matches(&p));
    }

    #[test]
    fn regex_matches_serialized_path() {
        let m = Matcher::regex("^\\{\"users\"\\}\\[\\d+\\]$").unwrap();
        assert!(m.matches(&path_from(&[
            PathElement::Key("users".into()),
            PathElement::Index(0)
        ])));
    }
}
