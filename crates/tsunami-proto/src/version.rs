//! # Version Expressions
//!
//! Entries of `TargetSoftware.value` are either discrete versions (`1.18.0`,
//! `2:4.3.1-3ubuntu1`) or ranges (`[1.20,1.22)`, `(,2.4.49]`). This module
//! parses both and decides whether a detected version satisfies an entry.
//!
//! ## Version ordering
//!
//! A version string is normalised to carry an epoch (`0:` when none is
//! given), split into segments on `-`, `:`, `_` and `~`, and each segment is
//! split into tokens at `.`, `+` and every digit/non-digit boundary. Tokens
//! are numbers or lowercase text. Segments and tokens are compared
//! pairwise; the shorter list is padded with an empty element, and an empty
//! token sorts below any number, so `2.1 < 2.1.1`.
//!
//! Well-known qualifiers order as
//! `alpha < beta < pre < r < rc < (none) < p < patch < patched`, which puts
//! `1.0rc1` below `1.0` and `1.0p1` above it.
//!
//! Version equality is equality under this ordering, not string equality:
//! `1.0` and `1.0.gg` are the same version.

use std::cmp::Ordering;
use std::fmt;
use std::ops::Bound;

use crate::error::VersionError;

/// Characters whose presence marks an entry as a range expression.
const RANGE_MARKERS: &[char] = &['[', '(', ')', ']', ',', ' '];

/// Raw tokens that carry no ordering information.
const EXCLUDED_TOKENS: &[&str] = &[".", "gg", "N/A"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum KnownQualifier {
    Alpha,
    Beta,
    Pre,
    R,
    Rc,
    Absent,
    P,
    Patch,
    Patched,
}

impl KnownQualifier {
    fn from_text(text: &str) -> Option<Self> {
        let qualifier = match text.to_ascii_lowercase().as_str() {
            "alpha" => Self::Alpha,
            "beta" => Self::Beta,
            "pre" => Self::Pre,
            "r" => Self::R,
            "rc" => Self::Rc,
            "" => Self::Absent,
            "p" => Self::P,
            "patch" => Self::Patch,
            "patched" => Self::Patched,
            _ => return None,
        };
        Some(qualifier)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Numeric(i64),
    Text(String),
}

impl Token {
    const EMPTY: Token = Token::Text(String::new());

    fn parse(raw: &str) -> Self {
        if raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(number) = raw.parse::<i64>() {
                return Self::Numeric(number);
            }
        }
        Self::Text(raw.to_ascii_lowercase())
    }

    fn is_empty(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }

    fn is_significant(&self) -> bool {
        match self {
            Self::Numeric(number) => *number != 0,
            Self::Text(text) => !text.is_empty(),
        }
    }

    fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            _ if self.is_empty() && other.is_empty() => Ordering::Equal,
            (Self::Numeric(a), Self::Numeric(b)) => a.cmp(b),
            (Self::Text(_), Self::Numeric(_)) if self.is_empty() => Ordering::Less,
            (Self::Numeric(_), Self::Text(_)) if other.is_empty() => Ordering::Greater,
            (Self::Text(a), Self::Text(b)) => {
                match (KnownQualifier::from_text(a), KnownQualifier::from_text(b)) {
                    (Some(qa), Some(qb)) => qa.cmp(&qb),
                    _ => a
                        .chars()
                        .flat_map(char::to_lowercase)
                        .cmp(b.chars().flat_map(char::to_lowercase)),
                }
            }
            (Self::Numeric(_), Self::Text(_)) => Ordering::Less,
            (Self::Text(_), Self::Numeric(_)) => Ordering::Greater,
        }
    }
}

/// Tokens of one segment. Always starts with a known qualifier, the
/// implicit "none" qualifier when the segment does not spell one.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Segment(Vec<Token>);

impl Segment {
    /// The padding segment, and what a segment without tokens collapses to.
    fn null() -> Self {
        Segment(vec![Token::EMPTY])
    }

    /// `None` when the segment holds no meaningful token.
    fn parse(raw: &str) -> Option<Self> {
        let raw_tokens: Vec<&str> = split_tokens(raw)
            .into_iter()
            .filter(|token| !token.is_empty() && !EXCLUDED_TOKENS.contains(token))
            .collect();
        let first = raw_tokens.first()?;

        let mut tokens = Vec::with_capacity(raw_tokens.len() + 1);
        if KnownQualifier::from_text(first).is_none() {
            tokens.push(Token::EMPTY);
        }
        tokens.extend(raw_tokens.iter().map(|raw| Token::parse(raw)));
        Some(Segment(tokens))
    }

    fn compare(&self, other: &Self) -> Ordering {
        compare_padded(&self.0, &other.0, &Token::EMPTY, Token::compare)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum CharClass {
    Digit,
    Delimiter,
    Other,
}

fn char_class(c: char) -> CharClass {
    match c {
        '0'..='9' => CharClass::Digit,
        '.' | '+' => CharClass::Delimiter,
        _ => CharClass::Other,
    }
}

/// Split at digit/non-digit boundaries, keeping `.` and `+` as their own
/// tokens.
fn split_tokens(segment: &str) -> Vec<&str> {
    let mut tokens = Vec::new();
    let mut start = 0;
    let mut previous: Option<CharClass> = None;
    for (index, c) in segment.char_indices() {
        let class = char_class(c);
        let boundary = match previous {
            None => false,
            Some(CharClass::Delimiter) => true,
            Some(prev) => class == CharClass::Delimiter || prev != class,
        };
        if boundary {
            tokens.push(&segment[start..index]);
            start = index;
        }
        previous = Some(class);
    }
    if start < segment.len() {
        tokens.push(&segment[start..]);
    }
    tokens
}

fn compare_padded<T>(
    left: &[T],
    right: &[T],
    fill: &T,
    compare: impl Fn(&T, &T) -> Ordering,
) -> Ordering {
    let longest = left.len().max(right.len());
    for index in 0..longest {
        let a = left.get(index).unwrap_or(fill);
        let b = right.get(index).unwrap_or(fill);
        match compare(a, b) {
            Ordering::Equal => continue,
            unequal => return unequal,
        }
    }
    Ordering::Equal
}

/// `\d+[:|_]` at the start of the string.
fn has_epoch(version: &str) -> bool {
    let digits = version.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && matches!(version.as_bytes().get(digits), Some(b':' | b'|' | b'_'))
}

/// A parsed software version.
#[derive(Debug, Clone)]
pub struct Version {
    raw: String,
    segments: Vec<Segment>,
}

impl Version {
    /// Parse a version string.
    ///
    /// # Errors
    ///
    /// Returns `VersionError::Empty` for an empty string and
    /// `VersionError::NoSignificantToken` when no token is a non-zero
    /// number or non-empty text (`0`, `gg`, `...`).
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }
        let normalized = if has_epoch(raw) {
            raw.to_string()
        } else {
            format!("0:{raw}")
        };
        let segments: Vec<Segment> = normalized
            .split(['-', ':', '_', '~'])
            .filter(|segment| !segment.is_empty())
            .filter_map(Segment::parse)
            .collect();

        let significant = segments
            .iter()
            .flat_map(|segment| segment.0.iter())
            .any(Token::is_significant);
        if !significant {
            return Err(VersionError::NoSignificantToken(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// The string this version was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl PartialEq for Version {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Version {}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        compare_padded(
            &self.segments,
            &other.segments,
            &Segment::null(),
            Segment::compare,
        )
    }
}

/// A version interval such as `[1.0,2.0)` or `(,1.5]`.
///
/// An empty side is unbounded. `(,)` is rejected, as is any range whose
/// lower bound is not strictly below its upper bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    raw: String,
    min: Bound<Version>,
    max: Bound<Version>,
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidRange` for a malformed expression, or
    /// the error of an endpoint that is not a valid version.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        if raw.is_empty() {
            return Err(VersionError::Empty);
        }
        let invalid = |reason: &'static str| VersionError::InvalidRange {
            range: raw.to_string(),
            reason,
        };

        let min_inclusive = match raw.chars().next() {
            Some('[') => true,
            Some('(') => false,
            _ => return Err(invalid("must start with '[' or '('")),
        };
        let max_inclusive = match raw.chars().last() {
            Some(']') => true,
            Some(')') => false,
            _ => return Err(invalid("must end with ']' or ')'")),
        };
        if raw.len() < 2 {
            return Err(invalid("missing closing bracket"));
        }

        let inner = &raw[1..raw.len() - 1];
        if inner.contains(['[', '(', ')', ']']) {
            return Err(invalid("brackets are not allowed inside a range"));
        }
        let Some((min, max)) = inner.split_once(',') else {
            return Err(invalid("expected exactly one comma"));
        };
        if max.contains(',') {
            return Err(invalid("expected exactly one comma"));
        }
        let (min, max) = (min.trim(), max.trim());
        if min.is_empty() && max.is_empty() {
            return Err(invalid("a range unbounded on both sides is not supported"));
        }

        let min = bound(min, min_inclusive)?;
        let max = bound(max, max_inclusive)?;
        if let (Some(lo), Some(hi)) = (bound_version(&min), bound_version(&max)) {
            if lo >= hi {
                return Err(invalid("lower bound must be less than upper bound"));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            min,
            max,
        })
    }

    /// Lower bound.
    pub fn min(&self) -> Bound<&Version> {
        self.min.as_ref()
    }

    /// Upper bound.
    pub fn max(&self) -> Bound<&Version> {
        self.max.as_ref()
    }

    /// Returns true if `version` lies inside the range.
    pub fn contains(&self, version: &Version) -> bool {
        let above_min = match &self.min {
            Bound::Included(min) => version >= min,
            Bound::Excluded(min) => version > min,
            Bound::Unbounded => true,
        };
        let below_max = match &self.max {
            Bound::Included(max) => version <= max,
            Bound::Excluded(max) => version < max,
            Bound::Unbounded => true,
        };
        above_min && below_max
    }

    /// The expression this range was parsed from.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn bound(side: &str, inclusive: bool) -> Result<Bound<Version>, VersionError> {
    if side.is_empty() {
        return Ok(Bound::Unbounded);
    }
    let version = Version::parse(side)?;
    Ok(if inclusive {
        Bound::Included(version)
    } else {
        Bound::Excluded(version)
    })
}

fn bound_version(bound: &Bound<Version>) -> Option<&Version> {
    match bound {
        Bound::Included(version) | Bound::Excluded(version) => Some(version),
        Bound::Unbounded => None,
    }
}

/// Returns true if `entry` has none of the characters that mark a range.
pub fn is_discrete_version(entry: &str) -> bool {
    !entry.contains(RANGE_MARKERS)
}

/// One parsed entry of a `TargetSoftware.value` list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionEntry {
    /// A single version.
    Discrete(Version),
    /// An interval of versions.
    Range(VersionRange),
}

impl VersionEntry {
    /// Parse an entry, choosing discrete or range by its characters.
    pub fn parse(entry: &str) -> Result<Self, VersionError> {
        if is_discrete_version(entry) {
            Version::parse(entry).map(Self::Discrete)
        } else {
            VersionRange::parse(entry).map(Self::Range)
        }
    }

    /// Returns true if `version` equals the discrete version or lies inside
    /// the range.
    pub fn contains(&self, version: &Version) -> bool {
        match self {
            Self::Discrete(discrete) => discrete == version,
            Self::Range(range) => range.contains(version),
        }
    }
}

/// A list of discrete versions and ranges, satisfied by a version that any
/// entry contains.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionSet {
    entries: Vec<VersionEntry>,
}

impl VersionSet {
    /// Parse every entry of `entries`.
    ///
    /// # Errors
    ///
    /// Returns `VersionError::Empty` for an empty list, or the first entry
    /// that fails to parse.
    pub fn parse<S: AsRef<str>>(entries: &[S]) -> Result<Self, VersionError> {
        if entries.is_empty() {
            return Err(VersionError::Empty);
        }
        let entries = entries
            .iter()
            .map(|entry| VersionEntry::parse(entry.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { entries })
    }

    /// The parsed entries, in input order.
    pub fn entries(&self) -> &[VersionEntry] {
        &self.entries
    }

    /// Returns true if any entry contains `version`.
    pub fn contains(&self, version: &Version) -> bool {
        self.entries.iter().any(|entry| entry.contains(version))
    }
}

/// Decide whether the detected version string satisfies one filter entry.
///
/// When the entry cannot be parsed the two strings are compared verbatim.
/// When the entry is a valid range but the detected version is not a
/// valid version, the entry is not satisfied.
pub fn version_satisfies(detected: &str, entry: &str) -> bool {
    let parsed_entry = match VersionEntry::parse(entry) {
        Ok(parsed) => parsed,
        Err(error) => {
            tracing::trace!(entry, %error, "unparsable version entry, comparing verbatim");
            return detected == entry;
        }
    };
    match Version::parse(detected) {
        Ok(version) => parsed_entry.contains(&version),
        Err(error) => {
            tracing::trace!(detected, %error, "unparsable detected version");
            matches!(parsed_entry, VersionEntry::Discrete(_)) && detected == entry
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    #[test]
    fn tokenizer_splits_on_boundaries() {
        assert_eq!(split_tokens("1.2.3"), vec!["1", ".", "2", ".", "3"]);
        assert_eq!(split_tokens("3ubuntu1"), vec!["3", "ubuntu", "1"]);
        assert_eq!(split_tokens("1+deb"), vec!["1", "+", "deb"]);
        assert_eq!(split_tokens("a..b"), vec!["a", ".", ".", "b"]);
        assert!(split_tokens("").is_empty());
    }

    #[test]
    fn epoch_detection() {
        assert!(has_epoch("1:2.3"));
        assert!(has_epoch("12_2.3"));
        assert!(has_epoch("3|x"));
        assert!(!has_epoch("2.3"));
        assert!(!has_epoch(":2.3"));
    }

    #[test]
    fn numeric_ordering() {
        assert!(v("1.0") < v("1.1"));
        assert!(v("1.9") < v("1.10"));
        assert!(v("2.1") < v("2.1.1"));
        assert!(v("10.0") > v("9.9.9"));
    }

    #[test]
    fn qualifier_ordering() {
        assert!(v("1.0alpha") < v("1.0beta"));
        assert!(v("1.0beta") < v("1.0rc1"));
        assert!(v("1.0rc1") < v("1.0"));
        assert!(v("1.0") < v("1.0p1"));
        assert!(v("1.0p1") < v("1.0patched"));
        assert!(v("1.0-RC1") == v("1.0-rc1"));
    }

    #[test]
    fn epoch_dominates() {
        assert!(v("1:1.0") > v("9.9"));
        assert!(v("0:1.0") == v("1.0"));
    }

    #[test]
    fn debian_style_versions() {
        assert!(v("2.4.41-4ubuntu3") < v("2.4.41-4ubuntu3.1"));
        assert!(v("1.18.0-0ubuntu1") < v("1.18.0-6ubuntu1"));
    }

    #[test]
    fn excluded_tokens_are_ignored() {
        assert_eq!(v("1.0"), v("1.0.gg"));
        assert_eq!(v("1.0"), v("1.0-N/A"));
    }

    #[test]
    fn numbers_sort_below_text() {
        assert!(v("1.0.1") < v("1.0.a"));
    }

    #[test]
    fn oversized_number_is_text() {
        let huge = v("99999999999999999999");
        assert!(huge > v("1"));
    }

    #[test]
    fn invalid_versions() {
        assert_eq!(Version::parse("").unwrap_err(), VersionError::Empty);
        assert!(matches!(
            Version::parse("0").unwrap_err(),
            VersionError::NoSignificantToken(_)
        ));
        assert!(Version::parse("gg").is_err());
        assert!(Version::parse("...").is_err());
        assert!(Version::parse("0.0.0").is_err());
    }

    #[test]
    fn range_parsing() {
        let range = VersionRange::parse("[1.0,2.0)").unwrap();
        assert_eq!(range.min(), Bound::Included(&v("1.0")));
        assert_eq!(range.max(), Bound::Excluded(&v("2.0")));

        let range = VersionRange::parse("(,1.5]").unwrap();
        assert_eq!(range.min(), Bound::Unbounded);

        let range = VersionRange::parse("[1.5,]").unwrap();
        assert_eq!(range.max(), Bound::Unbounded);

        assert!(VersionRange::parse("[ 1.0 , 2.0 ]").is_ok());
    }

    #[test]
    fn malformed_ranges() {
        for bad in [
            "", "1.0,2.0", "[1.0,2.0", "1.0,2.0]", "[1.0]", "[1.0,2.0,3.0]", "(,)", "[ , ]",
            "[[1.0,2.0]", "[2.0,1.0]", "[1.0,1.0]", "[0,1.0]", "]",
        ] {
            assert!(VersionRange::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn range_containment() {
        let range = VersionRange::parse("[1.20,1.22)").unwrap();
        assert!(range.contains(&v("1.20")));
        assert!(range.contains(&v("1.21.6")));
        assert!(!range.contains(&v("1.22")));
        assert!(!range.contains(&v("1.19.9")));

        let open_low = VersionRange::parse("(,2.4.49]").unwrap();
        assert!(open_low.contains(&v("1.0")));
        assert!(open_low.contains(&v("2.4.49")));
        assert!(!open_low.contains(&v("2.4.50")));

        let exclusive = VersionRange::parse("(1.0,2.0)").unwrap();
        assert!(!exclusive.contains(&v("1.0")));
        assert!(exclusive.contains(&v("1.0.1")));
    }

    #[test]
    fn entry_classification() {
        assert!(is_discrete_version("1.18.0"));
        assert!(!is_discrete_version("[1.0,2.0)"));
        assert!(!is_discrete_version("1.0 beta"));
        assert!(matches!(
            VersionEntry::parse("1.0").unwrap(),
            VersionEntry::Discrete(_)
        ));
        assert!(matches!(
            VersionEntry::parse("[1.0,)").unwrap(),
            VersionEntry::Range(_)
        ));
    }

    #[test]
    fn version_set() {
        let set = VersionSet::parse(&["1.18", "[1.20,1.22)"]).unwrap();
        assert_eq!(set.entries().len(), 2);
        assert!(set.contains(&v("1.18")));
        assert!(set.contains(&v("1.21")));
        assert!(!set.contains(&v("1.19")));
        assert_eq!(
            VersionSet::parse::<&str>(&[]).unwrap_err(),
            VersionError::Empty
        );
        assert!(VersionSet::parse(&["1.0", "[bad"]).is_err());
    }

    #[test]
    fn satisfies_discrete_and_range() {
        assert!(version_satisfies("1.18", "1.18"));
        assert!(version_satisfies("1.18.0", "1.18.0"));
        assert!(!version_satisfies("1.18", "1.18.0"));
        assert!(version_satisfies("1.21.3", "[1.20,1.22)"));
        assert!(!version_satisfies("1.22", "[1.20,1.22)"));
    }

    #[test]
    fn satisfies_falls_back_to_verbatim() {
        assert!(version_satisfies("N/A", "N/A"));
        assert!(!version_satisfies("0", "1.0"));
        assert!(version_satisfies("[bad", "[bad"));
        assert!(!version_satisfies("garbage,", "[1.0,2.0]"));
    }
}
