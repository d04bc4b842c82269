//! Built-in comparison functions.
//!
//! Every function compares the textual value of a result field ("actual")
//! against the DSL arguments and returns `None` on success or a diagnostic
//! describing the mismatch.

use chrono::{DateTime, Duration, FixedOffset, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

use super::AssertionError;

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// No meaningful argument. The DSL still requires a placeholder token.
    Placeholder,
    Exactly(usize),
    Between(usize, usize),
    AtLeast(usize),
}

impl Arity {
    fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Placeholder => true,
            Arity::Exactly(k) => n == k,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Placeholder => write!(f, "no"),
            Arity::Exactly(k) => write!(f, "exactly {k}"),
            Arity::Between(lo, hi) => write!(f, "{lo} to {hi}"),
            Arity::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

macro_rules! assertion_kinds {
    ($($variant:ident => $arity:expr),+ $(,)?) => {
        /// Supported comparison functions, named as in the DSL.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum AssertionKind {
            $($variant),+
        }

        impl AssertionKind {
            /// Every supported function.
            pub const ALL: &'static [AssertionKind] = &[$(AssertionKind::$variant),+];

            /// Name used in the DSL.
            pub fn name(self) -> &'static str {
                match self {
                    $(AssertionKind::$variant => stringify!($variant)),+
                }
            }

            /// Arguments accepted by the function.
            pub fn arity(self) -> Arity {
                match self {
                    $(AssertionKind::$variant => $arity),+
                }
            }
        }

        impl FromStr for AssertionKind {
            type Err = AssertionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $(stringify!($variant) => Ok(AssertionKind::$variant),)+
                    other => Err(AssertionError::MethodNotFound(other.to_string())),
                }
            }
        }
    };
}

assertion_kinds! {
    ShouldEqual => Arity::Exactly(1),
    ShouldNotEqual => Arity::Exactly(1),
    ShouldAlmostEqual => Arity::Between(1, 2),
    ShouldNotAlmostEqual => Arity::Between(1, 2),
    ShouldResemble => Arity::Exactly(1),
    ShouldNotResemble => Arity::Exactly(1),
    ShouldBeNil => Arity::Placeholder,
    ShouldNotBeNil => Arity::Placeholder,
    ShouldBeTrue => Arity::Placeholder,
    ShouldBeFalse => Arity::Placeholder,
    ShouldBeZeroValue => Arity::Placeholder,

    ShouldBeGreaterThan => Arity::Exactly(1),
    ShouldBeGreaterThanOrEqualTo => Arity::Exactly(1),
    ShouldBeLessThan => Arity::Exactly(1),
    ShouldBeLessThanOrEqualTo => Arity::Exactly(1),
    ShouldBeBetween => Arity::Exactly(2),
    ShouldNotBeBetween => Arity::Exactly(2),
    ShouldBeBetweenOrEqual => Arity::Exactly(2),
    ShouldNotBeBetweenOrEqual => Arity::Exactly(2),

    ShouldContain => Arity::Exactly(1),
    ShouldNotContain => Arity::Exactly(1),
    ShouldContainKey => Arity::Exactly(1),
    ShouldNotContainKey => Arity::Exactly(1),
    ShouldBeIn => Arity::AtLeast(1),
    ShouldNotBeIn => Arity::AtLeast(1),
    ShouldBeEmpty => Arity::Placeholder,
    ShouldNotBeEmpty => Arity::Placeholder,
    ShouldHaveLength => Arity::Exactly(1),

    ShouldStartWith => Arity::Exactly(1),
    ShouldNotStartWith => Arity::Exactly(1),
    ShouldEndWith => Arity::Exactly(1),
    ShouldNotEndWith => Arity::Exactly(1),
    ShouldBeBlank => Arity::Placeholder,
    ShouldNotBeBlank => Arity::Placeholder,
    ShouldContainSubstring => Arity::Exactly(1),
    ShouldNotContainSubstring => Arity::Exactly(1),

    ShouldEqualWithout => Arity::Exactly(2),
    ShouldEqualTrimSpace => Arity::Exactly(1),

    ShouldHappenBefore => Arity::Exactly(1),
    ShouldHappenOnOrBefore => Arity::Exactly(1),
    ShouldHappenAfter => Arity::Exactly(1),
    ShouldHappenOnOrAfter => Arity::Exactly(1),
    ShouldHappenBetween => Arity::Exactly(2),
    ShouldHappenOnOrBetween => Arity::Exactly(2),
    ShouldNotHappenOnOrBetween => Arity::Exactly(2),
    ShouldHappenWithin => Arity::Exactly(2),
    ShouldNotHappenWithin => Arity::Exactly(2),
    ShouldBeChronological => Arity::Placeholder,
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Default tolerance for `ShouldAlmostEqual`.
const DEFAULT_DELTA: f64 = 0.000_000_000_1;

impl AssertionKind {
    /// Check the argument count for this function.
    pub fn check_arity(self, got: usize) -> Result<(), AssertionError> {
        if self.arity().accepts(got) {
            Ok(())
        } else {
            Err(AssertionError::Arity {
                function: self.name().to_string(),
                expected: self.arity().to_string(),
                got,
            })
        }
    }

    /// Compare `actual` against `args`. `None` means the assertion holds.
    pub fn apply(self, actual: &str, args: &[String]) -> Option<String> {
        use AssertionKind::*;

        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or_default();

        match self {
            ShouldEqual => expect(
                values_equal(actual, arg(0)),
                || mismatch(arg(0), actual, "Should be equal"),
            ),
            ShouldNotEqual => expect(!values_equal(actual, arg(0)), || {
                format!("Expected '{actual}'\nto NOT equal '{}'\n(but it did)!", arg(0))
            }),
            ShouldAlmostEqual | ShouldNotAlmostEqual => {
                let delta = match args.get(1) {
                    Some(d) => match parse_number(d) {
                        Some(d) => d,
                        None => return Some(format!("The delta value '{d}' is not a number")),
                    },
                    None => DEFAULT_DELTA,
                };
                let (a, e) = match numbers(actual, arg(0)) {
                    Ok(pair) => pair,
                    Err(msg) => return Some(msg),
                };
                let close = (a - e).abs() <= delta;
                if self == ShouldAlmostEqual {
                    expect(close, || {
                        format!("Expected '{actual}' to almost equal '{}' (within {delta})", arg(0))
                    })
                } else {
                    expect(!close, || {
                        format!("Expected '{actual}' to NOT almost equal '{}' (within {delta})", arg(0))
                    })
                }
            }
            ShouldResemble => expect(resembles(actual, arg(0)), || {
                mismatch(arg(0), actual, "Should resemble")
            }),
            ShouldNotResemble => expect(!resembles(actual, arg(0)), || {
                format!("Expected '{actual}'\nto NOT resemble '{}'\n(but it did)!", arg(0))
            }),
            ShouldBeNil => expect(is_nil(actual), || format!("Expected: nil\nActual:   '{actual}'")),
            ShouldNotBeNil => expect(!is_nil(actual), || "Expected a value, got nil".to_string()),
            ShouldBeTrue => expect(actual.trim().eq_ignore_ascii_case("true"), || {
                format!("Expected: true\nActual:   '{actual}'")
            }),
            ShouldBeFalse => expect(actual.trim().eq_ignore_ascii_case("false"), || {
                format!("Expected: false\nActual:   '{actual}'")
            }),
            ShouldBeZeroValue => expect(is_zero_value(actual), || {
                format!("'{actual}' should have been the zero value")
            }),

            ShouldBeGreaterThan => ordering(actual, arg(0), "greater than", |o| o.is_gt()),
            ShouldBeGreaterThanOrEqualTo => {
                ordering(actual, arg(0), "greater than or equal to", |o| o.is_ge())
            }
            ShouldBeLessThan => ordering(actual, arg(0), "less than", |o| o.is_lt()),
            ShouldBeLessThanOrEqualTo => {
                ordering(actual, arg(0), "less than or equal to", |o| o.is_le())
            }
            ShouldBeBetween | ShouldNotBeBetween | ShouldBeBetweenOrEqual
            | ShouldNotBeBetweenOrEqual => {
                let (lower, upper) = match (numbers(actual, arg(0)), parse_number(arg(1))) {
                    (Ok((_, lo)), Some(hi)) => (lo.min(hi), lo.max(hi)),
                    (Err(msg), _) => return Some(msg),
                    (_, None) => return Some(format!("Bound '{}' is not a number", arg(1))),
                };
                let value = parse_number(actual).unwrap_or(f64::NAN);
                let inside = match self {
                    ShouldBeBetween | ShouldNotBeBetween => value > lower && value < upper,
                    _ => value >= lower && value <= upper,
                };
                let wanted = matches!(self, ShouldBeBetween | ShouldBeBetweenOrEqual);
                let inclusive = matches!(self, ShouldBeBetweenOrEqual | ShouldNotBeBetweenOrEqual);
                expect(inside == wanted, || {
                    format!(
                        "Expected '{actual}' {}to be between '{lower}' and '{upper}'{}",
                        if wanted { "" } else { "NOT " },
                        if inclusive { " (or equal to one of them)" } else { "" },
                    )
                })
            }

            ShouldContain => expect(elements(actual).iter().any(|e| e == arg(0)), || {
                format!("Expected the container ({actual}) to contain: '{}' (but it didn't)!", arg(0))
            }),
            ShouldNotContain => expect(!elements(actual).iter().any(|e| e == arg(0)), || {
                format!("Expected the container ({actual}) NOT to contain: '{}' (but it did)!", arg(0))
            }),
            ShouldContainKey | ShouldNotContainKey => {
                let keys = match keys(actual) {
                    Some(keys) => keys,
                    None => return Some(format!("'{actual}' is not a map")),
                };
                let found = keys.iter().any(|k| k == arg(0));
                let wanted = self == ShouldContainKey;
                expect(found == wanted, || {
                    format!(
                        "Expected the map ({actual}) {}to contain the key: '{}'",
                        if wanted { "" } else { "NOT " },
                        arg(0)
                    )
                })
            }
            ShouldBeIn => expect(args.iter().any(|a| a == actual), || {
                format!("Expected '{actual}' to be in the set {args:?} (but it wasn't)!")
            }),
            ShouldNotBeIn => expect(!args.iter().any(|a| a == actual), || {
                format!("Expected '{actual}' NOT to be in the set {args:?} (but it was)!")
            }),
            ShouldBeEmpty => expect(is_empty(actual), || {
                format!("Expected '{actual}' to be empty (but it wasn't)!")
            }),
            ShouldNotBeEmpty => expect(!is_empty(actual), || {
                "Expected value to NOT be empty (but it was)!".to_string()
            }),
            ShouldHaveLength => {
                let expected: usize = match arg(0).parse() {
                    Ok(n) => n,
                    Err(_) => return Some(format!("Length '{}' is not a non-negative integer", arg(0))),
                };
                let len = length(actual);
                expect(len == expected, || {
                    format!("Expected '{actual}' (length: {len}) to have length equal to '{expected}', but it wasn't!")
                })
            }

            ShouldStartWith => expect(actual.starts_with(arg(0)), || {
                format!("Expected '{actual}'\nto start with '{}'\n(but it didn't)!", arg(0))
            }),
            ShouldNotStartWith => expect(!actual.starts_with(arg(0)), || {
                format!("Expected '{actual}'\nNOT to start with '{}'\n(but it did)!", arg(0))
            }),
            ShouldEndWith => expect(actual.ends_with(arg(0)), || {
                format!("Expected '{actual}'\nto end with '{}'\n(but it didn't)!", arg(0))
            }),
            ShouldNotEndWith => expect(!actual.ends_with(arg(0)), || {
                format!("Expected '{actual}'\nNOT to end with '{}'\n(but it did)!", arg(0))
            }),
            ShouldBeBlank => expect(actual.is_empty(), || {
                format!("Expected '{actual}' to be blank (but it wasn't)!")
            }),
            ShouldNotBeBlank => expect(!actual.is_empty(), || {
                "Expected value to NOT be blank (but it was)!".to_string()
            }),
            ShouldContainSubstring => expect(actual.contains(arg(0)), || {
                format!("Expected '{actual}' to contain substring '{}' (but it didn't)!", arg(0))
            }),
            ShouldNotContainSubstring => expect(!actual.contains(arg(0)), || {
                format!("Expected '{actual}' NOT to contain substring '{}' (but it did)!", arg(0))
            }),
            ShouldEqualWithout => {
                let stripped = actual.replace(arg(1), "");
                expect(stripped == arg(0), || {
                    mismatch(arg(0), &stripped, "Should be equal without the given substring")
                })
            }
            ShouldEqualTrimSpace => expect(actual.trim() == arg(0).trim(), || {
                mismatch(arg(0), actual.trim(), "Should be equal after trimming spaces")
            }),

            ShouldHappenBefore
            | ShouldHappenOnOrBefore
            | ShouldHappenAfter
            | ShouldHappenOnOrAfter
            | ShouldHappenBetween
            | ShouldHappenOnOrBetween
            | ShouldNotHappenOnOrBetween
            | ShouldHappenWithin
            | ShouldNotHappenWithin => chronological(self, actual, args),
            ShouldBeChronological => {
                let times = match elements(actual)
                    .iter()
                    .map(|e| parse_time(e).ok_or_else(|| format!("'{e}' is not a timestamp")))
                    .collect::<Result<Vec<_>, _>>()
                {
                    Ok(times) => times,
                    Err(msg) => return Some(msg),
                };
                match times.windows(2).position(|w| w[1] < w[0]) {
                    None => None,
                    Some(i) => Some(format!(
                        "The 'Time' at index [{}] should have happened after the previous one (but it didn't!)",
                        i + 1
                    )),
                }
            }
        }
    }
}

fn expect(ok: bool, diagnostic: impl FnOnce() -> String) -> Option<String> {
    if ok { None } else { Some(diagnostic()) }
}

fn mismatch(expected: &str, actual: &str, what: &str) -> String {
    format!("Expected: '{expected}'\nActual:   '{actual}'\n({what})!")
}

fn parse_number(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok()
}

fn numbers(actual: &str, expected: &str) -> Result<(f64, f64), String> {
    match (parse_number(actual), parse_number(expected)) {
        (Some(a), Some(e)) => Ok((a, e)),
        (None, _) => Err(format!("Actual value '{actual}' is not a number")),
        (_, None) => Err(format!("Expected value '{expected}' is not a number")),
    }
}

/// Equality: numeric when both sides are numbers, textual otherwise.
fn values_equal(actual: &str, expected: &str) -> bool {
    match (parse_number(actual), parse_number(expected)) {
        (Some(a), Some(e)) => a == e,
        _ => actual == expected,
    }
}

/// Deep equality over JSON values, falling back to text equality.
fn resembles(actual: &str, expected: &str) -> bool {
    match (
        serde_json::from_str::<serde_json::Value>(actual),
        serde_json::from_str::<serde_json::Value>(expected),
    ) {
        (Ok(a), Ok(e)) => a == e,
        _ => actual == expected,
    }
}

fn ordering(
    actual: &str,
    expected: &str,
    what: &str,
    accept: impl Fn(std::cmp::Ordering) -> bool,
) -> Option<String> {
    let ord = match (parse_number(actual), parse_number(expected)) {
        (Some(a), Some(e)) => match a.partial_cmp(&e) {
            Some(ord) => ord,
            None => return Some(format!("Cannot compare '{actual}' with '{expected}'")),
        },
        _ => actual.cmp(expected),
    };
    expect(accept(ord), || {
        format!("Expected '{actual}' to be {what} '{expected}' (but it wasn't)!")
    })
}

fn is_nil(actual: &str) -> bool {
    matches!(actual.trim(), "" | "null" | "nil" | "<nil>")
}

fn is_zero_value(actual: &str) -> bool {
    let trimmed = actual.trim();
    is_nil(trimmed)
        || trimmed.eq_ignore_ascii_case("false")
        || parse_number(trimmed) == Some(0.0)
        || matches!(trimmed, "[]" | "{}")
}

fn json_container(actual: &str) -> Option<serde_json::Value> {
    match serde_json::from_str::<serde_json::Value>(actual) {
        Ok(v @ serde_json::Value::Array(_)) | Ok(v @ serde_json::Value::Object(_)) => Some(v),
        _ => None,
    }
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Collection view of a value: JSON array items, JSON object values, or
/// whitespace-separated tokens.
fn elements(actual: &str) -> Vec<String> {
    match json_container(actual) {
        Some(serde_json::Value::Array(items)) => items.iter().map(json_text).collect(),
        Some(serde_json::Value::Object(map)) => map.values().map(json_text).collect(),
        _ => actual.split_whitespace().map(String::from).collect(),
    }
}

fn keys(actual: &str) -> Option<Vec<String>> {
    match json_container(actual) {
        Some(serde_json::Value::Object(map)) => Some(map.keys().cloned().collect()),
        _ => None,
    }
}

fn is_empty(actual: &str) -> bool {
    match json_container(actual) {
        Some(serde_json::Value::Array(items)) => items.is_empty(),
        Some(serde_json::Value::Object(map)) => map.is_empty(),
        _ => actual.is_empty() || actual == "null",
    }
}

fn length(actual: &str) -> usize {
    match json_container(actual) {
        Some(serde_json::Value::Array(items)) => items.len(),
        Some(serde_json::Value::Object(map)) => map.len(),
        _ => actual.chars().count(),
    }
}

/// Parse an RFC 3339 timestamp or integer Unix seconds.
fn parse_time(s: &str) -> Option<DateTime<FixedOffset>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t);
    }
    let secs: i64 = s.parse().ok()?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(|t| t.fixed_offset())
}

/// Parse a Go-style duration such as `1h30m`, `500ms` or `2s`.
pub(crate) fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    let mut nanos = 0f64;
    let mut rest = s;
    while !rest.is_empty() {
        let split = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(split);
        let value: f64 = number.parse().ok()?;
        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, next) = tail.split_at(unit_len);
        let scale = match unit {
            "ns" => 1.0,
            "us" | "µs" => 1e3,
            "ms" => 1e6,
            "s" => 1e9,
            "m" => 60e9,
            "h" => 3600e9,
            _ => return None,
        };
        nanos += value * scale;
        rest = next;
    }
    Some(Duration::nanoseconds(nanos as i64))
}

fn chronological(kind: AssertionKind, actual: &str, args: &[String]) -> Option<String> {
    use AssertionKind::*;

    let when = match parse_time(actual) {
        Some(t) => t,
        None => return Some(format!("Actual value '{actual}' is not a timestamp")),
    };
    let time_arg = |i: usize| -> Result<DateTime<FixedOffset>, String> {
        let raw = args.get(i).map(String::as_str).unwrap_or_default();
        parse_time(raw).ok_or_else(|| format!("Argument '{raw}' is not a timestamp"))
    };

    let outcome = match kind {
        ShouldHappenBefore | ShouldHappenOnOrBefore | ShouldHappenAfter | ShouldHappenOnOrAfter => {
            time_arg(0).map(|other| {
                let (ok, what) = match kind {
                    ShouldHappenBefore => (when < other, "before"),
                    ShouldHappenOnOrBefore => (when <= other, "on or before"),
                    ShouldHappenAfter => (when > other, "after"),
                    _ => (when >= other, "on or after"),
                };
                (ok, format!("Expected '{actual}' to happen {what} '{other}'"))
            })
        }
        ShouldHappenBetween | ShouldHappenOnOrBetween | ShouldNotHappenOnOrBetween => {
            time_arg(0).and_then(|lo| time_arg(1).map(|hi| (lo, hi))).map(|(lo, hi)| {
                let strict = when > lo && when < hi;
                let inclusive = when >= lo && when <= hi;
                match kind {
                    ShouldHappenBetween => (strict, format!("Expected '{actual}' to happen between '{lo}' and '{hi}'")),
                    ShouldHappenOnOrBetween => (inclusive, format!("Expected '{actual}' to happen on or between '{lo}' and '{hi}'")),
                    _ => (!inclusive, format!("Expected '{actual}' to NOT happen on or between '{lo}' and '{hi}'")),
                }
            })
        }
        ShouldHappenWithin | ShouldNotHappenWithin => {
            let raw = args.first().map(String::as_str).unwrap_or_default();
            match parse_duration(raw) {
                None => Err(format!("Argument '{raw}' is not a duration")),
                Some(tolerance) => time_arg(1).map(|other| {
                    let within = (when - other).abs() <= tolerance;
                    if kind == ShouldHappenWithin {
                        (within, format!("Expected '{actual}' to happen within {raw} of '{other}'"))
                    } else {
                        (!within, format!("Expected '{actual}' to NOT happen within {raw} of '{other}'"))
                    }
                }),
            }
        }
        _ => Err(format!("{kind} is not a chronological assertion")),
    };

    match outcome {
        Ok((true, _)) => None,
        Ok((false, msg)) | Err(msg) => Some(msg),
    }
}
