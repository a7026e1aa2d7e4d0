//! Single-field predicates used by auto-playlist rules and checker
//! reference comparisons.

use std::cell::OnceCell;
use std::str::FromStr;
use std::sync::LazyLock;

use jiff::civil::Date;
use jiff::{Span, Zoned};
use regex::Regex;
use strum::{Display, EnumIter, EnumString};

use crate::error::MusifyError;
use crate::field::{Field, HasFields, TagValue};

static DATE_EXPECTED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{1,2}[/-]\d{1,2}[/-]\d{2,4}$").unwrap());

/// The closed set of conditions a rule may use. The MusicBee spellings
/// (`greater_than`, `is_in_the_last`, ...) parse as aliases.
#[derive(Debug, Display, EnumString, EnumIter, Clone, Copy, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum Condition {
    Is,
    IsNot,
    #[strum(
        to_string = "is_after",
        serialize = "greater_than",
        serialize = "is_in_the_last",
        serialize = "in_the_last"
    )]
    IsAfter,
    #[strum(
        to_string = "is_before",
        serialize = "less_than",
        serialize = "is_not_in_the_last",
        serialize = "not_in_the_last"
    )]
    IsBefore,
    IsIn,
    IsNotIn,
    InRange,
    NotInRange,
    IsNull,
    IsNotNull,
    StartsWith,
    EndsWith,
    Contains,
    DoesNotContain,
    MatchesRegEx,
    MatchesRegExIgnoreCase,
}

impl Condition {
    /// Parse a condition name in either snake_case or MusicBee PascalCase.
    pub fn from_name(name: &str) -> Result<Self, MusifyError> {
        Condition::from_str(&camel_to_snake(name)).map_err(|_| MusifyError::Rule {
            what: "condition",
            name: name.to_string(),
        })
    }
}

pub(crate) fn camel_to_snake(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Compares one field of an item against a set of expected values, or
/// against a reference item when no expected values are set.
///
/// Expected values arrive as strings (from the rule file) and are converted
/// to the type of the compared field's value on first use. The conversion is
/// cached per instance and never rerun, so durational shorthands such as
/// `2w` freeze to a concrete instant at the first comparison.
#[derive(Debug, Clone)]
pub struct Comparer {
    pub field: Field,
    pub condition: Condition,
    expected: Vec<String>,
    converted: OnceCell<Vec<TagValue>>,
}

impl Comparer {
    pub fn new(field: Field, condition: Condition, expected: Vec<String>) -> Self {
        Comparer {
            field,
            condition,
            expected,
            converted: OnceCell::new(),
        }
    }

    /// True when this comparer needs a reference item to compare against.
    pub fn needs_reference(&self) -> bool {
        self.expected.is_empty()
    }

    /// The raw expected values as loaded from the rule file.
    pub fn expected_raw(&self) -> &[String] {
        &self.expected
    }

    #[cfg(test)]
    pub(crate) fn converted_expected(&self) -> Option<&Vec<TagValue>> {
        self.converted.get()
    }

    /// Evaluate this comparer against ``track``.
    ///
    /// When a ``reference`` is given its field value is used as the expected
    /// value instead of this comparer's own list.
    pub fn compare<T: HasFields>(
        &self,
        track: &T,
        reference: Option<&T>,
    ) -> Result<bool, MusifyError> {
        let actual = track.field(self.field);

        let expected_from_reference;
        let expected: &[TagValue] = match reference {
            Some(reference) => {
                expected_from_reference = vec![reference.field(self.field)];
                &expected_from_reference
            }
            None => {
                if matches!(self.condition, Condition::IsNull | Condition::IsNotNull) {
                    &[]
                } else {
                    if self.expected.is_empty() {
                        return Err(MusifyError::Rule {
                            what: "comparer",
                            name: format!("{} has no expected values and no reference", self.field),
                        });
                    }
                    if self.converted.get().is_none() {
                        let converted = self.convert_expected(&actual)?;
                        let _ = self.converted.set(converted);
                    }
                    self.converted.get().expect("cache was just filled")
                }
            }
        };

        self.process(&actual, expected)
    }

    /// Convert the raw expected strings to the shape of ``actual``.
    fn convert_expected(&self, actual: &TagValue) -> Result<Vec<TagValue>, MusifyError> {
        let rule_err = |value: &str| MusifyError::Rule {
            what: "expected value",
            name: value.to_string(),
        };

        let converted = match actual {
            TagValue::Int(_) => self
                .expected
                .iter()
                .map(|raw| parse_number(raw).map(|n| TagValue::Int(n as i64)).ok_or_else(|| rule_err(raw)))
                .collect::<Result<_, _>>()?,
            TagValue::Float(_) => self
                .expected
                .iter()
                .map(|raw| parse_number(raw).map(TagValue::Float).ok_or_else(|| rule_err(raw)))
                .collect::<Result<_, _>>()?,
            TagValue::Date(_) | TagValue::DateTime(_) => self
                .expected
                .iter()
                .map(|raw| parse_date_expected(raw))
                .collect::<Result<_, _>>()?,
            // for flags only presence matters, the expected list is dropped
            TagValue::Bool(_) => Vec::new(),
            _ => self.expected.iter().map(|raw| TagValue::Str(raw.clone())).collect(),
        };
        Ok(converted)
    }

    fn process(&self, actual: &TagValue, expected: &[TagValue]) -> Result<bool, MusifyError> {
        use Condition::*;

        let first = expected.first();
        let ordering = |other: &TagValue| actual.partial_cmp_value(other);
        let equals = |other: &TagValue| ordering(other) == Some(std::cmp::Ordering::Equal);

        let result = match self.condition {
            Is => first.is_some_and(equals),
            IsNot => !first.is_some_and(equals),
            IsAfter => first
                .and_then(ordering)
                .is_some_and(|ord| ord == std::cmp::Ordering::Greater),
            IsBefore => first
                .and_then(ordering)
                .is_some_and(|ord| ord == std::cmp::Ordering::Less),
            IsIn => expected.iter().any(equals),
            IsNotIn => !expected.iter().any(equals),
            InRange | NotInRange => {
                let (Some(low), Some(high)) = (expected.first(), expected.get(1)) else {
                    return Err(MusifyError::Rule {
                        what: "comparer",
                        name: format!("{} range needs two expected values", self.condition),
                    });
                };
                let inside = ordering(low) == Some(std::cmp::Ordering::Greater)
                    && ordering(high) == Some(std::cmp::Ordering::Less);
                (self.condition == InRange) == inside
            }
            IsNull => actual.is_null(),
            IsNotNull => !actual.is_null(),
            StartsWith => str_op(actual, first, |a, e| a.starts_with(e)),
            EndsWith => str_op(actual, first, |a, e| a.ends_with(e)),
            Contains => contains(actual, first),
            DoesNotContain => !contains(actual, first),
            MatchesRegEx => regex_match(actual, first, false)?,
            MatchesRegExIgnoreCase => regex_match(actual, first, true)?,
        };
        Ok(result)
    }
}

fn str_op(actual: &TagValue, expected: Option<&TagValue>, op: impl Fn(&str, &str) -> bool) -> bool {
    match (actual.as_str(), expected.and_then(TagValue::as_str)) {
        (Some(actual), Some(expected)) => op(actual, expected),
        _ => false,
    }
}

/// Substring test for strings, membership test for list tags.
fn contains(actual: &TagValue, expected: Option<&TagValue>) -> bool {
    let Some(expected) = expected.and_then(TagValue::as_str) else {
        return false;
    };
    match actual {
        TagValue::Str(actual) => actual.contains(expected),
        TagValue::StrList(actual) => actual.iter().any(|value| value == expected),
        _ => false,
    }
}

fn regex_match(
    actual: &TagValue,
    expected: Option<&TagValue>,
    ignore_case: bool,
) -> Result<bool, MusifyError> {
    let Some(pattern) = expected.and_then(TagValue::as_str) else {
        return Ok(false);
    };
    let Some(actual) = actual.as_str() else {
        return Ok(false);
    };

    let pattern = if ignore_case {
        format!("(?i){pattern}")
    } else {
        pattern.to_string()
    };
    let regex = Regex::new(&pattern).map_err(|_| MusifyError::Rule {
        what: "regular expression",
        name: pattern.clone(),
    })?;
    Ok(regex.is_match(actual))
}

/// Parse a plain number, or a `D:H:M:S[,ms]` time string into seconds
/// (e.g. `4:30` is 270).
fn parse_number(raw: &str) -> Option<f64> {
    if !raw.contains(':') {
        return raw.trim().parse().ok();
    }

    let parts: Vec<&str> = raw.trim().split(':').collect();
    if parts.len() > 4 {
        return None;
    }

    let mut seconds = 0.0;
    let last = *parts.last()?;
    if let Some((_, millis)) = last.split_once(',') {
        seconds += millis.parse::<f64>().ok()? / 1000.0;
    }

    const FACTORS: [f64; 4] = [1.0, 60.0, 3600.0, 86400.0];
    for (i, part) in parts.iter().rev().enumerate() {
        let digits = part.split(',').next()?;
        seconds += digits.parse::<f64>().ok()? * FACTORS[i];
    }
    Some(seconds)
}

/// Parse an expected date: a `d/m/y` date (2-digit years disambiguated by
/// the millennium rule) or a `<n><unit>` durational shorthand meaning
/// "now minus n hours/days/weeks/months".
fn parse_date_expected(raw: &str) -> Result<TagValue, MusifyError> {
    let rule_err = || MusifyError::Rule {
        what: "expected date",
        name: raw.to_string(),
    };
    let raw = raw.trim();

    if DATE_EXPECTED.is_match(raw) {
        let mut digits = raw
            .split(['/', '-'])
            .map(|part| part.parse::<i32>().map_err(|_| rule_err()))
            .collect::<Result<Vec<_>, _>>()?;
        digits.reverse();
        let (mut year, month, day) = (digits[0], digits[1], digits[2]);

        if year < 100 {
            let current = Zoned::now().year() as i32 % 100;
            year += if year > current { 1900 } else { 2000 };
        }
        let date = Date::new(year as i16, month as i8, day as i8).map_err(|_| rule_err())?;
        return Ok(TagValue::Date(date));
    }

    // durational shorthand, e.g. "2w" = two weeks ago
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let amount: i64 = digits.parse().map_err(|_| rule_err())?;
    let unit = raw
        .chars()
        .find(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .ok_or_else(rule_err)?;

    let span = match unit {
        'h' => Span::new().hours(amount),
        'd' => Span::new().days(amount),
        'w' => Span::new().weeks(amount),
        'm' => Span::new().months(amount),
        _ => return Err(rule_err()),
    };
    let then = Zoned::now().checked_sub(span).map_err(|_| rule_err())?;
    Ok(TagValue::DateTime(then.datetime()))
}

#[cfg(test)]
mod tests;
