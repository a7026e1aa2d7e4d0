use jiff::civil::{Date, DateTime};
use jiff::{Span, Zoned};
use pretty_assertions::assert_eq;

use super::*;

#[derive(Debug, Default, Clone)]
struct FakeTrack {
    album: Option<String>,
    year: Option<i64>,
    length: Option<f64>,
    genres: Vec<String>,
    compilation: bool,
    last_played: Option<DateTime>,
}

impl HasFields for FakeTrack {
    fn field(&self, field: Field) -> TagValue {
        match field {
            Field::Album => self
                .album
                .clone()
                .map(TagValue::Str)
                .unwrap_or_default(),
            Field::Year => self.year.map(TagValue::Int).unwrap_or_default(),
            Field::Length => self.length.map(TagValue::Float).unwrap_or_default(),
            Field::Genres => TagValue::StrList(self.genres.clone()),
            Field::Compilation => TagValue::Bool(self.compilation),
            Field::LastPlayed => self.last_played.map(TagValue::DateTime).unwrap_or_default(),
            _ => TagValue::None,
        }
    }
}

fn track_with_album(album: &str) -> FakeTrack {
    FakeTrack {
        album: Some(album.to_string()),
        ..Default::default()
    }
}

#[test]
fn condition_names_parse_with_aliases() {
    assert_eq!(Condition::from_name("is").unwrap(), Condition::Is);
    assert_eq!(Condition::from_name("GreaterThan").unwrap(), Condition::IsAfter);
    assert_eq!(Condition::from_name("InTheLast").unwrap(), Condition::IsAfter);
    assert_eq!(Condition::from_name("is_not_in_the_last").unwrap(), Condition::IsBefore);
    assert_eq!(Condition::from_name("MatchesRegEx").unwrap(), Condition::MatchesRegEx);
    assert!(Condition::from_name("SomethingElse").is_err());
}

#[test]
fn is_matches_string_field() {
    let comparer = Comparer::new(Field::Album, Condition::Is, vec!["X".to_string()]);
    assert!(comparer.compare(&track_with_album("X"), None).unwrap());
    assert!(!comparer.compare(&track_with_album("Y"), None).unwrap());
}

#[test]
fn year_in_range_is_exclusive_of_bounds() {
    let comparer = Comparer::new(
        Field::Year,
        Condition::InRange,
        vec!["2000".to_string(), "2010".to_string()],
    );
    let year = |y| FakeTrack {
        year: Some(y),
        ..Default::default()
    };
    assert!(comparer.compare(&year(2005), None).unwrap());
    assert!(!comparer.compare(&year(2000), None).unwrap());
    assert!(!comparer.compare(&year(1999), None).unwrap());
}

#[test]
fn time_strings_convert_to_seconds() {
    // "4:30" is 270 seconds, so a 280s track is after it
    let comparer = Comparer::new(Field::Length, Condition::IsAfter, vec!["4:30".to_string()]);
    let length = |l| FakeTrack {
        length: Some(l),
        ..Default::default()
    };
    assert!(comparer.compare(&length(280.0), None).unwrap());
    assert!(!comparer.compare(&length(200.0), None).unwrap());
}

#[test]
fn conversion_happens_once_and_is_cached() {
    let comparer = Comparer::new(Field::Year, Condition::Is, vec!["2005".to_string()]);
    let track = FakeTrack {
        year: Some(2005),
        ..Default::default()
    };

    assert!(comparer.converted_expected().is_none());
    assert!(comparer.compare(&track, None).unwrap());
    let first = comparer.converted_expected().unwrap().clone();
    assert_eq!(first, vec![TagValue::Int(2005)]);

    assert!(comparer.compare(&track, None).unwrap());
    assert_eq!(comparer.converted_expected().unwrap(), &first);
}

#[test]
fn durational_shorthand_compares_against_now() {
    let comparer = Comparer::new(Field::LastPlayed, Condition::IsAfter, vec!["1w".to_string()]);
    let played_at = |span: Span| {
        let then = Zoned::now().checked_sub(span).unwrap();
        FakeTrack {
            last_played: Some(then.datetime()),
            ..Default::default()
        }
    };

    assert!(comparer.compare(&played_at(Span::new().days(2)), None).unwrap());
    assert!(!comparer.compare(&played_at(Span::new().days(30)), None).unwrap());
}

#[test]
fn two_digit_years_follow_millennium_rule() {
    let current = Zoned::now().year() as i32 % 100;
    let old = format!("1/6/{}", (current + 1) % 100);

    let comparer = Comparer::new(Field::LastPlayed, Condition::IsBefore, vec![old]);
    let track = FakeTrack {
        last_played: Some(DateTime::constant(1900, 1, 1, 0, 0, 0, 0)),
        ..Default::default()
    };
    // the expected year lands in the previous millennium, so a 1900
    // timestamp sorts before it
    let expected = comparer.compare(&track, None).unwrap();
    assert!(expected);
    match comparer.converted_expected().unwrap().first().unwrap() {
        TagValue::Date(date) => assert!(date.year() >= 1900 && date.year() < 2000),
        other => panic!("expected a date, got {other:?}"),
    }
}

#[test]
fn datetime_actual_coerces_to_expected_date() {
    let comparer = Comparer::new(Field::LastPlayed, Condition::Is, vec!["15/3/2023".to_string()]);
    let track = FakeTrack {
        last_played: Some(DateTime::constant(2023, 3, 15, 14, 30, 0, 0)),
        ..Default::default()
    };
    assert!(comparer.compare(&track, None).unwrap());
}

#[test]
fn null_checks_treat_false_flags_as_null() {
    let is_null = Comparer::new(Field::Compilation, Condition::IsNull, Vec::new());
    let is_not_null = Comparer::new(Field::Album, Condition::IsNotNull, Vec::new());

    let plain = FakeTrack::default();
    assert!(is_null.compare(&plain, None).unwrap());
    assert!(!is_not_null.compare(&plain, None).unwrap());

    let flagged = FakeTrack {
        compilation: true,
        album: Some("X".to_string()),
        ..Default::default()
    };
    assert!(!is_null.compare(&flagged, None).unwrap());
    assert!(is_not_null.compare(&flagged, None).unwrap());
}

#[test]
fn contains_is_membership_for_list_tags() {
    let comparer = Comparer::new(Field::Genres, Condition::Contains, vec!["rock".to_string()]);
    let track = FakeTrack {
        genres: vec!["rock".to_string(), "pop".to_string()],
        ..Default::default()
    };
    assert!(comparer.compare(&track, None).unwrap());

    let partial = FakeTrack {
        genres: vec!["post-rock".to_string()],
        ..Default::default()
    };
    // membership is exact for lists, unlike the substring test for strings
    assert!(!comparer.compare(&partial, None).unwrap());
}

#[test]
fn contains_is_substring_for_string_tags() {
    let comparer = Comparer::new(Field::Album, Condition::Contains, vec!["Light".to_string()]);
    assert!(comparer.compare(&track_with_album("First Light"), None).unwrap());
    assert!(!comparer.compare(&track_with_album("Dark"), None).unwrap());
}

#[test]
fn regex_conditions() {
    let comparer = Comparer::new(
        Field::Album,
        Condition::MatchesRegExIgnoreCase,
        vec!["^first".to_string()],
    );
    assert!(comparer.compare(&track_with_album("First Light"), None).unwrap());

    let sensitive = Comparer::new(Field::Album, Condition::MatchesRegEx, vec!["^first".to_string()]);
    assert!(!sensitive.compare(&track_with_album("First Light"), None).unwrap());
}

#[test]
fn missing_expected_without_reference_is_an_error() {
    let comparer = Comparer::new(Field::Album, Condition::Is, Vec::new());
    assert!(comparer.compare(&track_with_album("X"), None).is_err());
}

#[test]
fn reference_supplies_expected_values() {
    let comparer = Comparer::new(Field::Album, Condition::Is, Vec::new());
    let reference = track_with_album("Shared");
    assert!(comparer
        .compare(&track_with_album("Shared"), Some(&reference))
        .unwrap());
    assert!(!comparer
        .compare(&track_with_album("Other"), Some(&reference))
        .unwrap());
}

#[test]
fn date_comparison_against_fixed_date() {
    let comparer = Comparer::new(Field::LastPlayed, Condition::IsAfter, vec!["1/1/2020".to_string()]);
    let track = FakeTrack {
        last_played: Some(DateTime::constant(2023, 6, 1, 0, 0, 0, 0)),
        ..Default::default()
    };
    assert!(comparer.compare(&track, None).unwrap());

    let expected = comparer.converted_expected().unwrap();
    assert_eq!(expected, &vec![TagValue::Date(Date::constant(2020, 1, 1))]);
}
