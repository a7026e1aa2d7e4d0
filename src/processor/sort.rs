//! Stable multi-field sorting and the group-by operation behind the
//! library's folder/album/artist/genre views.

use std::cmp::Ordering;
use std::collections::HashMap;

use rand::seq::SliceRandom;

use crate::field::{Field, HasFields, TagValue};

/// Multi-field stable sorter.
///
/// String keys are compared case-insensitively, optionally ignoring a
/// leading article (`the`, `a`). Tracks missing a value sort last when
/// ascending and first when descending.
#[derive(Debug, Clone, Default)]
pub struct Sorter {
    /// Fields to sort by, in priority order, with a per-field reverse flag.
    pub fields: Vec<(Field, bool)>,
    /// Ignore leading articles when comparing string fields.
    pub ignore_articles: bool,
}

impl Sorter {
    pub fn new(fields: Vec<(Field, bool)>) -> Self {
        Sorter {
            fields,
            ignore_articles: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn sort<T: HasFields>(&self, tracks: &mut [T]) {
        if self.fields.is_empty() {
            return;
        }
        tracks.sort_by(|a, b| {
            for (field, reverse) in &self.fields {
                let ord = compare_field(a, b, *field, *reverse, self.ignore_articles);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }

    /// Sort by a single field, ascending unless ``reverse``.
    pub fn sort_by_field<T: HasFields>(tracks: &mut [T], field: Field, reverse: bool) {
        tracks.sort_by(|a, b| compare_field(a, b, field, reverse, true));
    }

    pub fn shuffle<T>(tracks: &mut [T]) {
        tracks.shuffle(&mut rand::thread_rng());
    }

    /// Group tracks by the value of ``field``. List tags (genres) place a
    /// track in every group its values name.
    pub fn group_by_field<T: HasFields>(tracks: &[T], field: Field) -> HashMap<String, Vec<&T>> {
        let mut groups: HashMap<String, Vec<&T>> = HashMap::new();
        for track in tracks {
            match track.field(field) {
                TagValue::Str(value) => groups.entry(value).or_default().push(track),
                TagValue::StrList(values) => {
                    for value in values {
                        groups.entry(value).or_default().push(track);
                    }
                }
                TagValue::None => {}
                other => {
                    groups.entry(render_group_key(&other)).or_default().push(track);
                }
            }
        }
        groups
    }
}

fn render_group_key(value: &TagValue) -> String {
    match value {
        TagValue::Int(n) => n.to_string(),
        TagValue::Float(n) => n.to_string(),
        TagValue::Bool(b) => b.to_string(),
        TagValue::Date(d) => d.to_string(),
        TagValue::DateTime(d) => d.to_string(),
        TagValue::Str(s) => s.clone(),
        TagValue::StrList(values) => values.join(", "),
        TagValue::None => String::new(),
    }
}

fn compare_field<T: HasFields>(
    a: &T,
    b: &T,
    field: Field,
    reverse: bool,
    ignore_articles: bool,
) -> Ordering {
    let ord = compare_values(&a.field(field), &b.field(field), ignore_articles);
    if reverse { ord.reverse() } else { ord }
}

/// Ascending comparison with nulls last; reversing the result moves the
/// nulls first, which is the documented descending behavior.
fn compare_values(a: &TagValue, b: &TagValue, ignore_articles: bool) -> Ordering {
    use TagValue::None as Null;
    match (a, b) {
        (Null, Null) => Ordering::Equal,
        (Null, _) => Ordering::Greater,
        (_, Null) => Ordering::Less,
        (TagValue::Str(a), TagValue::Str(b)) => {
            string_sort_key(a, ignore_articles).cmp(&string_sort_key(b, ignore_articles))
        }
        (TagValue::StrList(a), TagValue::StrList(b)) => {
            string_sort_key(&a.join(", "), ignore_articles)
                .cmp(&string_sort_key(&b.join(", "), ignore_articles))
        }
        (a, b) => a.partial_cmp_value(b).unwrap_or(Ordering::Equal),
    }
}

/// Two-level key: special-character prefix first, then the lowercased value
/// with any leading article removed.
fn string_sort_key(value: &str, ignore_articles: bool) -> (bool, String) {
    let lower = value.to_lowercase();
    let stripped = if ignore_articles {
        lower
            .strip_prefix("the ")
            .or_else(|| lower.strip_prefix("a "))
            .unwrap_or(&lower)
    } else {
        &lower
    };
    let special = stripped
        .chars()
        .next()
        .is_some_and(|c| !c.is_alphanumeric());
    (special, stripped.to_string())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct FakeTrack {
        title: &'static str,
        album: Option<&'static str>,
        year: Option<i64>,
        genres: Vec<&'static str>,
    }

    impl FakeTrack {
        fn new(title: &'static str, album: Option<&'static str>, year: Option<i64>) -> Self {
            FakeTrack {
                title,
                album,
                year,
                genres: Vec::new(),
            }
        }
    }

    impl HasFields for FakeTrack {
        fn field(&self, field: Field) -> TagValue {
            match field {
                Field::Title => TagValue::Str(self.title.to_string()),
                Field::Album => self
                    .album
                    .map(|a| TagValue::Str(a.to_string()))
                    .unwrap_or_default(),
                Field::Year => self.year.map(TagValue::Int).unwrap_or_default(),
                Field::Genres => {
                    TagValue::StrList(self.genres.iter().map(|g| g.to_string()).collect())
                }
                _ => TagValue::None,
            }
        }
    }

    fn titles(tracks: &[FakeTrack]) -> Vec<&'static str> {
        tracks.iter().map(|t| t.title).collect()
    }

    #[test]
    fn sorts_strings_ignoring_articles_and_case() {
        let mut tracks = vec![
            FakeTrack::new("The Zebra", None, None),
            FakeTrack::new("apple", None, None),
            FakeTrack::new("A banana", None, None),
        ];
        Sorter::new(vec![(Field::Title, false)]).sort(&mut tracks);
        assert_eq!(titles(&tracks), vec!["apple", "A banana", "The Zebra"]);
    }

    #[test]
    fn nulls_sort_last_ascending_first_descending() {
        let mut tracks = vec![
            FakeTrack::new("a", None, Some(2000)),
            FakeTrack::new("b", None, None),
            FakeTrack::new("c", None, Some(1990)),
        ];
        Sorter::new(vec![(Field::Year, false)]).sort(&mut tracks);
        assert_eq!(titles(&tracks), vec!["c", "a", "b"]);

        Sorter::new(vec![(Field::Year, true)]).sort(&mut tracks);
        assert_eq!(titles(&tracks), vec!["b", "a", "c"]);
    }

    #[test]
    fn multi_field_sort_is_stable() {
        let mut tracks = vec![
            FakeTrack::new("d", Some("B"), Some(2001)),
            FakeTrack::new("c", Some("A"), Some(2001)),
            FakeTrack::new("b", Some("A"), Some(2000)),
            FakeTrack::new("a", Some("A"), Some(2001)),
        ];
        Sorter::new(vec![(Field::Album, false), (Field::Year, false)]).sort(&mut tracks);
        // within album A + year 2001, input order of c and a is kept
        assert_eq!(titles(&tracks), vec!["b", "c", "a", "d"]);
    }

    #[test]
    fn reverse_equals_sorted_descending() {
        let mut ascending = vec![
            FakeTrack::new("a", None, Some(1990)),
            FakeTrack::new("b", None, Some(2000)),
            FakeTrack::new("c", None, Some(2010)),
        ];
        let mut descending = ascending.clone();
        Sorter::new(vec![(Field::Year, false)]).sort(&mut ascending);
        ascending.reverse();
        Sorter::new(vec![(Field::Year, true)]).sort(&mut descending);
        assert_eq!(ascending, descending);
    }

    #[test]
    fn groups_by_scalar_and_list_fields() {
        let mut rock = FakeTrack::new("a", Some("X"), None);
        rock.genres = vec!["rock", "indie"];
        let pop = {
            let mut t = FakeTrack::new("b", Some("X"), None);
            t.genres = vec!["pop"];
            t
        };
        let tracks = vec![rock, pop];

        let by_album = Sorter::group_by_field(&tracks, Field::Album);
        assert_eq!(by_album["X"].len(), 2);

        let by_genre = Sorter::group_by_field(&tracks, Field::Genres);
        assert_eq!(by_genre["rock"].len(), 1);
        assert_eq!(by_genre["indie"].len(), 1);
        assert_eq!(by_genre["pop"].len(), 1);
    }
}
