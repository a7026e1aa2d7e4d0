//! Small helpers shared across modules.

/// Clamp ``value`` into ``[floor, ceil]``.
pub fn limit_value(value: f64, floor: f64, ceil: f64) -> f64 {
    value.clamp(floor, ceil)
}

/// The column width to use for a set of names: the longest name, capped at 50.
pub fn max_width<I, S>(names: I) -> usize
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    names
        .into_iter()
        .map(|name| name.as_ref().chars().count())
        .max()
        .unwrap_or(0)
        .min(50)
}

/// Pad ``name`` to ``width``, truncating with an ellipsis when longer.
pub fn align_and_truncate(name: &str, width: usize) -> String {
    let count = name.chars().count();
    if count <= width {
        let mut out = name.to_string();
        out.extend(std::iter::repeat_n(' ', width - count));
        out
    } else {
        let mut out: String = name.chars().take(width.saturating_sub(3)).collect();
        out.push_str("...");
        out
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn limits_are_inclusive() {
        assert_eq!(limit_value(0.0, 0.01, 1.0), 0.01);
        assert_eq!(limit_value(1.3, 0.01, 1.0), 1.0);
        assert_eq!(limit_value(0.5, 0.01, 1.0), 0.5);
    }

    #[test]
    fn width_capped_at_fifty() {
        let long = "x".repeat(80);
        assert_eq!(max_width([long.as_str(), "short"]), 50);
        assert_eq!(max_width(["abc", "ab"]), 3);
    }

    #[test]
    fn aligns_and_truncates() {
        assert_eq!(align_and_truncate("ab", 4), "ab  ");
        assert_eq!(align_and_truncate("abcdefgh", 6), "abc...");
    }
}
