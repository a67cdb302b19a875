/// Maps a zero-based index to a spreadsheet-style letter label.
///
/// Bijective base-26 over `A..Z`: indices past 25 grow extra letters,
/// e.g. `create_label(29) -> "AD"`.
pub fn create_label(index: usize) -> String {
    let mut label = String::new();
    let mut remaining = index as i64;

    while remaining >= 0 {
        let letter = (b'A' + (remaining % 26) as u8) as char;
        label.insert(0, letter);
        remaining = remaining / 26 - 1;
    }

    label
}

/// Normalizes a sentence fragment so it ends with `". "`.
///
/// A trailing period is added only when missing; the single trailing
/// space is always appended.
pub fn normalize_fragment(text: &str) -> String {
    let trimmed = text.trim_end();
    if trimmed.ends_with('.') {
        format!("{} ", trimmed)
    } else {
        format!("{}. ", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_label_single_letters() {
        assert_eq!(create_label(0), "A");
        assert_eq!(create_label(1), "B");
        assert_eq!(create_label(25), "Z");
    }

    #[test]
    fn test_create_label_multi_letters() {
        assert_eq!(create_label(26), "AA");
        assert_eq!(create_label(27), "AB");
        assert_eq!(create_label(29), "AD");
        assert_eq!(create_label(51), "AZ");
        assert_eq!(create_label(52), "BA");
    }

    #[test]
    fn test_create_label_is_unique_over_a_wide_range() {
        let mut seen = std::collections::HashSet::new();
        for index in 0..2000 {
            assert!(seen.insert(create_label(index)), "collision at {}", index);
        }
    }

    #[test]
    fn test_normalize_fragment() {
        assert_eq!(normalize_fragment("Predicted values"), "Predicted values. ");
        assert_eq!(normalize_fragment("Predicted values."), "Predicted values. ");
        assert_eq!(normalize_fragment("Trailing space. "), "Trailing space. ");
    }

    #[test]
    fn test_split_artifact_name() {
        assert_eq!(split_artifact_name("results.png"), ("results", "png"));
        assert_eq!(
            split_artifact_name("tables/summary.csv"),
            ("tables/summary", "csv")
        );
        assert_eq!(split_artifact_name("no_extension"), ("no_extension", ""));
    }
}

/// Splits an artifact file name into `(stem, extension)`, the extension
/// taken after the last dot and returned without it.
pub fn split_artifact_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(position) => (&name[..position], &name[position + 1..]),
        None => (name, ""),
    }
}
