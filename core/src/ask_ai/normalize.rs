//! `RECEIVED -> NORMALIZED` (spec §4.8): lower-case, strip, expand known
//! abbreviations.

/// Fixed abbreviation table. Smaller and easier to audit than a learned
/// expander, and normalization must be deterministic (spec §8 property 9).
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("ac", "air conditioner"),
    ("temp", "temperature"),
    ("fridge", "refrigerator"),
    ("tv", "television"),
    ("thermo", "thermostat"),
];

fn expand_word(word: &str) -> &str {
    ABBREVIATIONS
        .iter()
        .find(|(abbrev, _)| *abbrev == word)
        .map_or(word, |(_, expansion)| expansion)
}

/// Lower-cases, collapses whitespace, and expands known abbreviations
/// word-by-word.
#[must_use]
pub fn normalize_query(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split_whitespace()
        .map(expand_word)
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_query("  Turn ON   the Light "), "turn on the light");
    }

    #[test]
    fn expands_known_abbreviations() {
        assert_eq!(normalize_query("set the AC to 70"), "set the air conditioner to 70");
        assert_eq!(normalize_query("turn off the TV"), "turn off the television");
    }

    #[test]
    fn leaves_unknown_words_untouched() {
        assert_eq!(normalize_query("dim the office light"), "dim the office light");
    }
}
