//! Numbered-device parsing signal (spec §4.7): "bedroom light 1" matches
//! the numbered suffix of an entity id such as `light.bedroom_1`.

use regex::Regex;
use std::sync::OnceLock;

fn trailing_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d+)\s*$").expect("valid regex"))
}

/// Extracts a trailing integer from a free-form token, e.g. `"bedroom light 1"
/// -> Some(1)`.
#[must_use]
pub fn trailing_number(token: &str) -> Option<u32> {
    trailing_number_pattern()
        .captures(token.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// `1.0` when both the token and the candidate's display name/entity id end
/// in the same integer suffix, `0.0` otherwise (including when neither has
/// one — a shared *absence* of a number is not evidence of a match).
#[must_use]
pub fn score(token: &str, display_name: &str, entity_id: &str) -> f64 {
    match (trailing_number(token), trailing_number(display_name).or_else(|| trailing_number(entity_id))) {
        (Some(a), Some(b)) if a == b => 1.0,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_trailing_numbers_score_one() {
        assert_eq!(score("bedroom light 1", "Bedroom Light 1", "light.bedroom_1"), 1.0);
    }

    #[test]
    fn mismatched_trailing_numbers_score_zero() {
        assert_eq!(score("bedroom light 1", "Bedroom Light 2", "light.bedroom_2"), 0.0);
    }

    #[test]
    fn no_trailing_numbers_score_zero() {
        assert_eq!(score("office light", "Office Light", "light.office"), 0.0);
    }
}
