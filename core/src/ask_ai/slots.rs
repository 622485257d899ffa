//! `NORMALIZED -> ENTITIES_EXTRACTED` domain-keyword heuristic, and the
//! essential-slot check driving `CACHE_CHECKED -> CLARIFYING` (spec §4.8).

use crate::adapters::ner::EntityMention;

const DOMAIN_KEYWORDS: &[&str] = &[
    "light", "switch", "sensor", "climate", "lock", "cover", "fan", "media_player", "camera",
    "vacuum", "thermostat",
];

const ACTION_VERBS: &[&str] = &[
    "turn", "set", "dim", "lock", "unlock", "open", "close", "start", "stop", "play", "pause",
    "arm", "disarm",
];

/// Finds known Home-Assistant-style domain words in `text` as standalone
/// mention candidates, supplementing whatever the external NER adapter
/// returns (spec: "combine with domain-keyword heuristics").
#[must_use]
pub fn domain_keyword_mentions(text: &str) -> Vec<EntityMention> {
    let lower = text.to_lowercase();
    DOMAIN_KEYWORDS
        .iter()
        .filter_map(|keyword| {
            lower.find(keyword).map(|start| EntityMention {
                text: (*keyword).to_string(),
                start,
                end: start + keyword.len(),
            })
        })
        .collect()
}

/// Whether `text` names an action (spec: "essential slots (trigger, action)").
#[must_use]
pub fn has_action_verb(text: &str) -> bool {
    let lower = text.to_lowercase();
    ACTION_VERBS.iter().any(|verb| lower.split_whitespace().any(|w| w == *verb))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_domain_keyword_mentions() {
        let mentions = domain_keyword_mentions("turn on the office light please");
        assert!(mentions.iter().any(|m| m.text == "light"));
    }

    #[test]
    fn detects_action_verbs() {
        assert!(has_action_verb("turn on the office light"));
        assert!(!has_action_verb("the office light"));
    }
}
