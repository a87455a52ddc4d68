use super::dto::Tweet;
use crate::region::RegionRule;

/// Lower-cased keywords of a rule with their `#` / `@` sigils removed.
struct Keywords {
    terms: Vec<String>,
}

impl Keywords {
    fn from_rule(rule: &RegionRule) -> Self {
        let hashtags = rule
            .hashtags
            .iter()
            .map(|h| h.trim().trim_start_matches('#'));
        let mentions = rule
            .mentions
            .iter()
            .map(|m| m.trim().trim_start_matches('@'));

        let terms = hashtags
            .chain(mentions)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
            .collect();

        Self { terms }
    }

    fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        self.terms.iter().any(|term| text.contains(term.as_str()))
    }
}

/// Sums the impressions of every post that mentions one of the rule's
/// hashtags or handles. Hashtags and mentions count the same.
pub fn score_tweets(rule: &RegionRule, tweets: &[Tweet]) -> u64 {
    let keywords = Keywords::from_rule(rule);

    tweets
        .iter()
        .filter(|tweet| keywords.matches(&tweet.text))
        .fold(0u64, |total, tweet| total.saturating_add(tweet.impressions()))
}
