//! Rule evaluation.

use super::model::FilterRule;
use crate::email::Message;

/// Evaluates filter rules against messages. Stateless.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterMatcher;

impl FilterMatcher {
    /// Returns the first rule in `rules` that matches `message`.
    #[must_use]
    pub fn find_match<'r>(
        &self,
        message: &Message,
        rules: &'r [FilterRule],
        skip_body: bool,
    ) -> Option<&'r FilterRule> {
        rules
            .iter()
            .find(|rule| self.matches(message, rule, skip_body))
    }

    /// Whether every criterion set on `rule` holds for `message`.
    ///
    /// A rule without criteria never matches. With `skip_body`, a rule that
    /// has body phrases never matches either, since the body is not
    /// available yet.
    #[must_use]
    pub fn matches(&self, message: &Message, rule: &FilterRule, skip_body: bool) -> bool {
        let mut criteria = 0;

        if let Some(pattern) = rule.from_pattern() {
            criteria += 1;
            let from = sender_address(message);
            if !wildcard_match(&pattern.to_lowercase(), &from.to_lowercase()) {
                return false;
            }
        }

        if let Some(pattern) = rule.to_pattern() {
            criteria += 1;
            let pattern = pattern.to_lowercase();
            if !message
                .to_address_list()
                .iter()
                .any(|to| wildcard_match(&pattern, &to.to_lowercase()))
            {
                return false;
            }
        }

        if let Some(pattern) = rule.subject_pattern() {
            criteria += 1;
            if !wildcard_match(pattern, &message.subject) {
                return false;
            }
        }

        if !rule.body_contains.is_empty() {
            criteria += 1;
            if skip_body || !body_contains_any(message, &rule.body_contains) {
                return false;
            }
        }

        criteria > 0
    }
}

fn sender_address(message: &Message) -> String {
    if message.from.trim().is_empty() {
        message.from_address().unwrap_or_default()
    } else {
        message.from.trim().to_string()
    }
}

/// Searches the plain body (derived from the HTML when not stored) and the
/// raw body.
fn body_contains_any(message: &Message, phrases: &[String]) -> bool {
    let plain = message.body_plain_for_sending().to_lowercase();
    let html = message.body.to_lowercase();

    phrases
        .iter()
        .filter(|phrase| !phrase.is_empty())
        .map(|phrase| phrase.to_lowercase())
        .any(|phrase| plain.contains(&phrase) || html.contains(&phrase))
}

/// Matches `value` against `pattern`, where `*` stands for any run of
/// characters and everything else is literal. The whole value must match.
#[must_use]
pub fn wildcard_match(pattern: &str, value: &str) -> bool {
    if pattern == value {
        return true;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = value.chars().collect();

    let (mut p, mut v) = (0, 0);
    // Position of the last `*` seen and the value index it was tried at.
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, v));
            p += 1;
        } else if p < pattern.len() && pattern[p] == value[v] {
            p += 1;
            v += 1;
        } else if let Some((star, tried)) = backtrack {
            p = star + 1;
            v = tried + 1;
            backtrack = Some((star, v));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}
