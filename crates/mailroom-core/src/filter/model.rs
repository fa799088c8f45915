//! Filter rule data model.

use serde::{Deserialize, Serialize};

/// What the host application does with a matched message.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterAction {
    /// Matching is recorded, nothing else happens.
    #[default]
    None,
    /// The message is not imported.
    Skip,
    /// The message is filed into a folder.
    #[serde(rename_all = "camelCase")]
    MoveToFolder {
        /// Target folder id.
        folder_id: String,
    },
}

impl FilterAction {
    /// Parse from the stored action name, with the folder for `moveToFolder`.
    #[must_use]
    pub fn parse(s: &str, folder_id: Option<&str>) -> Self {
        match (s.to_lowercase().as_str(), folder_id) {
            ("skip", _) => Self::Skip,
            ("movetofolder", Some(folder)) if !folder.is_empty() => Self::MoveToFolder {
                folder_id: folder.to_string(),
            },
            _ => Self::None,
        }
    }
}

/// A user-defined predicate over incoming messages.
///
/// Empty strings are treated as unset.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterRule {
    /// Record id.
    pub id: Option<String>,
    /// Display name.
    pub name: Option<String>,
    /// Sender address pattern.
    pub from: Option<String>,
    /// Recipient address pattern.
    pub to: Option<String>,
    /// Subject pattern.
    pub subject: Option<String>,
    /// Phrases searched for in the body.
    pub body_contains: Vec<String>,
    /// Action on match.
    pub action: FilterAction,
}

impl FilterRule {
    /// Creates a rule with no criteria.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the sender pattern.
    #[must_use]
    pub fn with_from(mut self, pattern: impl Into<String>) -> Self {
        self.from = Some(pattern.into());
        self
    }

    /// Sets the recipient pattern.
    #[must_use]
    pub fn with_to(mut self, pattern: impl Into<String>) -> Self {
        self.to = Some(pattern.into());
        self
    }

    /// Sets the subject pattern.
    #[must_use]
    pub fn with_subject(mut self, pattern: impl Into<String>) -> Self {
        self.subject = Some(pattern.into());
        self
    }

    /// Adds a body phrase.
    #[must_use]
    pub fn with_body_phrase(mut self, phrase: impl Into<String>) -> Self {
        self.body_contains.push(phrase.into());
        self
    }

    /// Sets the action.
    #[must_use]
    pub fn with_action(mut self, action: FilterAction) -> Self {
        self.action = action;
        self
    }

    /// Sender pattern, if set and non-empty.
    #[must_use]
    pub fn from_pattern(&self) -> Option<&str> {
        non_empty(self.from.as_deref())
    }

    /// Recipient pattern, if set and non-empty.
    #[must_use]
    pub fn to_pattern(&self) -> Option<&str> {
        non_empty(self.to.as_deref())
    }

    /// Subject pattern, if set and non-empty.
    #[must_use]
    pub fn subject_pattern(&self) -> Option<&str> {
        non_empty(self.subject.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_action_parse() {
        assert_eq!(FilterAction::parse("Skip", None), FilterAction::Skip);
        assert_eq!(
            FilterAction::parse("moveToFolder", Some("f1")),
            FilterAction::MoveToFolder {
                folder_id: "f1".into()
            }
        );
        assert_eq!(FilterAction::parse("moveToFolder", None), FilterAction::None);
        assert_eq!(FilterAction::parse("", None), FilterAction::None);
    }

    #[test]
    fn test_empty_patterns_are_unset() {
        let rule = FilterRule::new().with_from("").with_subject("Invoice*");
        assert_eq!(rule.from_pattern(), None);
        assert_eq!(rule.subject_pattern(), Some("Invoice*"));
    }

    #[test]
    fn test_rule_json() {
        let rule: FilterRule = serde_json::from_str(
            r#"{"from":"*@example.com","bodyContains":["unsubscribe"],
                "action":{"type":"moveToFolder","folderId":"promo"}}"#,
        )
        .unwrap();
        assert_eq!(rule.from_pattern(), Some("*@example.com"));
        assert_eq!(rule.body_contains, vec!["unsubscribe"]);
        assert_eq!(
            rule.action,
            FilterAction::MoveToFolder {
                folder_id: "promo".into()
            }
        );
    }
}
