//! Keyword-based intent classification.
//!
//! Rules are checked in table order against the lower-cased message; the
//! first rule with a keyword contained in the message wins. Messages that
//! match nothing are `general`.

use tracing::debug;

use crate::domain::models::{default_keyword_rules, Classification, IntentLabel, KeywordRule};

/// Stateless classifier over a priority-ordered keyword table
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<KeywordRule>,
}

impl IntentClassifier {
    /// Classifier over `rules`; keywords are normalised to lower case and blanks dropped
    pub fn new(rules: Vec<KeywordRule>) -> Self {
        let rules = rules
            .into_iter()
            .map(|rule| KeywordRule {
                label: rule.label,
                keywords: rule
                    .keywords
                    .iter()
                    .map(|k| k.trim().to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect(),
            })
            .collect();
        Self { rules }
    }

    /// The normalised rule table
    pub fn rules(&self) -> &[KeywordRule] {
        &self.rules
    }

    /// Label and matching keyword for `message`
    pub fn classify(&self, message: &str) -> Classification {
        let lowered = message.to_lowercase();
        let classification = self
            .rules
            .iter()
            .find_map(|rule| {
                rule.keywords
                    .iter()
                    .find(|keyword| lowered.contains(keyword.as_str()))
                    .map(|keyword| Classification {
                        label: rule.label,
                        matched: Some(keyword.clone()),
                    })
            })
            .unwrap_or_else(Classification::general);

        debug!(
            label = %classification.label,
            matched = classification.matched.as_deref().unwrap_or("-"),
            "Classified message"
        );
        classification
    }

    /// Label only
    pub fn label(&self, message: &str) -> IntentLabel {
        self.classify(message).label
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(default_keyword_rules())
    }
}
