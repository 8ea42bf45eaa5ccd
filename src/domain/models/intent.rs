use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::agent::AgentRole;

/// Intent label assigned to an inbound chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentLabel {
    /// Scheduling, moving or cancelling an exam appointment
    Booking,
    /// Exam fees and payment
    Pricing,
    /// Identification, medical declarations and other paperwork
    Documents,
    /// Theory exam questions
    Theory,
    /// Practical (driving) exam questions
    Practical,
    /// Anything else
    General,
}

impl IntentLabel {
    /// All labels, in default priority order
    pub const ALL: [Self; 6] = [
        Self::Booking,
        Self::Pricing,
        Self::Documents,
        Self::Theory,
        Self::Practical,
        Self::General,
    ];

    /// Specialist agent that answers messages with this intent
    pub const fn target_role(self) -> AgentRole {
        match self {
            Self::Booking => AgentRole::Booking,
            Self::Pricing | Self::Documents | Self::Theory | Self::Practical | Self::General => {
                AgentRole::Search
            }
        }
    }

    /// Returns the label as its wire string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Booking => "booking",
            Self::Pricing => "pricing",
            Self::Documents => "documents",
            Self::Theory => "theory",
            Self::Practical => "practical",
            Self::General => "general",
        }
    }
}

impl fmt::Display for IntentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntentLabel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "booking" => Ok(Self::Booking),
            "pricing" => Ok(Self::Pricing),
            "documents" => Ok(Self::Documents),
            "theory" => Ok(Self::Theory),
            "practical" => Ok(Self::Practical),
            "general" => Ok(Self::General),
            _ => Err(anyhow::anyhow!("Invalid intent label: {s}")),
        }
    }
}

/// One row of the keyword routing table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordRule {
    /// Label returned when any keyword matches
    pub label: IntentLabel,

    /// Keywords, matched as lower-case substrings
    pub keywords: Vec<String>,
}

impl KeywordRule {
    /// Create a rule from string slices
    pub fn new(label: IntentLabel, keywords: &[&str]) -> Self {
        Self {
            label,
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }
}

/// Outcome of classifying a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Winning label
    pub label: IntentLabel,

    /// Keyword that triggered the label, `None` for the default label
    pub matched: Option<String>,
}

impl Classification {
    /// Default classification when no keyword matched
    pub const fn general() -> Self {
        Self {
            label: IntentLabel::General,
            matched: None,
        }
    }
}

/// Default keyword table, highest priority first
pub fn default_keyword_rules() -> Vec<KeywordRule> {
    vec![
        KeywordRule::new(
            IntentLabel::Booking,
            &[
                "boeken",
                "boek ik",
                "ik boek",
                "inplannen",
                "afspraak",
                "annuleren",
                "reserveren",
                "verzetten",
                "omboeken",
                "book",
                "schedule",
                "appointment",
                "cancel",
                "reschedule",
            ],
        ),
        KeywordRule::new(
            IntentLabel::Pricing,
            &["kosten", "kost", "prijs", "tarief", "betalen", "price", "cost", "fee"],
        ),
        KeywordRule::new(
            IntentLabel::Documents,
            &[
                "legitimatie",
                "paspoort",
                "id-kaart",
                "gezondheidsverklaring",
                "eigen verklaring",
                "medisch",
                "document",
                "passport",
                "medical",
            ],
        ),
        KeywordRule::new(
            IntentLabel::Theory,
            &[
                "theorie",
                "verkeersborden",
                "voorrangsregels",
                "theory",
                "traffic sign",
            ],
        ),
        KeywordRule::new(
            IntentLabel::Practical,
            &[
                "praktijk",
                "rijles",
                "rijexamen",
                "examenroute",
                "practical",
                "driving lesson",
                "driving test",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trips_through_str() {
        for label in IntentLabel::ALL {
            assert_eq!(label.as_str().parse::<IntentLabel>().unwrap(), label);
        }
        assert!("unknown".parse::<IntentLabel>().is_err());
    }

    #[test]
    fn test_only_booking_targets_booking_agent() {
        for label in IntentLabel::ALL {
            let expected = if label == IntentLabel::Booking {
                AgentRole::Booking
            } else {
                AgentRole::Search
            };
            assert_eq!(label.target_role(), expected, "label {label}");
        }
    }

    #[test]
    fn test_default_rules_put_booking_first() {
        let rules = default_keyword_rules();
        assert_eq!(rules[0].label, IntentLabel::Booking);
        assert!(rules.iter().all(|r| r.label != IntentLabel::General));
        assert!(rules
            .iter()
            .flat_map(|r| &r.keywords)
            .all(|k| *k == k.to_lowercase()));
    }
}
