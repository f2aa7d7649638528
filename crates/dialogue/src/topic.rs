//! Keyword matching and topic classification.

use pitlane_core::config::DialogueSettings;
use pitlane_knowledge::KnowledgeSnapshot;

/// Closed set of question topics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Topic {
    /// Where the tracks are
    Venues,
    /// Changing, cancelling or resending an existing booking
    ManageTickets,
    /// A snapshot hint topic with a canned answer
    Hint(String),
    /// Booking, payment or availability: needs track (and maybe day)
    Booking,
    /// Rules and facts that hold for every track
    General,
    Unmatched,
}

impl Topic {
    /// Topics answered from canned content without retrieval.
    pub fn is_fast_route(&self) -> bool {
        matches!(self, Topic::Venues | Topic::ManageTickets | Topic::Hint(_))
    }

    pub fn needs_disambiguation(&self) -> bool {
        matches!(self, Topic::Booking)
    }
}

/// Lowercased alphanumeric words of `text`.
pub fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// True if `phrase` occurs in `words` as a whole-word sequence.
pub fn contains_phrase(words: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && words.windows(phrase.len()).any(|w| w == phrase)
}

/// A keyword list. Single words match as word prefixes; multi-word
/// entries match as whole-word sequences.
#[derive(Debug, Clone, Default)]
pub struct KeywordSet {
    prefixes: Vec<String>,
    phrases: Vec<Vec<String>>,
}

impl KeywordSet {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::default();
        for keyword in keywords {
            let mut parts = words(keyword.as_ref());
            match parts.len() {
                0 => {}
                1 => set.prefixes.extend(parts.pop()),
                _ => set.phrases.push(parts),
            }
        }
        set
    }

    pub fn matches(&self, words: &[String]) -> bool {
        self.prefixes
            .iter()
            .any(|p| words.iter().any(|w| w.starts_with(p.as_str())))
            || self.phrases.iter().any(|p| contains_phrase(words, p))
    }
}

/// Classifies queries over the closed topic set.
#[derive(Debug, Clone)]
pub struct TopicClassifier {
    venues: KeywordSet,
    tickets: KeywordSet,
    booking: KeywordSet,
    general: KeywordSet,
}

impl TopicClassifier {
    pub fn new(settings: &DialogueSettings) -> Self {
        Self {
            venues: KeywordSet::new(&settings.venue_keywords),
            tickets: KeywordSet::new(&settings.ticket_keywords),
            booking: KeywordSet::new(&settings.booking_keywords),
            general: KeywordSet::new(&settings.general_keywords),
        }
    }

    /// Fast-route topics first (venues, ticket management, hints), then
    /// general over booking.
    pub fn classify(&self, query: &str, snapshot: &KnowledgeSnapshot) -> Topic {
        let words = words(query);

        if self.venues.matches(&words) {
            return Topic::Venues;
        }
        if self.tickets.matches(&words) {
            return Topic::ManageTickets;
        }
        if let Some(hint) = snapshot
            .hints
            .iter()
            .find(|h| KeywordSet::new(&h.keywords).matches(&words))
        {
            return Topic::Hint(hint.topic.clone());
        }
        if self.general.matches(&words) {
            return Topic::General;
        }
        if self.booking.matches(&words) {
            return Topic::Booking;
        }
        Topic::Unmatched
    }
}
