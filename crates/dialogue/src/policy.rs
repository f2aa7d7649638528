//! Dialogue policy: fast routes, slot filling and clarifying questions.

use crate::session::Slots;
use crate::topic::{contains_phrase, words, Topic, TopicClassifier};
use crate::types::SourceRef;
use chrono::{Datelike, Duration as ChronoDuration, NaiveDate, Weekday};
use pitlane_core::config::DialogueSettings;
use pitlane_knowledge::KnowledgeSnapshot;

/// Slot state. The day only matters for the configured day track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    NoTrack,
    TrackKnownDayUnknown,
    FullyResolved,
}

/// What to do with a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Canned answer from the snapshot.
    FastAnswer { text: String, sources: Vec<SourceRef> },
    /// Ask for a missing slot before answering.
    Clarify { question: String },
    /// Retrieve context and generate.
    Generate,
}

pub struct DialoguePolicy {
    classifier: TopicClassifier,
    day_track: String,
}

const WEEKDAYS: &[(Weekday, &[&str])] = &[
    (Weekday::Mon, &["monday", "mon"]),
    (Weekday::Tue, &["tuesday", "tue", "tues"]),
    (Weekday::Wed, &["wednesday", "wed"]),
    (Weekday::Thu, &["thursday", "thu", "thur", "thurs"]),
    (Weekday::Fri, &["friday", "fri"]),
    (Weekday::Sat, &["saturday", "sat"]),
    (Weekday::Sun, &["sunday", "sun"]),
];

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

impl DialoguePolicy {
    pub fn new(settings: &DialogueSettings) -> Self {
        Self {
            classifier: TopicClassifier::new(settings),
            day_track: settings.day_track.clone(),
        }
    }

    pub fn classify(&self, query: &str, snapshot: &KnowledgeSnapshot) -> Topic {
        self.classifier.classify(query, snapshot)
    }

    /// Track and day values named in `query`.
    ///
    /// Track names and aliases come from the snapshot; the first track in
    /// document order that is mentioned wins. "today" and "tomorrow" resolve
    /// against `today`.
    pub fn extract_slots(&self, query: &str, snapshot: &KnowledgeSnapshot, today: NaiveDate) -> Slots {
        let query_words = words(query);

        let track = snapshot
            .tracks
            .iter()
            .find(|track| {
                let id_name = track.id.replace('_', " ");
                std::iter::once(track.name.as_str())
                    .chain(track.aliases.iter().map(String::as_str))
                    .chain(std::iter::once(id_name.as_str()))
                    .any(|name| contains_phrase(&query_words, &words(name)))
            })
            .map(|track| track.id.clone());

        let day = query_words.iter().find_map(|w| match w.as_str() {
            "today" => Some(today.weekday()),
            "tomorrow" => Some((today + ChronoDuration::days(1)).weekday()),
            other => WEEKDAYS
                .iter()
                .find(|(_, names)| names.contains(&other))
                .map(|(day, _)| *day),
        });

        Slots {
            track,
            day: day.map(|d| weekday_name(d).to_string()),
        }
    }

    pub fn state(&self, slots: &Slots) -> SlotState {
        match (&slots.track, &slots.day) {
            (None, _) => SlotState::NoTrack,
            (Some(track), None) if *track == self.day_track => SlotState::TrackKnownDayUnknown,
            _ => SlotState::FullyResolved,
        }
    }

    /// Update `slots` from `query` and pick a route.
    pub fn decide(
        &self,
        query: &str,
        slots: &mut Slots,
        snapshot: &KnowledgeSnapshot,
        today: NaiveDate,
    ) -> Route {
        slots.merge(self.extract_slots(query, snapshot, today));

        let topic = self.classify(query, snapshot);
        let state = self.state(slots);
        tracing::debug!("Topic {:?}, slots {:?} ({:?})", topic, slots, state);

        if topic.is_fast_route() {
            if let Some(route) = fast_answer(&topic, snapshot) {
                return route;
            }
        }

        if topic.needs_disambiguation() {
            match state {
                SlotState::NoTrack => {
                    return Route::Clarify {
                        question: track_question(snapshot),
                    }
                }
                SlotState::TrackKnownDayUnknown => {
                    let name = slots
                        .track
                        .as_deref()
                        .and_then(|id| snapshot.track(id))
                        .map(|t| t.name.as_str())
                        .unwrap_or("that track");
                    return Route::Clarify {
                        question: format!(
                            "Which day would you like to visit {}? Sessions there change through the week.",
                            name
                        ),
                    };
                }
                SlotState::FullyResolved => {}
            }
        }

        Route::Generate
    }
}

fn fast_answer(topic: &Topic, snapshot: &KnowledgeSnapshot) -> Option<Route> {
    let urls = &snapshot.site.urls;
    match topic {
        Topic::Venues => {
            let count = snapshot.tracks.len();
            let mut text = format!(
                "{} has {} {}:\n",
                snapshot.site.name,
                count,
                if count == 1 { "track" } else { "tracks" }
            );
            let mut sources = Vec::new();
            for track in &snapshot.tracks {
                text.push_str(&format!("\n- **{}**: {}", track.name, track.address));
                sources.push(SourceRef {
                    id: format!("track:{}", track.id),
                    url: snapshot.url_or_base(track.url.as_ref().or(urls.tracks.as_ref())),
                });
            }
            text.push_str(&format!(
                "\n\nMore details: {}",
                snapshot.url_or_base(urls.tracks.as_ref())
            ));
            Some(Route::FastAnswer { text, sources })
        }
        Topic::ManageTickets => {
            let manage = snapshot.url_or_base(urls.manage_booking.as_ref());
            let text = format!(
                "You can change, cancel or resend your tickets from the booking management page: {}",
                manage
            );
            Some(Route::FastAnswer {
                text,
                sources: vec![SourceRef {
                    id: "site".to_string(),
                    url: manage,
                }],
            })
        }
        Topic::Hint(topic_id) => {
            let hint = snapshot.hints.iter().find(|h| &h.topic == topic_id)?;
            let url = snapshot.url_or_base(hint.url.as_ref().or(urls.faq.as_ref()));
            Some(Route::FastAnswer {
                text: format!("{}\n\nMore details: {}", hint.answer, url),
                sources: vec![SourceRef {
                    id: format!("hint:{}", hint.topic),
                    url,
                }],
            })
        }
        _ => None,
    }
}

fn track_question(snapshot: &KnowledgeSnapshot) -> String {
    let names: Vec<&str> = snapshot.tracks.iter().map(|t| t.name.as_str()).collect();
    let listed = match names.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} or {}", rest.join(", "), last),
        Some((last, _)) => last.to_string(),
        None => String::new(),
    };
    format!("Which track would you like to visit: {}?", listed)
}
