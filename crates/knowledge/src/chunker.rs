//! Snapshot to chunk decomposition.
//!
//! Category order is fixed: site, hours, tracks (each followed by its
//! schedule), equipment, sessions, pricing, promotions, hints. Within a
//! category the document order is kept.

use crate::snapshot::{KnowledgeSnapshot, Track};
use crate::types::Chunk;

/// Deterministic chunk extractor.
#[derive(Debug, Clone)]
pub struct ChunkExtractor {
    currency_symbol: String,
}

impl Default for ChunkExtractor {
    fn default() -> Self {
        Self::new("£")
    }
}

impl ChunkExtractor {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Decompose a snapshot into chunks with stable ids.
    pub fn extract(&self, snapshot: &KnowledgeSnapshot) -> Vec<Chunk> {
        let urls = &snapshot.site.urls;
        let mut chunks = Vec::new();

        chunks.push(Chunk {
            id: "site".to_string(),
            text: site_text(snapshot),
            source_url: snapshot.site.base_url.clone(),
        });

        let hours = snapshot
            .hours
            .iter()
            .map(|h| {
                let mut line = format!("{} {}-{}", h.days, h.open, h.close);
                if let Some(ref note) = h.note {
                    line.push_str(&format!(" ({})", note));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("; ");
        chunks.push(Chunk {
            id: "hours".to_string(),
            text: format!("Opening hours: {}.", hours),
            source_url: snapshot.url_or_base(urls.hours.as_ref()),
        });

        for track in &snapshot.tracks {
            let url = snapshot.url_or_base(track.url.as_ref().or(urls.tracks.as_ref()));
            chunks.push(Chunk {
                id: format!("track:{}", track.id),
                text: track_text(track),
                source_url: url.clone(),
            });

            if !track.schedule.is_empty() {
                let entries = track
                    .schedule
                    .iter()
                    .map(|s| format!("{}: {}", s.day, s.details))
                    .collect::<Vec<_>>()
                    .join("; ");
                chunks.push(Chunk {
                    id: format!("track:{}:schedule", track.id),
                    text: format!("{} schedule. {}.", track.name, entries),
                    source_url: url,
                });
            }
        }

        let equipment = &snapshot.equipment;
        if !equipment.items.is_empty() || equipment.notes.is_some() {
            let mut text = String::from("Equipment.");
            for item in &equipment.items {
                text.push_str(&format!(" {}: {}.", item.name, item.description));
            }
            if let Some(ref notes) = equipment.notes {
                text.push(' ');
                text.push_str(notes);
            }
            chunks.push(Chunk {
                id: "equipment".to_string(),
                text,
                source_url: snapshot.url_or_base(urls.faq.as_ref()),
            });
        }

        chunks.push(Chunk {
            id: "sessions".to_string(),
            text: sessions_text(snapshot),
            source_url: snapshot.url_or_base(urls.booking.as_ref()),
        });

        if !snapshot.pricing.is_empty() {
            let prices = snapshot
                .pricing
                .iter()
                .map(|p| {
                    let mut line = format!("{} {}{:.2}", p.name, self.currency_symbol, p.amount);
                    if let Some(track) = p.track.as_deref().and_then(|id| snapshot.track(id)) {
                        line.push_str(&format!(" at {}", track.name));
                    }
                    if let Some(ref notes) = p.notes {
                        line.push_str(&format!(" ({})", notes));
                    }
                    line
                })
                .collect::<Vec<_>>()
                .join("; ");
            chunks.push(Chunk {
                id: "pricing".to_string(),
                text: format!("Prices: {}.", prices),
                source_url: snapshot.url_or_base(urls.pricing.as_ref()),
            });
        }

        for promotion in &snapshot.promotions {
            let mut text = format!("Offer: {}. {}", promotion.title, promotion.details);
            if let Some(ref until) = promotion.valid_until {
                text.push_str(&format!(" Valid until {}.", until));
            }
            chunks.push(Chunk {
                id: format!("promotion:{}", promotion.id),
                text,
                source_url: snapshot.url_or_base(urls.pricing.as_ref()),
            });
        }

        for hint in &snapshot.hints {
            chunks.push(Chunk {
                id: format!("hint:{}", hint.topic),
                text: hint.answer.clone(),
                source_url: snapshot.url_or_base(hint.url.as_ref().or(urls.faq.as_ref())),
            });
        }

        chunks
    }
}

fn site_text(snapshot: &KnowledgeSnapshot) -> String {
    let site = &snapshot.site;
    let mut text = site.name.clone();
    if let Some(ref description) = site.description {
        text.push_str(&format!(". {}", description));
    }
    text.push_str(&format!(
        ". Tracks: {}.",
        snapshot
            .tracks
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    ));
    if let Some(ref phone) = site.phone {
        text.push_str(&format!(" Phone: {}.", phone));
    }
    if let Some(ref email) = site.email {
        text.push_str(&format!(" Email: {}.", email));
    }
    text
}

fn track_text(track: &Track) -> String {
    let mut text = format!("{} track", track.name);
    if !track.aliases.is_empty() {
        text.push_str(&format!(" (also known as {})", track.aliases.join(", ")));
    }
    text.push_str(&format!(", {}.", track.address));
    if let Some(ref description) = track.description {
        text.push(' ');
        text.push_str(description);
    }
    text
}

fn sessions_text(snapshot: &KnowledgeSnapshot) -> String {
    let rules = &snapshot.sessions;
    let mut parts = Vec::new();
    if let Some(laps) = rules.laps_per_session {
        parts.push(format!("{} laps per session", laps));
    }
    if let Some(minutes) = rules.duration_minutes {
        parts.push(format!("sessions last {} minutes", minutes));
    }
    if let Some(age) = rules.min_age {
        parts.push(format!("minimum age {}", age));
    }
    if let Some(height) = rules.min_height_cm {
        parts.push(format!("minimum height {} cm", height));
    }
    parts.extend(rules.rules.iter().cloned());

    if parts.is_empty() {
        "Session rules: none published.".to_string()
    } else {
        format!("Session rules: {}.", parts.join("; "))
    }
}
