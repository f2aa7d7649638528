//! Knowledge snapshot schema and validation.
//!
//! A snapshot is the parsed knowledge document. It is immutable once built
//! and replaced wholesale on refresh.

use pitlane_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// The authoritative fact base.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeSnapshot {
    pub site: SiteInfo,
    pub hours: Vec<OpeningHours>,
    pub tracks: Vec<Track>,
    pub equipment: Equipment,
    pub sessions: SessionRules,
    #[serde(default)]
    pub pricing: Vec<PriceEntry>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
    pub hints: Vec<Hint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteInfo {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub urls: SiteUrls,
}

/// Canonical pages for each fact category. Missing pages fall back to the base URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteUrls {
    pub booking: Option<String>,
    pub manage_booking: Option<String>,
    pub tracks: Option<String>,
    pub hours: Option<String>,
    pub pricing: Option<String>,
    pub faq: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpeningHours {
    /// Day or day range, e.g. "Monday" or "Mon-Fri"
    pub days: String,
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    /// Stable slot value, e.g. "mile_end"
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    pub address: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub schedule: Vec<ScheduleEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub day: String,
    pub details: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Equipment {
    #[serde(default)]
    pub items: Vec<EquipmentItem>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentItem {
    pub name: String,
    pub description: String,
}

/// Ticket and session rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRules {
    #[serde(default)]
    pub laps_per_session: Option<u32>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub min_age: Option<u32>,
    #[serde(default)]
    pub min_height_cm: Option<u32>,
    #[serde(default)]
    pub rules: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceEntry {
    pub name: String,
    pub amount: f64,
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Promotion {
    pub id: String,
    pub title: String,
    pub details: String,
    #[serde(default)]
    pub valid_until: Option<String>,
}

/// A canned answer for a well-known sub-topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hint {
    pub topic: String,
    pub keywords: Vec<String>,
    pub answer: String,
    #[serde(default)]
    pub url: Option<String>,
}

impl KnowledgeSnapshot {
    /// Parse and validate a snapshot document.
    ///
    /// Malformed or structurally incomplete documents are rejected wholesale.
    pub fn parse(body: &str) -> AppResult<Self> {
        let snapshot: KnowledgeSnapshot = serde_json::from_str(body)
            .map_err(|e| AppError::SourceSync(format!("Malformed knowledge document: {}", e)))?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check the structural requirements serde cannot express.
    pub fn validate(&self) -> AppResult<()> {
        let fail = |msg: String| -> AppResult<()> { Err(AppError::SourceSync(msg)) };

        if self.site.name.trim().is_empty() || self.site.base_url.trim().is_empty() {
            return fail("site.name and site.baseUrl are required".to_string());
        }
        if self.hours.is_empty() {
            return fail("hours section is empty".to_string());
        }
        if self.tracks.is_empty() {
            return fail("at least one track is required".to_string());
        }

        let mut seen = HashSet::new();
        for track in &self.tracks {
            if track.id.trim().is_empty() || track.name.trim().is_empty() {
                return fail("every track needs an id and a name".to_string());
            }
            if !seen.insert(track.id.as_str()) {
                return fail(format!("duplicate track id '{}'", track.id));
            }
        }

        let mut seen = HashSet::new();
        for hint in &self.hints {
            if hint.topic.trim().is_empty() || hint.answer.trim().is_empty() {
                return fail("every hint needs a topic and an answer".to_string());
            }
            if hint.keywords.iter().all(|k| k.trim().is_empty()) {
                return fail(format!("hint '{}' has no keywords", hint.topic));
            }
            if !seen.insert(hint.topic.as_str()) {
                return fail(format!("duplicate hint topic '{}'", hint.topic));
            }
        }

        let mut seen = HashSet::new();
        for promotion in &self.promotions {
            if promotion.id.trim().is_empty() {
                return fail("every promotion needs an id".to_string());
            }
            if !seen.insert(promotion.id.as_str()) {
                return fail(format!("duplicate promotion id '{}'", promotion.id));
            }
        }

        Ok(())
    }

    pub fn track(&self, id: &str) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Resolve a page URL, falling back to the site base URL.
    pub fn url_or_base(&self, url: Option<&String>) -> String {
        url.cloned().unwrap_or_else(|| self.site.base_url.clone())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// A complete, valid knowledge document used across the crate's tests.
    pub const SAMPLE: &str = include_str!("../../../demos/knowledge.json");
}
