//! Ordered text transforms applied to generated answers.

use regex::Regex;
use std::sync::OnceLock;

/// A single pure text transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Remove a code fence wrapping the whole reply.
    StripCodeFence,
    /// Remove HTML tags, keeping their text.
    StripHtml,
    /// Rewrite `$`, `€`, `USD`, `EUR`, `GBP` amounts to the given symbol.
    NormalizeCurrency(String),
    /// Trim surrounding whitespace.
    Trim,
}

impl Transform {
    pub fn apply(&self, text: &str) -> String {
        match self {
            Transform::StripCodeFence => strip_code_fence(text),
            Transform::StripHtml => match html_tag() {
                Some(re) => re.replace_all(text, "").into_owned(),
                None => text.to_string(),
            },
            Transform::NormalizeCurrency(symbol) => match currency() {
                Some(re) => re
                    .replace_all(text, |caps: &regex::Captures| format!("{}{}", symbol, &caps["amount"]))
                    .into_owned(),
                None => text.to_string(),
            },
            Transform::Trim => text.trim().to_string(),
        }
    }
}

/// Transforms run in order; each sees the previous one's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    transforms: Vec<Transform>,
}

impl Pipeline {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    /// Fence, HTML, currency, trim.
    pub fn standard(currency_symbol: &str) -> Self {
        Self::new(vec![
            Transform::StripCodeFence,
            Transform::StripHtml,
            Transform::NormalizeCurrency(currency_symbol.to_string()),
            Transform::Trim,
        ])
    }

    pub fn apply(&self, text: &str) -> String {
        self.transforms
            .iter()
            .fold(text.to_string(), |acc, t| t.apply(&acc))
    }
}

fn strip_code_fence(text: &str) -> String {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return text.to_string();
    };
    let Some(inner) = rest.strip_suffix("```") else {
        return text.to_string();
    };
    // Drop the language tag on the opening line, if any.
    match inner.split_once('\n') {
        Some((first, body)) if !first.trim().contains(' ') => body.to_string(),
        _ => inner.to_string(),
    }
}

fn html_tag() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"</?[A-Za-z][A-Za-z0-9]*(?:\s[^<>]*)?/?>").ok())
        .as_ref()
}

fn currency() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:[$€]|\b(?:USD|EUR|GBP)\s?)(?P<amount>\d[\d,]*(?:\.\d+)?)").ok()
    })
    .as_ref()
}
