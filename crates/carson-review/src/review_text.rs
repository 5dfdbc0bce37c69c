//! Free-text classification of review comment bodies.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Closed set of disposition tokens an acknowledgement may carry.
pub enum Disposition {
    Accepted,
    Rejected,
    Deferred,
}

impl Disposition {
    /// Search order used when a body mentions more than one token.
    pub const ALL: [Disposition; 3] = [Self::Accepted, Self::Rejected, Self::Deferred];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Deferred => "deferred",
        }
    }
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
/// Compiled case-insensitive whole-word matchers, kept in configured order.
pub struct RiskKeywords {
    patterns: Vec<(String, Regex)>,
}

impl RiskKeywords {
    pub fn new<I, S>(keywords: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut patterns = Vec::new();
        for keyword in keywords {
            let keyword = keyword.as_ref().trim();
            if keyword.is_empty() {
                continue;
            }
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(keyword)))?;
            patterns.push((keyword.to_string(), pattern));
        }
        Ok(Self { patterns })
    }
}

/// Keywords found in `text`, in configured order.
pub fn matches_risk_keywords<'a>(text: &str, keywords: &'a RiskKeywords) -> Vec<&'a str> {
    keywords
        .patterns
        .iter()
        .filter(|(_, pattern)| pattern.is_match(text))
        .map(|(keyword, _)| keyword.as_str())
        .collect()
}

/// True when `text`, ignoring leading whitespace, starts with `prefix`.
pub fn is_disposition_prefixed(text: &str, prefix: &str) -> bool {
    text.trim_start().starts_with(prefix)
}

#[derive(Debug, Clone)]
/// Compiled disposition token matchers, searched in the order given.
pub struct DispositionTokens {
    patterns: Vec<(Disposition, Regex)>,
}

impl DispositionTokens {
    pub fn new<I>(dispositions: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = Disposition>,
    {
        let mut patterns: Vec<(Disposition, Regex)> = Vec::new();
        for disposition in dispositions {
            if patterns.iter().any(|(known, _)| *known == disposition) {
                continue;
            }
            let pattern = Regex::new(&format!(r"(?i)\b{}\b", disposition.as_str()))?;
            patterns.push((disposition, pattern));
        }
        Ok(Self { patterns })
    }
}

/// First token of `tokens` present in `text` as a whole word, case-insensitively.
pub fn extract_disposition(text: &str, tokens: &DispositionTokens) -> Option<Disposition> {
    tokens
        .patterns
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(disposition, _)| *disposition)
}

/// GitHub URLs referenced in `text`, first-seen order, without trailing
/// sentence punctuation.
pub fn extract_reference_urls(text: &str) -> Vec<String> {
    static URL: OnceLock<Regex> = OnceLock::new();
    let pattern = URL.get_or_init(|| {
        Regex::new(r"https://github\.com/[^\s\)\]]+").expect("github url pattern is valid")
    });
    let mut urls: Vec<String> = Vec::new();
    for found in pattern.find_iter(text) {
        let url = found
            .as_str()
            .trim_end_matches(['.', ',', ';', ':'])
            .to_string();
        if !urls.contains(&url) {
            urls.push(url);
        }
    }
    urls
}
