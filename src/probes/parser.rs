//! Parsing of raw probe responses into confidence, hedging and refusal
//! signals.

use std::sync::OnceLock;

use regex::Regex;

/// Signals extracted from a single probe response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    /// None when the response carries no CONFIDENCE marker.
    pub confidence: Option<f64>,
    pub hedging_score: f64,
    pub is_refusal: bool,
}

fn confidence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)CONFIDENCE\s*:?\s*(\d{1,3})").unwrap())
}

fn hedging_patterns() -> &'static Vec<(Regex, f64)> {
    static PATTERNS: OnceLock<Vec<(Regex, f64)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)\bi don'?t know\b", 1.0),
            (r"(?i)\bi'?m not sure\b", 0.9),
            (r"(?i)\boutside my\b", 0.95),
            (r"(?i)\bbeyond my\b", 0.95),
            (r"(?i)\bi believe\b", 0.4),
            (r"(?i)\bi think\b", 0.3),
            (r"(?i)\bapproximately\b", 0.2),
            (r"(?i)\bprobably\b", 0.3),
            (r"(?i)\bmight\b", 0.25),
        ]
        .into_iter()
        .map(|(pattern, weight)| (Regex::new(pattern).unwrap(), weight))
        .collect()
    })
}

fn refusal_patterns() -> &'static Vec<Regex> {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\bi (?:don'?t|do not) (?:have (?:enough )?(?:information|knowledge)|know)\b",
            r"(?i)\b(?:outside|beyond) my (?:\w+ (?:of )?)?(?:expertise|scope|knowledge|area)\b",
            r"(?i)\bi'?m not (?:a )?(?:qualified|able|the right|equipped)\b",
            r"(?i)\bi (?:can'?t|cannot) (?:reliably|confidently|provide|offer|help with)\b",
            r"(?i)\b(?:not|isn'?t|aren'?t) (?:within )?my (?:\w+ (?:of )?)?(?:expertise|scope|knowledge|area|domain)\b",
            r"(?i)\bi (?:strongly )?recommend consulting\b",
            r"(?i)\bplease consult (?:a|an|with|your)\b",
        ]
        .into_iter()
        .map(|pattern| Regex::new(pattern).unwrap())
        .collect()
    })
}

/// Extracts confidence, hedging and refusal signals from a raw response.
pub fn parse_probe_response(raw: &str) -> ParsedResponse {
    let mut result = ParsedResponse::default();

    if let Some(captures) = confidence_re().captures(raw)
        && let Ok(value) = captures[1].parse::<f64>()
    {
        result.confidence = Some(value.min(100.0));
    }

    let text_lower = raw.to_lowercase();

    let mut max_hedging = 0.0f64;
    for (pattern, weight) in hedging_patterns() {
        if *weight > max_hedging && pattern.is_match(&text_lower) {
            max_hedging = *weight;
        }
    }
    result.hedging_score = max_hedging;

    result.is_refusal = refusal_patterns().iter().any(|p| p.is_match(&text_lower));

    result
}
