//! Regex fallback entity extraction.
//!
//! Used when the generative analyzer returns no usable entity map: scans the
//! OCR text for emails, phone numbers, monetary amounts, and dates. Model
//! output is preferred; this keeps the entity panel populated when the model
//! answer cannot be parsed.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}\b").unwrap());

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b\d{3}[-.]?\d{3}[-.]?\d{4}\b").unwrap());

static AMOUNT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\$\s?\d+(?:,\d{3})*(?:\.\d{2})?|\d+(?:,\d{3})*(?:\.\d{2})?\s?(?:USD|EUR|GBP|INR)")
        .unwrap()
});

static DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b|\b(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)[a-z]* \d{1,2},? \d{4}\b",
    )
    .unwrap()
});

/// Extract entity categories from raw text. Categories with no matches are
/// omitted entirely (no empty lists).
pub fn fallback_entities(text: &str) -> BTreeMap<String, Vec<String>> {
    let mut entities = BTreeMap::new();

    add_matches(&mut entities, "emails", &EMAIL_RE, text);
    // Amounts before phones: a phone-shaped digit run inside an amount should
    // not be double counted, and the amount pattern is the narrower one.
    add_matches(&mut entities, "amounts", &AMOUNT_RE, text);
    add_matches(&mut entities, "phone_numbers", &PHONE_RE, text);
    add_matches(&mut entities, "dates", &DATE_RE, text);

    entities
}

fn add_matches(entities: &mut BTreeMap<String, Vec<String>>, category: &str, re: &Regex, text: &str) {
    let values: Vec<String> = re.find_iter(text).map(|m| m.as_str().to_string()).collect();
    if !values.is_empty() {
        entities.insert(category.to_string(), values);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_email() {
        let entities = fallback_entities("Send the invoice to billing@acme.com today");
        assert_eq!(entities["emails"], vec!["billing@acme.com"]);
    }

    #[test]
    fn extracts_amount_and_date() {
        let entities = fallback_entities("Paid $1,250.00 on 03/14/2025");
        assert_eq!(entities["amounts"], vec!["$1,250.00"]);
        assert_eq!(entities["dates"], vec!["03/14/2025"]);
    }

    #[test]
    fn extracts_phone_number() {
        let entities = fallback_entities("Call 555-867-5309 for support");
        assert_eq!(entities["phone_numbers"], vec!["555-867-5309"]);
    }

    #[test]
    fn extracts_written_date() {
        let entities = fallback_entities("Signed on March 14, 2025 by the tenant");
        assert_eq!(entities["dates"], vec!["March 14, 2025"]);
    }

    #[test]
    fn empty_categories_are_omitted() {
        let entities = fallback_entities("no structured content here");
        assert!(entities.is_empty());
    }
}
