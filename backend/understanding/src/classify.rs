//! Keyword document classifier.
//!
//! Produces the type hint fed to the analyzer prompt. The analyzer's own
//! classification wins when it answers; this only has to be cheap and local.

const RECEIPT_KEYWORDS: &[&str] = &["receipt", "total", "tax", "payment", "invoice"];
const FORM_KEYWORDS: &[&str] = &["form", "application", "signature", "date of birth"];
const LETTER_KEYWORDS: &[&str] = &["letter", "dear", "sincerely", "regards"];

/// Word-count threshold below which unclassified text is treated as a note.
const NOTE_MAX_WORDS: usize = 50;

pub fn classify_keywords(text: &str) -> &'static str {
    if text.trim().is_empty() {
        return "unknown";
    }
    let lower = text.to_lowercase();

    if RECEIPT_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "receipt"
    } else if FORM_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "form"
    } else if LETTER_KEYWORDS.iter().any(|k| lower.contains(k)) {
        "letter"
    } else if text.split_whitespace().count() < NOTE_MAX_WORDS {
        "note"
    } else {
        "document"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_receipt() {
        assert_eq!(classify_keywords("Subtotal 40.00 Tax 5.00 Total 45.00"), "receipt");
    }

    #[test]
    fn classifies_letter() {
        assert_eq!(classify_keywords("Dear Ms. Okafor, thank you for writing."), "letter");
    }

    #[test]
    fn classifies_form() {
        assert_eq!(classify_keywords("Application for permit. Signature: ____"), "form");
    }

    #[test]
    fn short_unmatched_text_is_a_note() {
        assert_eq!(classify_keywords("pick up milk"), "note");
    }

    #[test]
    fn long_unmatched_text_is_a_document() {
        let long = "word ".repeat(60);
        assert_eq!(classify_keywords(&long), "document");
    }

    #[test]
    fn empty_text_is_unknown() {
        assert_eq!(classify_keywords("   "), "unknown");
    }
}
