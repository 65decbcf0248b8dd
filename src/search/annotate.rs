//! Citation extraction
//!
//! Picks the sentences of a matched resume that mention any query term, so
//! a result can be shown with evidence. Plain substring matching: no
//! stemming and no ranking between terms.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Sentence-ending punctuation followed by whitespace
    static ref SENTENCE_END_RE: Regex = Regex::new(r"[.!?]\s+").unwrap();
}

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone)]
pub struct ResultAnnotator {
    max_snippets: usize,
    fallback_chars: usize,
}

impl ResultAnnotator {
    /// `max_snippets` below 1 is raised to 1.
    pub fn new(max_snippets: usize, fallback_chars: usize) -> Self {
        Self {
            max_snippets: max_snippets.max(1),
            fallback_chars,
        }
    }

    /// Up to `max_snippets` sentences, in document order, that contain any
    /// query term. Falls back to a prefix of the text so the result is
    /// never empty.
    pub fn extract(&self, text: &str, query: &str) -> Vec<String> {
        let query_lower = query.to_lowercase();
        let terms: Vec<&str> = query_lower.split_whitespace().collect();

        let mut citations = Vec::new();
        if !terms.is_empty() {
            for sentence in split_sentences(text) {
                let sentence_lower = sentence.to_lowercase();
                if terms.iter().any(|term| sentence_lower.contains(term)) {
                    citations.push(sentence.trim().to_string());
                    if citations.len() >= self.max_snippets {
                        break;
                    }
                }
            }
        }

        if citations.is_empty() {
            let prefix: String = text.chars().take(self.fallback_chars).collect();
            citations.push(format!("{}{}", prefix, ELLIPSIS));
        }

        citations
    }
}

impl Default for ResultAnnotator {
    fn default() -> Self {
        Self::new(2, 200)
    }
}

/// Split after `.`, `!` or `?` when followed by whitespace. The
/// punctuation stays with its sentence.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for boundary in SENTENCE_END_RE.find_iter(text) {
        // Punctuation is a single ASCII byte
        sentences.push(&text[start..boundary.start() + 1]);
        start = boundary.end();
    }
    if start < text.len() {
        sentences.push(&text[start..]);
    }

    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "Built scalable APIs in Python. Led a team of 5 engineers. Enjoys hiking.";

    #[test]
    fn test_split_sentences() {
        assert_eq!(
            split_sentences("One. Two!  Three?\nFour"),
            vec!["One.", "Two!", "Three?", "Four"]
        );
        assert_eq!(split_sentences("v1.2 release"), vec!["v1.2 release"]);
        assert!(split_sentences("").is_empty());
    }

    #[test]
    fn test_extract_matching_sentences() {
        let annotator = ResultAnnotator::default();
        let citations = annotator.extract(RESUME, "python team");
        assert_eq!(
            citations,
            vec!["Built scalable APIs in Python.", "Led a team of 5 engineers."]
        );
    }

    #[test]
    fn test_extract_stops_at_max_snippets() {
        let annotator = ResultAnnotator::new(1, 200);
        let citations = annotator.extract(RESUME, "python team hiking");
        assert_eq!(citations, vec!["Built scalable APIs in Python."]);
    }

    #[test]
    fn test_extract_case_insensitive_substring() {
        let annotator = ResultAnnotator::default();
        let citations = annotator.extract(RESUME, "HIK");
        assert_eq!(citations, vec!["Enjoys hiking."]);
    }

    #[test]
    fn test_fallback_prefix() {
        let annotator = ResultAnnotator::new(2, 10);
        let citations = annotator.extract(RESUME, "kubernetes");
        assert_eq!(citations, vec!["Built scal..."]);

        let citations = annotator.extract("Short.", "   ");
        assert_eq!(citations, vec!["Short...."]);
    }

    #[test]
    fn test_fallback_is_char_aware() {
        let annotator = ResultAnnotator::new(2, 3);
        let citations = annotator.extract("서울대학교 졸업", "rust");
        assert_eq!(citations, vec!["서울대..."]);
    }

    #[test]
    fn test_extract_idempotent() {
        let annotator = ResultAnnotator::default();
        assert_eq!(
            annotator.extract(RESUME, "engineers hiking"),
            annotator.extract(RESUME, "engineers hiking")
        );
    }
}
