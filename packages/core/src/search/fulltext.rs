//! Full-Text Tokenization
//!
//! Text is decomposed (NFD), stripped of combining marks and lowercased, then
//! split on every non-alphanumeric character. `Sindelfingen-Ärger` becomes
//! `sindelfingen`, `arger`.
//!
//! Email addresses additionally yield the whole address, the local part and the
//! domain, so `Info@Example.org` matches `info@example.org`, `info`,
//! `example.org`, `example` and `org`.

use std::collections::HashMap;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Lowercase, diacritics-free form of a text
pub fn normalize(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Split normalized text into tokens
pub fn tokenize(text: &str) -> Vec<String> {
    normalize(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Tokens of an email address, including the address parts
pub fn tokenize_email(address: &str) -> Vec<String> {
    let normalized = normalize(address.trim());
    let mut tokens = tokenize(&normalized);
    if let Some((local, domain)) = normalized.split_once('@') {
        tokens.push(normalized.clone());
        if !local.is_empty() {
            tokens.push(local.to_string());
        }
        if !domain.is_empty() {
            tokens.push(domain.to_string());
        }
    }
    tokens
}

/// Term frequencies of one translation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TermIndex {
    terms: HashMap<String, u32>,
}

impl TermIndex {
    pub fn add_text(&mut self, text: &str) {
        self.add_tokens(tokenize(text));
    }

    pub fn add_tokens(&mut self, tokens: impl IntoIterator<Item = String>) {
        for token in tokens {
            *self.terms.entry(token).or_insert(0) += 1;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Frequency of a query term; a trailing `*` matches by prefix
    pub fn frequency(&self, term: &QueryTerm) -> u32 {
        match term {
            QueryTerm::Exact(term) => self.terms.get(term).copied().unwrap_or(0),
            QueryTerm::Prefix(prefix) => self
                .terms
                .iter()
                .filter(|(token, _)| token.starts_with(prefix.as_str()))
                .map(|(_, count)| *count)
                .sum(),
        }
    }

    /// Score of a full-text query: the summed term frequencies when every term
    /// occurs, `None` otherwise
    pub fn score(&self, terms: &[QueryTerm]) -> Option<f32> {
        if terms.is_empty() {
            return None;
        }
        let mut score = 0u32;
        for term in terms {
            let frequency = self.frequency(term);
            if frequency == 0 {
                return None;
            }
            score += frequency;
        }
        Some(score as f32)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryTerm {
    Exact(String),
    Prefix(String),
}

/// Parse a full-text query into terms
///
/// Each whitespace separated word is tokenized like indexed text; a word ending
/// in `*` turns its last token into a prefix term.
pub fn parse_query(query: &str) -> Vec<QueryTerm> {
    let mut terms = Vec::new();
    for word in query.split_whitespace() {
        let is_prefix = word.ends_with('*');
        let mut tokens = tokenize(word.trim_end_matches('*'));
        let last = tokens.pop();
        terms.extend(tokens.into_iter().map(QueryTerm::Exact));
        if let Some(last) = last {
            terms.push(if is_prefix {
                QueryTerm::Prefix(last)
            } else {
                QueryTerm::Exact(last)
            });
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_folds_case_and_diacritics() {
        assert_eq!(
            tokenize("Sindelfingen-Ärger, CAFÉ!"),
            vec!["sindelfingen", "arger", "cafe"]
        );
    }

    #[test]
    fn test_email_parts_are_tokens() {
        let tokens = tokenize_email("Info@Example.org");
        for expected in ["info@example.org", "info", "example.org", "example", "org"] {
            assert!(tokens.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_all_terms_must_occur() {
        let mut index = TermIndex::default();
        index.add_text("The quick brown fox, the end");

        assert_eq!(index.score(&parse_query("the fox")), Some(3.0));
        assert_eq!(index.score(&parse_query("the wolf")), None);
    }

    #[test]
    fn test_prefix_terms() {
        let mut index = TermIndex::default();
        index.add_text("Sindelfingen");

        assert!(index.score(&parse_query("sindel*")).is_some());
        assert!(index.score(&parse_query("sindel")).is_none());
    }

    #[test]
    fn test_empty_query_matches_nothing() {
        let mut index = TermIndex::default();
        index.add_text("anything");
        assert_eq!(index.score(&parse_query("  ,, ")), None);
    }
}
