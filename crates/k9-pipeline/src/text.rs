//! Query text normalisation and keyword matching
//!
//! Matching runs on lowercased text with Spanish accents folded, so
//! "Energía" and "energia" are the same keyword. Short or ambiguous
//! keywords are declared as [`Keyword::Word`] and match whole tokens only
//! ("hi" must not match "chile", "mina" must not match "determinar").

use serde::Serialize;

/// A keyword in a rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Keyword {
    /// Matches a whole token
    Word(&'static str),
    /// Matches anywhere in the text
    Phrase(&'static str),
}

impl Keyword {
    /// Keyword text
    #[inline]
    #[must_use]
    pub fn text(&self) -> &'static str {
        match self {
            Keyword::Word(t) | Keyword::Phrase(t) => t,
        }
    }
}

/// Normalised query text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryText {
    text: String,
    words: Vec<String>,
}

impl QueryText {
    /// Normalise raw input
    #[must_use]
    pub fn new(raw: &str) -> Self {
        let text = fold(raw.trim());
        let words = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect();
        Self { text, words }
    }

    /// Normalised text
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether a single keyword matches
    #[must_use]
    pub fn matches(&self, keyword: &Keyword) -> bool {
        match keyword {
            Keyword::Word(w) => self.words.iter().any(|t| t == w),
            Keyword::Phrase(p) => self.text.contains(p),
        }
    }

    /// First keyword of `keywords` that matches
    #[must_use]
    pub fn first_match(&self, keywords: &[Keyword]) -> Option<Keyword> {
        keywords.iter().copied().find(|k| self.matches(k))
    }

    /// Whether any keyword matches
    #[inline]
    #[must_use]
    pub fn contains_any(&self, keywords: &[Keyword]) -> bool {
        self.first_match(keywords).is_some()
    }
}

/// Lowercase and fold Spanish diacritics; `ñ` is kept
#[must_use]
pub fn fold(raw: &str) -> String {
    raw.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            other => other,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_accents_and_case() {
        assert_eq!(fold("¿Qué PASARÍA si?"), "¿que pasaria si?");
        assert_eq!(fold("Mantención Ñandú"), "mantencion ñandu");
    }

    #[test]
    fn word_keywords_need_whole_tokens() {
        let q = QueryText::new("¿Cuál es la capital de Chile?");
        assert!(!q.matches(&Keyword::Word("hi")));
        assert!(q.matches(&Keyword::Phrase("hi")));
        assert!(q.matches(&Keyword::Word("chile")));
    }

    #[test]
    fn phrase_keywords_match_substrings() {
        let q = QueryText::new("Los riesgos de caída");
        assert!(q.matches(&Keyword::Phrase("riesgo")));
        assert!(q.matches(&Keyword::Phrase("caida")));
        assert_eq!(
            q.first_match(&[Keyword::Word("riesgo"), Keyword::Phrase("riesgo")]),
            Some(Keyword::Phrase("riesgo"))
        );
    }
}
