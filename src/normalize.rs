use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::model::Fragment;
use crate::options::ReplacementTable;

/// Punctuation artifacts the OCR stage emits around ruling lines.
pub const DEFAULT_NOISE_TOKENS: &[&str] = &[
    "|", "||", "-", "--", "=", "==", "_", "[", "]", "(", ")", "{", "}", "~", "—", "–",
];

static NUMERIC_TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^-?(?:[0-9]{1,4},[0-9]{2}|[0-9]+|[0-9]+\.[0-9]+)$")
        .expect("hardcoded numeric regex is valid")
});

/// Structural classification of a fragment or a cell's joined text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellKind {
    Numeric,
    /// Two or more numbers sharing one cell.
    MultiNumeric,
    Header,
    Noise,
}

impl CellKind {
    #[must_use]
    pub const fn is_value(self) -> bool {
        matches!(self, Self::Numeric | Self::MultiNumeric)
    }
}

/// Strict numeric grammar: optional `-`, then `1589,10`-style European
/// decimals, bare digits, or `12.5`-style decimals. ASCII digits only.
#[must_use]
pub fn is_numeric_token(token: &str) -> bool {
    NUMERIC_TOKEN_RE.is_match(token.trim())
}

/// True when every whitespace-separated token is numeric.
#[must_use]
pub fn is_numeric_content(text: &str) -> bool {
    let mut tokens = text.split_whitespace().peekable();
    tokens.peek().is_some() && tokens.all(is_numeric_token)
}

fn is_unsigned_number(token: &str) -> bool {
    !token.starts_with('-') && is_numeric_token(token)
}

/// A fragment after cleanup, carrying its canonical text and kind.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedFragment {
    pub text: String,
    pub kind: CellKind,
    pub source: Fragment,
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    replacements: ReplacementTable,
    noise: BTreeSet<String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new(ReplacementTable::default(), &[])
    }
}

impl Normalizer {
    #[must_use]
    pub fn new(replacements: ReplacementTable, extra_noise: &[String]) -> Self {
        let noise = DEFAULT_NOISE_TOKENS
            .iter()
            .map(|token| (*token).to_string())
            .chain(extra_noise.iter().cloned())
            .collect();
        Self {
            replacements,
            noise,
        }
    }

    fn is_noise_token(&self, token: &str) -> bool {
        self.noise.contains(token) || token.chars().all(|ch| ch.is_ascii_punctuation())
    }

    /// Trims, applies the replacement table and drops noise tokens. Returns
    /// `None` when nothing meaningful is left.
    ///
    /// A standalone `-` directly before an unsigned number is its sign, so
    /// `"- 35,00"` becomes `"-35,00"` rather than losing the `-` as noise.
    #[must_use]
    pub fn canonical_text(&self, raw: &str) -> Option<String> {
        let trimmed = raw.trim();
        if let Some(replacement) = self.replacements.get(trimmed) {
            return Some(replacement.to_string()).filter(|text| !text.is_empty());
        }

        let mut tokens = trimmed
            .split_whitespace()
            .map(|token| self.replacements.get(token).unwrap_or(token))
            .peekable();
        let mut kept = Vec::new();
        while let Some(token) = tokens.next() {
            if token == "-" {
                if let Some(number) = tokens.next_if(|next| is_unsigned_number(next)) {
                    kept.push(format!("-{number}"));
                    continue;
                }
            }
            if !self.is_noise_token(token) {
                kept.push(token.to_string());
            }
        }
        Some(kept.join(" ")).filter(|text| !text.is_empty())
    }

    /// A header must be non-empty, non-numeric, longer than one character and
    /// not a noise token.
    #[must_use]
    pub fn qualifies_as_header(&self, text: &str) -> bool {
        let text = text.trim();
        !text.is_empty()
            && text.chars().count() > 1
            && !is_numeric_content(text)
            && !self.is_noise_token(text)
    }

    #[must_use]
    pub fn classify(&self, text: &str) -> CellKind {
        if is_numeric_token(text) {
            CellKind::Numeric
        } else if is_numeric_content(text) {
            CellKind::MultiNumeric
        } else if self.qualifies_as_header(text) {
            CellKind::Header
        } else {
            CellKind::Noise
        }
    }

    /// Cleans every fragment and drops the ones that classify as noise.
    #[must_use]
    pub fn normalize_all(&self, fragments: &[Fragment]) -> Vec<NormalizedFragment> {
        fragments
            .iter()
            .filter_map(|fragment| {
                let Some(text) = self.canonical_text(&fragment.text) else {
                    debug!(raw = %fragment.text, page = fragment.page, "dropping empty fragment");
                    return None;
                };
                let kind = self.classify(&text);
                if kind == CellKind::Noise {
                    debug!(raw = %fragment.text, page = fragment.page, "dropping noise fragment");
                    return None;
                }
                Some(NormalizedFragment {
                    text,
                    kind,
                    source: fragment.clone(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::{CellKind, Normalizer, is_numeric_content, is_numeric_token};
    use crate::model::{BBox, Fragment};
    use crate::options::ReplacementTable;

    #[test]
    fn numeric_grammar_accepts_three_forms() {
        for token in ["1589,10", "21,00", "-35,00", "42", "0012", "12.75", "-3.5"] {
            assert!(is_numeric_token(token), "{token} should be numeric");
        }
    }

    #[test]
    fn numeric_grammar_rejects_near_misses() {
        for token in ["12345,67", "1,5", "1,500,00", "12.", ".5", "Q1", "1.2.3", "-", ""] {
            assert!(!is_numeric_token(token), "{token} should not be numeric");
        }
    }

    #[test]
    fn numeric_grammar_is_ascii_digits_only() {
        let fullwidth = "\u{ff11}\u{ff12}";
        let arabic_indic = "\u{0661}\u{0662}";
        let devanagari = "\u{0967}\u{0968},\u{0966}\u{0966}";
        for token in [fullwidth, arabic_indic, devanagari] {
            assert!(!is_numeric_token(token), "{token} should not be numeric");
        }
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.classify(fullwidth), CellKind::Header);
    }

    #[test]
    fn detached_minus_sign_stays_with_its_number() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.canonical_text("- 35,00"), Some("-35,00".to_string()));
        assert_eq!(normalizer.classify("-35,00"), CellKind::Numeric);
        assert_eq!(
            normalizer.canonical_text("| - 12 - 7"),
            Some("-12 -7".to_string())
        );
        assert_eq!(normalizer.canonical_text("35,00 -"), Some("35,00".to_string()));
        assert_eq!(normalizer.canonical_text("- Net"), Some("Net".to_string()));
        assert_eq!(normalizer.canonical_text("- -4"), Some("-4".to_string()));
        assert_eq!(normalizer.canonical_text("-"), None);
    }

    #[test]
    fn multi_number_text_is_numeric_content_only() {
        assert!(is_numeric_content("135,40 1589,10"));
        assert!(!is_numeric_content("Total 35,00"));
        assert!(!is_numeric_content("   "));
    }

    #[test]
    fn replacement_table_runs_before_classification() {
        let table = ReplacementTable::from_str("Colt=Col1,Col2h=Col2B").expect("table parses");
        let normalizer = Normalizer::new(table, &[]);

        assert_eq!(normalizer.canonical_text("  Colt "), Some("Col1".to_string()));
        assert_eq!(
            normalizer.canonical_text("Net Col2h"),
            Some("Net Col2B".to_string())
        );
    }

    #[test]
    fn noise_tokens_are_stripped_from_text() {
        let normalizer = Normalizer::default();
        assert_eq!(normalizer.canonical_text("| Revenue |"), Some("Revenue".to_string()));
        assert_eq!(normalizer.canonical_text("=="), None);
        assert_eq!(normalizer.canonical_text("[ ]"), None);
    }

    #[test]
    fn header_qualification_rules() {
        let normalizer = Normalizer::new(ReplacementTable::default(), &["xx".to_string()]);
        assert!(normalizer.qualifies_as_header("Q1"));
        assert!(!normalizer.qualifies_as_header("A"));
        assert!(!normalizer.qualifies_as_header("21,00"));
        assert!(!normalizer.qualifies_as_header("xx"));
        assert!(!normalizer.qualifies_as_header("||"));
        assert!(!normalizer.qualifies_as_header(""));
    }

    #[test]
    fn classify_and_drop_noise_fragments() {
        let normalizer = Normalizer::default();
        let bbox = BBox::new(0.0, 0.0, 10.0, 10.0);
        let fragments = vec![
            Fragment::new("Revenue", bbox),
            Fragment::new("|", bbox),
            Fragment::new("x", bbox),
            Fragment::new("21,00", bbox),
        ];

        let normalized = normalizer.normalize_all(&fragments);
        let kinds = normalized
            .iter()
            .map(|fragment| (fragment.text.as_str(), fragment.kind))
            .collect::<Vec<_>>();
        assert_eq!(
            kinds,
            vec![("Revenue", CellKind::Header), ("21,00", CellKind::Numeric)]
        );
    }
}
