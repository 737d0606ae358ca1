//! Deterministic text cleaning applied to both sides of every exchange.

use std::sync::OnceLock;

use regex::Regex;

use crate::vocab::URL_TOKEN;

/// Gendered emoji tails removed verbatim (zero-width joiner + symbol +
/// variation selector).
const MALE_EMOJI_TAIL: &str = "\u{200d}\u{2642}\u{fe0f}";
const FEMALE_EMOJI_TAIL: &str = "\u{200d}\u{2640}\u{fe0f}";

fn numeric_mention_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"@[0-9]+").expect("numeric mention pattern is valid"))
}

fn signature_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\^\w*)+\s*$").expect("signature pattern is valid"))
}

fn part_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\([0-9]/[0-9]\)").expect("part marker pattern is valid"))
}

fn url_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"https?://\S+|www\.\S+").expect("url pattern is valid"))
}

/// Order-sensitive cleaning transform over raw message text.
///
/// The pass canonicalizes whitespace and quote variants, drops the target
/// company mention, numeric `@id` references, trailing agent signatures,
/// gendered emoji tails, and multi-part markers, anonymizes URLs to
/// [`URL_TOKEN`], and collapses the remaining spaces. Any string is
/// accepted; the empty string maps to itself.
#[derive(Debug, Clone)]
pub struct TextNormalizer {
    mention_token: String,
}

impl TextNormalizer {
    /// Creates a normalizer that strips mentions of `target_handle`.
    #[must_use]
    pub fn new(target_handle: &str) -> Self {
        Self {
            mention_token: format!("@{}", target_handle.to_lowercase()),
        }
    }

    /// Cleans `text`, returning the canonical form.
    ///
    /// A single pass can expose a fresh match once a removal joins the
    /// surrounding text (nested part markers, a signature that reaches the
    /// end of the string only after a trailing marker goes away), so the
    /// pass repeats until the string stops changing. The transform is
    /// therefore idempotent: `clean(clean(s)) == clean(s)`.
    #[must_use]
    pub fn clean(&self, text: &str) -> String {
        let mut current = self.clean_pass(text);
        loop {
            let next = self.clean_pass(&current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn clean_pass(&self, text: &str) -> String {
        let canonical: String = text
            .chars()
            .map(|c| match c {
                '\t' | '\n' | '\r' | '\x0b' | '\x0c' | '\u{200b}' | '\u{200d}' => ' ',
                ';' => ',',
                '\u{2018}' | '\u{2019}' | '\u{201c}' | '\u{201d}' | '\u{b4}' | '`' => '\'',
                other => other,
            })
            .collect();
        let unescaped = canonical
            .replace("\\{", "\\(")
            .replace("\\[", "\\(")
            .replace("\\}", "\\)")
            .replace("\\]", "\\)")
            .replace("&amp;", "&")
            .replace(&self.mention_token, "");
        let text = numeric_mention_re().replace_all(&unescaped, "");
        let text = signature_re().replace_all(&text, "");
        let text = text
            .replace(MALE_EMOJI_TAIL, "")
            .replace(FEMALE_EMOJI_TAIL, "");
        let text = part_marker_re().replace_all(&text, "");
        let anonymized = URL_TOKEN.to_string();
        let text = url_re().replace_all(&text, anonymized.as_str());
        collapse_spaces(&text)
    }
}

/// Collapses runs of spaces into a single space and trims surrounding
/// whitespace.
#[must_use]
pub fn collapse_spaces(text: &str) -> String {
    let mut collapsed = String::with_capacity(text.len());
    let mut previous_was_space = false;
    for c in text.chars() {
        if c == ' ' {
            if !previous_was_space {
                collapsed.push(c);
            }
            previous_was_space = true;
        } else {
            collapsed.push(c);
            previous_was_space = false;
        }
    }
    collapsed.trim().to_string()
}
