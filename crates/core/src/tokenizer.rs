//! Text tokenizer used by the hashing embedder
//!
//! Pipeline: UAX#29 word boundaries -> strip possessives -> remove non-alphanumeric
//!           -> lowercase -> filter tokens shorter than 2 characters

use unicode_segmentation::UnicodeSegmentation;

/// Strip English possessive suffix (`'s` / `\u{2019}s`).
#[inline]
fn strip_possessive(word: &str) -> &str {
    word.strip_suffix("'s")
        .or_else(|| word.strip_suffix("\u{2019}s"))
        .unwrap_or(word)
}

/// Tokenize text into terms
///
/// # Example
///
/// ```
/// use vectormap_core::tokenizer::tokenize;
///
/// let tokens = tokenize("Hello, World!");
/// assert_eq!(tokens, vec!["hello", "world"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words()
        .map(strip_possessive)
        .map(|w| {
            w.chars()
                .filter(|c| c.is_alphanumeric())
                .collect::<String>()
        })
        .map(|w| w.to_lowercase())
        .filter(|s| s.chars().count() >= 2)
        .collect()
}

/// Character trigrams of a token, with `^`/`$` boundary markers
///
/// `"time"` yields `^ti`, `tim`, `ime`, `me$`.
pub fn trigrams(token: &str) -> Vec<String> {
    let chars: Vec<char> = std::iter::once('^')
        .chain(token.chars())
        .chain(std::iter::once('$'))
        .collect();
    chars.windows(3).map(|w| w.iter().collect()).collect()
}
