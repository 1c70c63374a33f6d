//! Chunk segmenter: splits a page's text into one fragment per match using
//! the scraped player's own name tag as the delimiter.
//!
//! Two surface forms exist:
//! - `Jessica WangF | WA, USA` (no age)
//! - `Olivia Wisner26 | F | USA` (with age)
//!
//! A partner or opponent with exactly the same display name would also split
//! the page; nothing in the flattened text distinguishes them.

use regex::Regex;
use tracing::debug;

/// Which of the two name-tag forms a page uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterForm {
    WithoutAge,
    WithAge,
}

/// A compiled player delimiter for one page.
#[derive(Debug, Clone)]
pub struct Delimiter {
    pub form: DelimiterForm,
    pub gender: char,
    pattern: Regex,
}

impl Delimiter {
    fn compile(player_name: &str, gender: char, form: DelimiterForm) -> Option<Self> {
        let name = regex::escape(player_name);
        let source = match form {
            DelimiterForm::WithoutAge => format!(r"{name}{gender} \| "),
            DelimiterForm::WithAge => format!(r"{name}\d+\s*\|\s*{gender}\s*\|"),
        };
        match Regex::new(&source) {
            Ok(pattern) => Some(Self {
                form,
                gender,
                pattern,
            }),
            Err(e) => {
                debug!("Cannot build delimiter for {:?}: {}", player_name, e);
                None
            }
        }
    }

    /// Find the delimiter a page uses. Genders are tried `F` then `M`, and for
    /// each the no-age form before the age form; the first hit decides for
    /// the whole page.
    pub fn detect(text: &str, player_name: &str) -> Option<Self> {
        for gender in ['F', 'M'] {
            for form in [DelimiterForm::WithoutAge, DelimiterForm::WithAge] {
                if let Some(delimiter) = Self::compile(player_name, gender, form) {
                    if delimiter.pattern.is_match(text) {
                        return Some(delimiter);
                    }
                }
            }
        }
        None
    }

    /// Split on every occurrence, dropping the text before the first one.
    pub fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        self.pattern.split(text).skip(1).collect()
    }
}

/// Fragments of `text` in rendered order. A page without the player's name
/// tag yields no fragments.
pub fn segment<'a>(text: &'a str, player_name: &str) -> Vec<&'a str> {
    match Delimiter::detect(text, player_name) {
        Some(delimiter) => {
            let fragments = delimiter.split(text);
            debug!(
                "Delimiter {:?}/{} produced {} fragments",
                delimiter.form,
                delimiter.gender,
                fragments.len()
            );
            fragments
        }
        None => Vec::new(),
    }
}
