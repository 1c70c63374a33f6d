//! Match fragment parser.
//!
//! A fragment is the concatenated text of one match row with no reliable
//! separators, e.g.
//! `WA, USADec 12, 20244.1230.0524.175Megan FoxF | CA, USA3.980-0.0203.960...10>116`.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::OnceLock;

/// Win/loss marker recovered from the sentinel characters around the score run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// `<games>0` `>` `<digits>`, e.g. `10>116` is one game won
    Win { games_won: u32, digits: String },
    /// `<digits>` `<` `<digits>` `<` `<digits>`
    Loss { digits: String },
    Unknown,
}

impl Outcome {
    /// Pick the outcome from a fragment. The two-sentinel loss form is tested
    /// first since it is the more specific one.
    pub fn detect(text: &str) -> Self {
        if let Some(caps) = loss_re().captures(text) {
            return Outcome::Loss {
                digits: caps[1].to_string(),
            };
        }
        if let Some(caps) = win_re().captures(text) {
            return Outcome::Win {
                games_won: caps[1].parse().unwrap_or(0),
                digits: caps[2].to_string(),
            };
        }
        Outcome::Unknown
    }

    /// Score digit run, already in (this team, opponent) order.
    pub fn digits(&self) -> Option<&str> {
        match self {
            Outcome::Win { digits, .. } | Outcome::Loss { digits } => Some(digits),
            Outcome::Unknown => None,
        }
    }
}

/// Everything pulled out of a single fragment before reconciliation.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedMatch {
    pub date: Option<NaiveDate>,
    pub ratings: Vec<f64>,
    pub changes: Vec<f64>,
    pub participant_names: Vec<String>,
    pub outcome: Outcome,
}

impl ParsedMatch {
    pub fn score_digits(&self) -> Option<&str> {
        self.outcome.digits()
    }
}

fn date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+(\d{1,2}),\s+(\d{4})")
            .expect("date pattern")
    })
}

fn name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"([A-Z][a-z]+(?:-[A-Z][a-z]+)?(?:\s[A-Z][a-z]+(?:-[A-Z][a-z]+)?)?)\s*(?:\d+\s*\|\s*)?[FM]\s*\|",
        )
            .expect("name pattern")
    })
}

fn rating_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-?\d\.\d{3}").expect("rating pattern"))
}

fn decrease_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"-\d\.\d{3}").expect("decrease pattern"))
}

fn loss_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+<\d+<(\d+)").expect("loss pattern"))
}

fn win_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d)\d>(\d+)").expect("win pattern"))
}

fn month_number(abbrev: &str) -> Option<u32> {
    const MONTHS: [&str; 12] = [
        "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
    ];
    MONTHS
        .iter()
        .position(|m| *m == abbrev)
        .map(|i| i as u32 + 1)
}

/// First `Mon D, YYYY` token in the fragment.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let caps = date_re().captures(text)?;
    let month = month_number(&caps[1])?;
    let day: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Up to three names tagged with a gender marker: partner, opponent 1,
/// opponent 2.
pub fn parse_names(text: &str) -> Vec<String> {
    name_re()
        .captures_iter(text)
        .take(3)
        .map(|caps| caps[1].to_string())
        .collect()
}

fn parse_numbers(re: &Regex, text: &str) -> Vec<f64> {
    re.find_iter(text)
        .filter_map(|m| m.as_str().parse().ok())
        .collect()
}

/// Parse one fragment. Never fails: missing pieces are left empty and judged
/// by the validator.
pub fn parse_fragment(text: &str) -> ParsedMatch {
    ParsedMatch {
        date: parse_date(text),
        ratings: parse_numbers(rating_re(), text),
        changes: parse_numbers(decrease_re(), text),
        participant_names: parse_names(text),
        outcome: Outcome::detect(text),
    }
}
