//! Parsers for rendered rating-history pages.
//!
//! Pipeline per page: desktop text -> fragments -> parsed fragment ->
//! reconciled ratings and scores -> validated match.

pub mod fragment;
pub mod page;
pub mod ratings;
pub mod scores;
pub mod segment;
pub mod validate;

pub use fragment::parse_fragment;
pub use page::extract_page_text;
pub use ratings::RatingLayout;
pub use segment::segment;
pub use validate::{validate, Rejection};

use tracing::{debug, warn};

use crate::types::StructuredMatch;

/// Result of parsing one page.
#[derive(Debug, Clone, Default)]
pub struct PageParse {
    pub matches: Vec<StructuredMatch>,
    pub fragments: usize,
    pub rejections: Vec<Rejection>,
}

/// Parser for one player's rating-history pages.
pub struct MatchParser;

impl MatchParser {
    /// Parse a rendered page (HTML or already-flattened text).
    pub fn parse_page(html: &str, player_name: &str) -> PageParse {
        let text = extract_page_text(html);
        Self::parse_text(&text, player_name)
    }

    /// Parse flattened page text. Pure: identical input gives identical output.
    pub fn parse_text(text: &str, player_name: &str) -> PageParse {
        let fragments = segment(text, player_name);
        let mut result = PageParse {
            fragments: fragments.len(),
            ..Default::default()
        };

        for fragment in fragments {
            let parsed = parse_fragment(fragment);
            match validate(&parsed, player_name) {
                Ok(m) => result.matches.push(m),
                Err(rejection) => {
                    if let Rejection::Ratings(RatingLayout::Unrecognized) = rejection {
                        warn!(
                            "Unrecognized rating layout ({} tokens) for {}",
                            parsed.ratings.len(),
                            player_name
                        );
                    } else {
                        debug!("Dropped fragment: {:?}", rejection);
                    }
                    result.rejections.push(rejection);
                }
            }
        }

        result
    }
}
