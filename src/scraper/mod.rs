//! Rating-history scraper for pickleball.com
//!
//! Provides browser rendering, page parsing, and the page iteration loop.

pub mod browser;
pub mod pagination;
pub mod parsers;
pub mod rate_limiter;

pub use browser::{Browser, BrowserOptions};
pub use pagination::{PageIterator, PageLimits, StopReason};
pub use parsers::MatchParser;
pub use rate_limiter::RateLimiter;

/// Base URL for pickleball.com
pub const BASE_URL: &str = "https://pickleball.com";

/// Build a player's rating history URL from their slug
pub fn rating_history_url(slug: &str) -> String {
    format!("{}/players/{}/rating-history", BASE_URL, slug)
}

/// Player slug from a profile URL, e.g. `jessica-wang` from
/// `https://pickleball.com/players/jessica-wang/rating-history?current_page=2`.
pub fn player_slug(url: &str) -> Option<&str> {
    let (_, rest) = url.split_once("/players/")?;
    let slug = rest.split(['/', '?', '#']).next()?;
    (!slug.is_empty()).then_some(slug)
}

/// Display name as the site renders it: `jessica-wang` -> `Jessica Wang`.
pub fn player_display_name(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// URL for one page of a player's history (1-based), replacing any query.
pub fn page_url(player_url: &str, page: u32) -> String {
    let base = player_url.split('?').next().unwrap_or(player_url);
    format!("{}?current_page={}", base, page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_slug() {
        assert_eq!(
            player_slug("https://pickleball.com/players/jessica-wang/rating-history"),
            Some("jessica-wang")
        );
        assert_eq!(
            player_slug("https://pickleball.com/players/olivia-wisner?current_page=3"),
            Some("olivia-wisner")
        );
        assert_eq!(player_slug("https://pickleball.com/rankings"), None);
        assert_eq!(player_slug("https://pickleball.com/players/"), None);
    }

    #[test]
    fn test_player_display_name() {
        assert_eq!(player_display_name("jessica-wang"), "Jessica Wang");
        assert_eq!(player_display_name("MICHAEL-maldazys"), "Michael Maldazys");
        assert_eq!(player_display_name("cher"), "Cher");
    }

    #[test]
    fn test_page_url() {
        let url = "https://pickleball.com/players/jessica-wang/rating-history";
        assert_eq!(page_url(url, 1), format!("{}?current_page=1", url));
        assert_eq!(
            page_url(&format!("{}?current_page=9", url), 2),
            format!("{}?current_page=2", url)
        );
    }

    #[test]
    fn test_rating_history_url() {
        assert_eq!(
            rating_history_url("thomas-yu"),
            "https://pickleball.com/players/thomas-yu/rating-history"
        );
    }
}
