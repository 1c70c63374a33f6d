//! Rendered page to flat text.
//!
//! The rating history is rendered twice: a desktop table inside
//! `div.hidden.md:block` and a mobile card list. Only the desktop copy is
//! kept so every match is seen once.

use scraper::{ElementRef, Html, Selector};

/// Marker the mobile layout puts before its first match.
const PROCESSED_MARKER: &str = "Processed";

fn is_desktop_region(elem: &ElementRef) -> bool {
    let mut has_hidden = false;
    let mut has_md_block = false;
    for class in elem.value().classes() {
        match class {
            "hidden" => has_hidden = true,
            "md:block" => has_md_block = true,
            _ => {}
        }
    }
    has_hidden && has_md_block
}

/// Concatenate all descendant text nodes, with no separators.
fn flat_text(elem: ElementRef) -> String {
    elem.text().collect::<String>()
}

/// Extract the text the segmenter works on.
///
/// Prefers the first desktop region holding a `table`, then the first desktop
/// region, then the whole document.
pub fn extract_page_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let div_selector = Selector::parse("div").expect("div selector");
    let table_selector = Selector::parse("table").expect("table selector");

    let desktop: Vec<ElementRef> = document
        .select(&div_selector)
        .filter(is_desktop_region)
        .collect();

    let text = desktop
        .iter()
        .find(|section| section.select(&table_selector).next().is_some())
        .or_else(|| desktop.first())
        .map(|section| flat_text(*section))
        .unwrap_or_else(|| flat_text(document.root_element()));

    match text.find(PROCESSED_MARKER) {
        Some(idx) => text[idx..].to_string(),
        None => text,
    }
}
