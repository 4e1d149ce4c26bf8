//! Structured data extraction from HTML pages.
//!
//! Markup is an unstable oracle: any structural mismatch is reported as a
//! [`SiteError::Parse`] so the calling check degrades to an error status.

use scraper::{ElementRef, Html, Selector};

use super::SiteError;

/// Rows of a table, header row first, each row an ordered list of cell texts.
pub type Table = Vec<Vec<String>>;

/// Selectors tried, in order, when looking for booking cards.
const BOOKING_CARD_SELECTORS: &[&str] = &[".booking", ".card"];

/// Parse the first `<table>` in `html`.
///
/// Every `<tr>` becomes a row of its `<th>`/`<td>` children's trimmed text,
/// so the header row is row 0. Rows belonging to tables nested inside the
/// first table are not flattened into it.
pub fn extract_table(html: &str) -> Result<Table, SiteError> {
    let document = Html::parse_document(html);
    let table_selector = selector("table")?;
    let row_selector = selector("tr")?;

    let table = document
        .select(&table_selector)
        .next()
        .ok_or_else(|| SiteError::Parse("no <table> element found in page".to_string()))?;

    let rows = table
        .select(&row_selector)
        .filter(|row| owning_table(row).is_some_and(|owner| owner.id() == table.id()))
        .map(|row| {
            row.child_elements()
                .filter(|cell| matches!(cell.value().name(), "th" | "td"))
                .map(|cell| element_text(&cell))
                .collect()
        })
        .collect();

    Ok(rows)
}

/// A booking as rendered on the trips listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingCard {
    /// Whitespace-normalised text content of the card.
    pub text: String,
}

impl BookingCard {
    /// Whether every fragment occurs somewhere in the card text.
    pub fn mentions(&self, fragments: &[&str]) -> bool {
        fragments
            .iter()
            .all(|fragment| self.text.contains(fragment.trim()))
    }
}

/// Parse booking cards from the trips listing page.
///
/// Cards are the elements matching `.booking`; pages that only use the generic
/// `.card` class are accepted as a fallback. A page with neither yields no cards.
pub fn extract_booking_cards(html: &str) -> Result<Vec<BookingCard>, SiteError> {
    let document = Html::parse_document(html);

    for css in BOOKING_CARD_SELECTORS {
        let card_selector = selector(css)?;
        let cards: Vec<BookingCard> = document
            .select(&card_selector)
            .map(|card| BookingCard {
                text: normalize_whitespace(&card.text().collect::<Vec<_>>().join(" ")),
            })
            .collect();
        if !cards.is_empty() {
            return Ok(cards);
        }
    }

    Ok(Vec::new())
}

fn selector(css: &str) -> Result<Selector, SiteError> {
    Selector::parse(css).map_err(|e| SiteError::Parse(format!("invalid selector {css}: {e:?}")))
}

fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Nearest `<table>` ancestor of an element.
fn owning_table<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|ancestor| ancestor.value().name() == "table")
}
