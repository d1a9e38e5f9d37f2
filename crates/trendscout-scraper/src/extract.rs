//! Trend extraction from a rendered trends page.
//!
//! The page markup is not under our control, so extraction is a cascade of
//! strategies with one signature, each less specific than the one before.
//! The first strategy that yields anything wins. Each table row contributes
//! at most one title and ranks follow extraction order, starting at 1.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};
use serde::Serialize;
use trendscout_core::ScrapedTrend;

use crate::error::ScrapeError;

/// Canonical row body of the trends table.
pub const CANONICAL_BODY_SELECTOR: &str = r#"tbody[jsname="cC57zf"]"#;
/// Any rendered trend row.
pub const ROW_SELECTOR: &str = "tr[jsname]";

/// Class fragment carried by the title element.
const TITLE_MARKER: &str = "mZ3RIc";
/// Class fragment carried by metadata (volume, age) elements.
const METADATA_MARKER: &str = "Rz403";

/// Fragments that identify volume, age or window labels rather than titles.
const NOISE_PATTERNS: [&str; 5] = ["ago", "searches", "24h", "48h", "7d"];

/// Page-wide selectors tried in order when the canonical rows yield nothing.
pub const FALLBACK_SELECTORS: [&str; 5] = [
    r#"table tr[jsname] td:nth-child(2) div[class*="mZ3RIc"]"#,
    r#"table tr[jsname] td:nth-child(2) div:not([class*="Rz403"])"#,
    "tr[jsname] td:nth-child(2) div",
    r#"table tr td div[class*="mZ3RIc"]"#,
    "tbody tr td:nth-child(2) div",
];

static CANONICAL_BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CANONICAL_BODY_SELECTOR).expect("valid body selector"));
static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(ROW_SELECTOR).expect("valid row selector"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(&format!(r#"div[class*="{TITLE_MARKER}"]"#)).expect("valid title selector")
});
static DIV: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div").expect("valid div selector"));
static FALLBACKS: LazyLock<Vec<(&'static str, Selector)>> = LazyLock::new(|| {
    FALLBACK_SELECTORS
        .iter()
        .map(|s| (*s, Selector::parse(s).expect("valid fallback selector")))
        .collect()
});

// ---------------------------------------------------------------------------
// Trace
// ---------------------------------------------------------------------------

/// Why a canonical row produced no title.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowSkip {
    /// 0-based position among the canonical rows.
    pub row: usize,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectorAttempt {
    pub selector: &'static str,
    pub matched: usize,
    pub accepted: usize,
}

/// Structured diagnostic trail of one extraction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionTrace {
    /// Name of the strategy that produced the titles, if any did.
    pub strategy: Option<&'static str>,
    pub canonical_body_found: bool,
    pub rows_inspected: usize,
    /// Rows where the marker element was missing and the text scan was used.
    pub rows_scanned: usize,
    pub skipped: Vec<RowSkip>,
    pub selector_attempts: Vec<SelectorAttempt>,
}

/// Extracted trends plus the trail that produced them.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction {
    pub trends: Vec<ScrapedTrend>,
    pub trace: ExtractionTrace,
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

type StrategyFn = fn(&Html, usize, &mut ExtractionTrace) -> Vec<String>;

const STRATEGIES: [(&str, StrategyFn); 2] = [
    ("canonical_rows", canonical_rows),
    ("selector_fallback", selector_fallback),
];

/// Runs the strategy cascade over `html`, returning at most `limit` titles
/// in page order.
#[must_use]
pub fn extract_titles(html: &str, limit: usize) -> (Vec<String>, ExtractionTrace) {
    let document = Html::parse_document(html);
    let mut trace = ExtractionTrace::default();
    if limit == 0 {
        return (Vec::new(), trace);
    }

    for (name, strategy) in STRATEGIES {
        let titles = strategy(&document, limit, &mut trace);
        if !titles.is_empty() {
            trace.strategy = Some(name);
            return (titles, trace);
        }
    }
    (Vec::new(), trace)
}

/// Extracts ranked trends for one scrape.
///
/// # Errors
///
/// Returns [`ScrapeError::NoData`] when every strategy comes up empty.
pub fn extract_trends(
    html: &str,
    limit: usize,
    country: &str,
    time_range: &str,
    scraped_at: DateTime<Utc>,
) -> Result<Extraction, ScrapeError> {
    let (titles, trace) = extract_titles(html, limit);
    if titles.is_empty() {
        tracing::debug!(?trace, "no strategy produced trends");
        return Err(ScrapeError::NoData);
    }

    let trends = (1u32..)
        .zip(titles)
        .map(|(rank, title)| ScrapedTrend {
            rank,
            title,
            country: country.to_owned(),
            time_range: time_range.to_owned(),
            scraped_at,
        })
        .collect();
    Ok(Extraction { trends, trace })
}

/// Canonical rows: the title marker inside each row's second cell, falling
/// back to the first plausible text in that cell.
fn canonical_rows(document: &Html, limit: usize, trace: &mut ExtractionTrace) -> Vec<String> {
    let Some(body) = document.select(&CANONICAL_BODY).next() else {
        return Vec::new();
    };
    trace.canonical_body_found = true;

    let mut titles = Vec::new();
    for (index, row) in body.select(&ROW).enumerate() {
        if titles.len() >= limit {
            break;
        }
        trace.rows_inspected += 1;
        match title_from_row(row, trace) {
            Ok(title) => titles.push(title),
            Err(reason) => trace.skipped.push(RowSkip { row: index, reason }),
        }
    }
    titles
}

fn title_from_row(
    row: ElementRef<'_>,
    trace: &mut ExtractionTrace,
) -> Result<String, &'static str> {
    let cell = row
        .children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "td")
        .nth(1)
        .ok_or("missing second cell")?;

    if let Some(title) = cell
        .select(&TITLE)
        .map(element_text)
        .find(|text| !text.is_empty())
    {
        return Ok(title);
    }

    trace.rows_scanned += 1;
    cell.select(&DIV)
        .find(|div| qualifies(*div))
        .map(element_text)
        .ok_or("no qualifying text in second cell")
}

/// Page-wide selectors, first one with an accepted match wins.
fn selector_fallback(document: &Html, limit: usize, trace: &mut ExtractionTrace) -> Vec<String> {
    for (selector_text, selector) in FALLBACKS.iter() {
        let mut seen_rows = HashSet::new();
        let mut titles = Vec::new();
        let mut matched = 0;

        for element in document.select(selector) {
            matched += 1;
            if titles.len() >= limit {
                continue;
            }
            let row_key = element
                .ancestors()
                .find(|node| node.value().as_element().is_some_and(|el| el.name() == "tr"))
                .map_or_else(|| element.id(), |row| row.id());
            if seen_rows.contains(&row_key) || !qualifies(element) {
                continue;
            }
            seen_rows.insert(row_key);
            titles.push(element_text(element));
        }

        trace.selector_attempts.push(SelectorAttempt {
            selector: *selector_text,
            matched,
            accepted: titles.len(),
        });
        if !titles.is_empty() {
            return titles;
        }
    }
    Vec::new()
}

// ---------------------------------------------------------------------------
// Text helpers
// ---------------------------------------------------------------------------

/// Element text, trimmed, with internal whitespace collapsed.
fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Noise check, case-sensitive substring match.
fn is_noise(text: &str) -> bool {
    NOISE_PATTERNS.iter().any(|pattern| text.contains(pattern))
}

/// Whether an element's text may be a title: longer than two characters,
/// free of noise fragments and not styled as metadata.
fn qualifies(element: ElementRef<'_>) -> bool {
    if element
        .value()
        .attr("class")
        .is_some_and(|class| class.contains(METADATA_MARKER))
    {
        return false;
    }
    let text = element_text(element);
    text.chars().count() > 2 && !is_noise(&text)
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
