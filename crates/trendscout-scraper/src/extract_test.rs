use chrono::Utc;

use super::*;

fn page(body: &str) -> String {
    format!("<!DOCTYPE html><html><head><title>Trending</title></head><body>{body}</body></html>")
}

/// Rows shaped the way the live page currently renders them.
fn canonical_page(titles: &[&str]) -> String {
    let rows: String = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                r#"<tr jsname="r{i}">
                     <td><div class="check"></div></td>
                     <td>
                       <div class="mZ3RIc">{title}</div>
                       <div class="Rz403">{i}00K+ searches</div>
                       <div class="A7jE4">Started 3 hours ago</div>
                     </td>
                     <td><div>24h</div></td>
                   </tr>"#
            )
        })
        .collect();
    page(&format!(
        r#"<table><thead><tr><th>Trends</th></tr></thead><tbody jsname="cC57zf">{rows}</tbody></table>"#
    ))
}

/// Same rows after the title class was renamed: only the cell scan can
/// find the titles.
fn renamed_marker_page(titles: &[&str]) -> String {
    let rows: String = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                r#"<tr jsname="r{i}">
                     <td><div class="check"></div></td>
                     <td>
                       <div class="Rz403">Active</div>
                       <div class="x1">{i}00K+ searches</div>
                       <div class="x2">7d</div>
                       <div class="x3">{title}</div>
                       <div class="x4">Started 5 hours ago</div>
                     </td>
                   </tr>"#
            )
        })
        .collect();
    page(&format!(
        r#"<table><tbody jsname="cC57zf">{rows}</tbody></table>"#
    ))
}

const TITLES: [&str; 3] = ["India vs Australia", "Stock market today", "Monsoon update"];

#[test]
fn canonical_rows_use_title_marker() {
    let (titles, trace) = extract_titles(&canonical_page(&TITLES), 25);
    assert_eq!(titles, TITLES);
    assert_eq!(trace.strategy, Some("canonical_rows"));
    assert!(trace.canonical_body_found);
    assert_eq!(trace.rows_inspected, 3);
    assert_eq!(trace.rows_scanned, 0);
    assert!(trace.selector_attempts.is_empty());
}

#[test]
fn cell_scan_matches_marker_results() {
    let (primary, _) = extract_titles(&canonical_page(&TITLES), 25);
    let (secondary, trace) = extract_titles(&renamed_marker_page(&TITLES), 25);
    assert_eq!(primary, secondary);
    assert_eq!(trace.strategy, Some("canonical_rows"));
    assert_eq!(trace.rows_scanned, 3);

    let now = Utc::now();
    let a = extract_trends(&canonical_page(&TITLES), 25, "IN", "24h", now).unwrap();
    let b = extract_trends(&renamed_marker_page(&TITLES), 25, "IN", "24h", now).unwrap();
    assert_eq!(a.trends, b.trends);
}

#[test]
fn noise_is_never_selected() {
    let html = page(
        r#"<table><tbody jsname="cC57zf">
             <tr jsname="a"><td></td><td>
               <div>2M+ searches</div><div>Started 2 hours ago</div><div>48h</div><div>Chicago Bears</div>
             </td></tr>
             <tr jsname="b"><td></td><td><div>ok</div><div>Real title</div></td></tr>
           </tbody></table>"#,
    );
    let (titles, trace) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Real title"]);
    assert_eq!(
        trace.skipped,
        vec![RowSkip {
            row: 0,
            reason: "no qualifying text in second cell"
        }]
    );
    for title in &titles {
        for pattern in NOISE_PATTERNS {
            assert!(!title.contains(pattern), "{title} contains {pattern}");
        }
    }
}

#[test]
fn malformed_rows_are_skipped_not_fatal() {
    let html = page(
        r#"<table><tbody jsname="cC57zf">
             <tr jsname="a"><td><div>only one cell</div></td></tr>
             <tr jsname="b"><td></td><td><div class="mZ3RIc">Second row</div></td></tr>
             <tr jsname="c"><td></td><td></td></tr>
             <tr jsname="d"><td></td><td><div class="mZ3RIc">Fourth row</div></td></tr>
           </tbody></table>"#,
    );
    let (titles, trace) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Second row", "Fourth row"]);
    assert_eq!(trace.rows_inspected, 4);
    assert_eq!(trace.skipped.len(), 2);
    assert_eq!(trace.skipped[0].reason, "missing second cell");
    assert_eq!(trace.skipped[1].row, 2);
}

#[test]
fn skipped_rows_leave_no_rank_gaps() {
    let html = page(
        r#"<table><tbody jsname="cC57zf">
             <tr jsname="a"><td><div>only one cell</div></td></tr>
             <tr jsname="b"><td></td><td><div class="mZ3RIc">Second row</div></td></tr>
             <tr jsname="c"><td></td><td></td></tr>
             <tr jsname="d"><td></td><td><div class="mZ3RIc">Fourth row</div></td></tr>
           </tbody></table>"#,
    );
    let extraction = extract_trends(&html, 25, "US", "4h", Utc::now()).unwrap();
    let ranks: Vec<(u32, &str)> = extraction
        .trends
        .iter()
        .map(|t| (t.rank, t.title.as_str()))
        .collect();
    assert_eq!(ranks, vec![(1, "Second row"), (2, "Fourth row")]);
}

#[test]
fn stops_at_limit_and_ranks_in_row_order() {
    let titles = [
        "alpha one", "bravo two", "charlie three", "delta four", "echo five", "foxtrot six",
        "golf seven", "hotel eight",
    ];
    let extraction =
        extract_trends(&canonical_page(&titles), 5, "IN", "24h", Utc::now()).unwrap();
    assert_eq!(extraction.trends.len(), 5);
    assert_eq!(extraction.trace.rows_inspected, 5);
    for (i, trend) in extraction.trends.iter().enumerate() {
        assert_eq!(trend.rank as usize, i + 1);
        assert_eq!(trend.title, titles[i]);
        assert_eq!(trend.country, "IN");
        assert_eq!(trend.time_range, "24h");
    }
}

#[test]
fn whitespace_is_collapsed() {
    let html = page(
        r#"<table><tbody jsname="cC57zf"><tr jsname="a"><td></td><td>
             <div class="mZ3RIc">
                 Grand   Prix
                 qualifying
             </div>
           </td></tr></tbody></table>"#,
    );
    let (titles, _) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Grand Prix qualifying"]);
}

#[test]
fn fallback_runs_when_canonical_body_is_missing() {
    let html = page(
        r#"<table><tbody>
             <tr jsname="a"><td>1</td><td><div class="mZ3RIc">Fallback one</div></td></tr>
             <tr jsname="b"><td>2</td><td><div class="mZ3RIc">Fallback two</div></td></tr>
           </tbody></table>"#,
    );
    let (titles, trace) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Fallback one", "Fallback two"]);
    assert_eq!(trace.strategy, Some("selector_fallback"));
    assert!(!trace.canonical_body_found);
    assert_eq!(trace.selector_attempts.len(), 1);
    assert_eq!(trace.selector_attempts[0].selector, FALLBACK_SELECTORS[0]);
}

#[test]
fn fallback_takes_one_title_per_row() {
    let html = page(
        r#"<table><tbody>
             <tr jsname="a"><td>1</td><td><div>Alpha</div><div>Alpha details</div></td></tr>
             <tr jsname="b"><td>2</td><td><div class="Rz403">Bravo meta</div><div>Bravo</div></td></tr>
           </tbody></table>"#,
    );
    let (titles, trace) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Alpha", "Bravo"]);
    assert_eq!(trace.selector_attempts.len(), 2);
    assert_eq!(trace.selector_attempts[0].matched, 0);
    assert_eq!(trace.selector_attempts[1].accepted, 2);
}

#[test]
fn fallback_reaches_most_generic_selector() {
    let html = page(
        r#"<table><tbody>
             <tr><td>1</td><td><div>Plain row</div></td></tr>
             <tr><td>2</td><td><div>5 hours ago</div></td></tr>
           </tbody></table>"#,
    );
    let (titles, trace) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Plain row"]);
    assert_eq!(trace.selector_attempts.len(), FALLBACK_SELECTORS.len());
    assert_eq!(trace.selector_attempts.last().unwrap().accepted, 1);
}

#[test]
fn fallback_applies_noise_filters() {
    let html = page(
        r#"<table><tbody>
             <tr jsname="a"><td>1</td><td><div>1M+ searches</div><div>Usable title</div></td></tr>
           </tbody></table>"#,
    );
    let (titles, _) = extract_titles(&html, 25);
    assert_eq!(titles, vec!["Usable title"]);
}

#[test]
fn empty_page_is_no_data() {
    let result = extract_trends(&page("<p>Something went wrong</p>"), 25, "IN", "24h", Utc::now());
    assert!(matches!(result, Err(ScrapeError::NoData)));
}

#[test]
fn zero_limit_extracts_nothing() {
    let (titles, trace) = extract_titles(&canonical_page(&TITLES), 0);
    assert!(titles.is_empty());
    assert_eq!(trace, ExtractionTrace::default());
}
