use super::*;
use chrono::{TimeZone, Utc};
use serde_json::json;
use trendscout_core::ScrapedTrend;

fn result_with(country: &str, titles: &[(u32, &str)]) -> ScrapeResult {
    let at = Utc.with_ymd_and_hms(2025, 3, 1, 9, 30, 0).unwrap();
    let trends: Vec<ScrapedTrend> = titles
        .iter()
        .map(|(rank, title)| ScrapedTrend {
            rank: *rank,
            title: (*title).to_owned(),
            country: country.to_owned(),
            time_range: "24h".to_owned(),
            scraped_at: at,
        })
        .collect();
    ScrapeResult {
        success: true,
        country: country.to_owned(),
        time_range: "24 hours".to_owned(),
        total_trends: trends.len(),
        scraping_duration: 1500,
        scraped_at: at,
        page_url: format!("https://trends.example.test/trending?geo={country}&hours=24"),
        trends,
    }
}

fn sample() -> ScrapeResult {
    result_with("IN", &[(1, "India vs \"Aus\""), (12, "Budget | 2025")])
}

#[test]
fn csv_quotes_titles_and_escapes_quotes() {
    let csv = render(&sample(), OutputFormat::Csv).unwrap();
    let lines: Vec<&str> = csv.lines().collect();
    assert_eq!(lines[0], "Rank,Title,Country,Time Range,Scraped At");
    assert_eq!(
        lines[1],
        r#"1,"India vs ""Aus""",IN,24h,2025-03-01T09:30:00+00:00"#
    );
    assert_eq!(lines.len(), 3);
}

#[test]
fn text_right_aligns_ranks_under_a_header() {
    let text = render(&sample(), OutputFormat::Text).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "Google Trends - IN (24 hours)");
    assert_eq!(lines[1], "Scraped at: 2025-03-01 09:30:00 UTC");
    assert_eq!(lines[2], "Total trends: 2");
    assert_eq!(lines[3].chars().count(), 50);
    assert_eq!(lines[4], " 1. India vs \"Aus\"");
    assert_eq!(lines[5], "12. Budget | 2025");
}

#[test]
fn markdown_builds_a_table_and_escapes_pipes() {
    let md = render(&sample(), OutputFormat::Markdown).unwrap();
    assert!(md.starts_with("# Google Trends - IN\n\n**Time Range:** 24 hours"));
    assert!(md.contains("| Rank | Trend Title |\n|------|-------------|"));
    assert!(md.ends_with("| 12 | Budget \\| 2025 |"));
}

#[test]
fn json_is_the_camel_case_payload() {
    let json: serde_json::Value =
        serde_json::from_str(&render(&sample(), OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["totalTrends"], 2);
    assert_eq!(json["trends"][1]["rank"], 12);
}

#[test]
fn filter_keeps_matching_titles_and_recounts() {
    let result = result_with(
        "US",
        &[(1, "Lakers score"), (2, "Election night"), (3, "lakers trade")],
    );

    let loose = filter_by_keywords(&result, &["LAKERS".to_owned()], false);
    assert_eq!(loose.total_trends, 2);
    let ranks: Vec<u32> = loose.trends.iter().map(|t| t.rank).collect();
    assert_eq!(ranks, vec![1, 3]);
    assert_eq!(loose.country, "US");

    let strict = filter_by_keywords(&result, &["Lakers".to_owned()], true);
    assert_eq!(strict.total_trends, 1);
    assert_eq!(strict.trends[0].title, "Lakers score");

    let either = filter_by_keywords(
        &result,
        &["election".to_owned(), "trade".to_owned()],
        false,
    );
    assert_eq!(either.total_trends, 2);

    assert_eq!(filter_by_keywords(&result, &[], false), result);
}

#[test]
fn statistics_summarise_titles() {
    let result = result_with(
        "GB",
        &[
            (1, "World Cup final"),
            (2, "Cup"),
            (3, "World Cup: draw!"),
            (4, "Weather"),
        ],
    );

    let stats = statistics(&result).unwrap();
    assert_eq!(stats.total_trends, 4);
    assert_eq!(stats.shortest_title, "Cup");
    assert_eq!(stats.longest_title, "World Cup: draw!");
    assert!((stats.average_title_length - 10.25).abs() < f64::EPSILON);
    assert_eq!(stats.scraping_duration, 1500);
    assert_eq!(stats.country, "GB");

    let words: Vec<(&str, usize)> = stats
        .unique_words
        .iter()
        .map(|w| (w.word.as_str(), w.count))
        .collect();
    assert_eq!(
        words,
        vec![
            ("cup", 3),
            ("world", 2),
            ("final", 1),
            ("draw", 1),
            ("weather", 1)
        ]
    );

    let json = serde_json::to_value(&stats).unwrap();
    assert_eq!(json["uniqueWords"][0], json!({ "word": "cup", "count": 3 }));
    assert_eq!(json["averageTitleLength"], 10.25);
}

#[test]
fn statistics_are_absent_for_an_empty_scrape() {
    assert!(statistics(&result_with("IN", &[])).is_none());
}

#[test]
fn top_words_drop_short_words_and_cap_at_ten() {
    let titles: Vec<String> = (0..12).map(|i| format!("word{i:02} of a")).collect();
    let refs: Vec<&str> = titles.iter().map(String::as_str).collect();
    let words = top_words(&refs);
    assert_eq!(words.len(), 10);
    assert_eq!(words[0].word, "word00");
    assert!(words.iter().all(|w| w.word != "of"));
}

#[test]
fn compare_splits_common_and_unique_titles() {
    let us = result_with("US", &[(1, "Oscars"), (2, "Super Bowl"), (3, "Taxes")]);
    let gb = result_with("GB", &[(1, "Oscars"), (2, "Taxes")]);

    let comparison = compare_trends(&us, &gb);
    assert_eq!(comparison.dataset1.country, "US");
    assert_eq!(comparison.dataset2.total_trends, 2);
    assert_eq!(comparison.common_trends, vec!["Oscars", "Taxes"]);
    assert_eq!(comparison.unique_to_dataset1, vec!["Super Bowl"]);
    assert!(comparison.unique_to_dataset2.is_empty());
    assert!((comparison.similarity - 200.0 / 3.0).abs() < 1e-9);

    let json = serde_json::to_value(&comparison).unwrap();
    assert_eq!(json["uniqueToDataset1"], json!(["Super Bowl"]));
    assert_eq!(json["dataset1"]["timeRange"], "24 hours");
}

#[test]
fn comparing_two_empty_scrapes_is_zero_similarity() {
    let empty = result_with("IN", &[]);
    let comparison = compare_trends(&empty, &empty);
    assert!(comparison.common_trends.is_empty());
    assert!(comparison.similarity.abs() < f64::EPSILON);
}

#[test]
fn export_path_appends_the_format_extension() {
    let base = Path::new("out/trends");
    assert_eq!(export_path(base, OutputFormat::Json), Path::new("out/trends.json"));
    assert_eq!(export_path(base, OutputFormat::Text), Path::new("out/trends.txt"));
    assert_eq!(export_path(base, OutputFormat::Markdown), Path::new("out/trends.md"));
}

#[tokio::test]
async fn export_writes_the_rendered_file() {
    let base = std::env::temp_dir().join(format!("trendscout-export-{}", std::process::id()));
    let report = export_to_file(&sample(), &base, OutputFormat::Csv)
        .await
        .unwrap();

    let path = export_path(&base, OutputFormat::Csv);
    let written = tokio::fs::read_to_string(&path).await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();

    assert!(report.success);
    assert_eq!(report.format, "csv");
    assert_eq!(report.filename, path.display().to_string());
    assert_eq!(report.size, written.len());
    assert_eq!(written, render(&sample(), OutputFormat::Csv).unwrap());
}

#[test]
fn rendered_json_validates() {
    let payload: serde_json::Value =
        serde_json::from_str(&render(&sample(), OutputFormat::Json).unwrap()).unwrap();
    let validation = validate_payload(&payload);
    assert!(validation.valid, "{:?}", validation.errors);
}

#[test]
fn validation_reports_each_broken_field() {
    assert_eq!(
        validate_payload(&serde_json::Value::Null).errors,
        vec!["Trends data is null or undefined"]
    );
    assert_eq!(
        validate_payload(&json!({ "trends": [] })).errors,
        vec!["Missing or invalid success field"]
    );

    let broken = json!({
        "success": true,
        "country": "IN",
        "trends": [
            { "rank": 1, "title": "ok" },
            { "rank": "2" },
        ],
    });
    assert_eq!(
        validate_payload(&broken).errors,
        vec![
            "Missing timeRange field",
            "Trend 1 missing title",
            "Trend 1 missing or invalid rank",
        ]
    );

    let not_array = json!({ "success": true, "country": "IN", "timeRange": "4 hours", "trends": {} });
    assert_eq!(
        validate_payload(&not_array).errors,
        vec!["Trends field is not an array"]
    );
}

#[test]
fn failure_payloads_only_need_success() {
    let failure = json!({ "success": false, "error": "timed out" });
    assert!(validate_payload(&failure).valid);
}
