//! Pure transforms over a successful scrape: rendering as JSON, CSV,
//! aligned text or a Markdown table, keyword filtering, title statistics,
//! comparison of two scrapes, file export, and validation of saved payloads.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::Serialize;
use trendscout_scraper::ScrapeResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Json,
    Csv,
    Text,
    Markdown,
}

impl OutputFormat {
    /// File extension used by [`export_to_file`].
    pub(crate) fn extension(self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
            OutputFormat::Text => "txt",
            OutputFormat::Markdown => "md",
        }
    }
}

const RULE_WIDTH: usize = 50;
const TOP_WORDS: usize = 10;

/// # Errors
///
/// Returns an error only if JSON serialization fails.
pub(crate) fn render(result: &ScrapeResult, format: OutputFormat) -> anyhow::Result<String> {
    Ok(match format {
        OutputFormat::Json => serde_json::to_string_pretty(result)?,
        OutputFormat::Csv => to_csv(result),
        OutputFormat::Text => to_text(result),
        OutputFormat::Markdown => to_markdown(result),
    })
}

fn scraped_at(result: &ScrapeResult) -> String {
    result.scraped_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

fn to_csv(result: &ScrapeResult) -> String {
    let mut lines = vec!["Rank,Title,Country,Time Range,Scraped At".to_owned()];
    lines.extend(result.trends.iter().map(|t| {
        format!(
            "{},\"{}\",{},{},{}",
            t.rank,
            t.title.replace('"', "\"\""),
            t.country,
            t.time_range,
            t.scraped_at.to_rfc3339()
        )
    }));
    lines.join("\n")
}

fn to_text(result: &ScrapeResult) -> String {
    let mut out = format!(
        "Google Trends - {} ({})\nScraped at: {}\nTotal trends: {}\n{}",
        result.country,
        result.time_range,
        scraped_at(result),
        result.total_trends,
        "─".repeat(RULE_WIDTH)
    );
    for trend in &result.trends {
        out.push_str(&format!("\n{:>2}. {}", trend.rank, trend.title));
    }
    out
}

fn to_markdown(result: &ScrapeResult) -> String {
    let mut out = format!(
        "# Google Trends - {}\n\n**Time Range:** {}\n**Scraped At:** {}\n**Total Trends:** {}\n\n\
         | Rank | Trend Title |\n|------|-------------|",
        result.country,
        result.time_range,
        scraped_at(result),
        result.total_trends
    );
    for trend in &result.trends {
        out.push_str(&format!(
            "\n| {} | {} |",
            trend.rank,
            trend.title.replace('|', "\\|")
        ));
    }
    out
}


// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

/// Keeps trends whose title contains any keyword. Ranks are left as scraped
/// and `total_trends` is recounted. An empty keyword list keeps everything.
pub(crate) fn filter_by_keywords(
    result: &ScrapeResult,
    keywords: &[String],
    case_sensitive: bool,
) -> ScrapeResult {
    if keywords.is_empty() {
        return result.clone();
    }
    let fold = |text: &str| {
        if case_sensitive {
            text.to_owned()
        } else {
            text.to_lowercase()
        }
    };
    let needles: Vec<String> = keywords.iter().map(|k| fold(k)).collect();

    let trends: Vec<_> = result
        .trends
        .iter()
        .filter(|trend| {
            let title = fold(&trend.title);
            needles.iter().any(|needle| title.contains(needle.as_str()))
        })
        .cloned()
        .collect();

    ScrapeResult {
        total_trends: trends.len(),
        trends,
        ..result.clone()
    }
}

// ---------------------------------------------------------------------------
// Statistics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct WordCount {
    pub word: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrendStatistics {
    pub total_trends: usize,
    /// Mean title length in characters.
    pub average_title_length: f64,
    pub shortest_title: String,
    pub longest_title: String,
    pub unique_words: Vec<WordCount>,
    pub scraping_duration: u64,
    pub country: String,
    pub time_range: String,
}

static PUNCTUATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("valid punctuation regex"));

fn ratio(numerator: usize, denominator: usize) -> f64 {
    let as_f64 = |n: usize| f64::from(u32::try_from(n).unwrap_or(u32::MAX));
    if denominator == 0 {
        0.0
    } else {
        as_f64(numerator) / as_f64(denominator)
    }
}

/// Title statistics for a scrape, or `None` when it holds no trends.
/// Ties for shortest and longest keep the earlier title.
pub(crate) fn statistics(result: &ScrapeResult) -> Option<TrendStatistics> {
    let titles: Vec<&str> = result.trends.iter().map(|t| t.title.as_str()).collect();
    let length = |title: &&str| title.chars().count();

    let mut shortest = *titles.first()?;
    let mut longest = shortest;
    for title in &titles[1..] {
        if length(title) < length(&shortest) {
            shortest = *title;
        }
        if length(title) > length(&longest) {
            longest = *title;
        }
    }
    let total_length: usize = titles.iter().map(length).sum();

    Some(TrendStatistics {
        total_trends: result.total_trends,
        average_title_length: ratio(total_length, titles.len()),
        shortest_title: shortest.to_owned(),
        longest_title: longest.to_owned(),
        unique_words: top_words(&titles),
        scraping_duration: result.scraping_duration,
        country: result.country.clone(),
        time_range: result.time_range.clone(),
    })
}

/// The most frequent words longer than two characters across `titles`,
/// lower-cased with punctuation stripped. Equal counts keep first-seen order.
pub(crate) fn top_words(titles: &[&str]) -> Vec<WordCount> {
    let joined = titles.join(" ").to_lowercase();
    let cleaned = PUNCTUATION_RE.replace_all(&joined, "");

    let mut order: Vec<&str> = Vec::new();
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for word in cleaned.split_whitespace().filter(|w| w.chars().count() > 2) {
        let count = counts.entry(word).or_insert(0);
        if *count == 0 {
            order.push(word);
        }
        *count += 1;
    }

    let mut words: Vec<WordCount> = order
        .into_iter()
        .map(|word| WordCount {
            word: word.to_owned(),
            count: counts[word],
        })
        .collect();
    words.sort_by(|a, b| b.count.cmp(&a.count));
    words.truncate(TOP_WORDS);
    words
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DatasetSummary {
    pub country: String,
    pub time_range: String,
    pub total_trends: usize,
}

impl DatasetSummary {
    fn of(result: &ScrapeResult) -> Self {
        Self {
            country: result.country.clone(),
            time_range: result.time_range.clone(),
            total_trends: result.total_trends,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TrendComparison {
    pub dataset1: DatasetSummary,
    pub dataset2: DatasetSummary,
    pub common_trends: Vec<String>,
    pub unique_to_dataset1: Vec<String>,
    pub unique_to_dataset2: Vec<String>,
    /// Common titles as a percentage of the larger distinct title set.
    pub similarity: f64,
}

fn distinct_titles(result: &ScrapeResult) -> Vec<&str> {
    let mut seen = HashSet::new();
    result
        .trends
        .iter()
        .map(|t| t.title.as_str())
        .filter(|title| seen.insert(*title))
        .collect()
}

/// Exact-title overlap between two scrapes, in each scrape's rank order.
pub(crate) fn compare_trends(first: &ScrapeResult, second: &ScrapeResult) -> TrendComparison {
    let titles1 = distinct_titles(first);
    let titles2 = distinct_titles(second);
    let set1: HashSet<&str> = titles1.iter().copied().collect();
    let set2: HashSet<&str> = titles2.iter().copied().collect();

    let owned = |titles: &[&str], keep: &dyn Fn(&str) -> bool| -> Vec<String> {
        titles
            .iter()
            .filter(|t| keep(t))
            .map(|t| (*t).to_owned())
            .collect()
    };
    let common_trends = owned(&titles1, &|t| set2.contains(t));
    let unique_to_dataset1 = owned(&titles1, &|t| !set2.contains(t));
    let unique_to_dataset2 = owned(&titles2, &|t| !set1.contains(t));

    TrendComparison {
        dataset1: DatasetSummary::of(first),
        dataset2: DatasetSummary::of(second),
        similarity: ratio(common_trends.len(), titles1.len().max(titles2.len())) * 100.0,
        common_trends,
        unique_to_dataset1,
        unique_to_dataset2,
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ExportReport {
    pub success: bool,
    pub filename: String,
    /// Bytes written.
    pub size: usize,
    pub format: &'static str,
}

/// `base` with the format's extension appended, so `out/trends` becomes
/// `out/trends.csv`.
pub(crate) fn export_path(base: &Path, format: OutputFormat) -> PathBuf {
    let mut name = base.as_os_str().to_owned();
    name.push(".");
    name.push(format.extension());
    PathBuf::from(name)
}

/// Renders `result` and writes it next to `base`.
///
/// # Errors
///
/// Returns an error if rendering or the write fails.
pub(crate) async fn export_to_file(
    result: &ScrapeResult,
    base: &Path,
    format: OutputFormat,
) -> anyhow::Result<ExportReport> {
    let content = render(result, format)?;
    let path = export_path(base, format);
    tokio::fs::write(&path, &content)
        .await
        .map_err(|e| anyhow::anyhow!("failed to write {}: {e}", path.display()))?;
    tracing::info!(path = %path.display(), bytes = content.len(), "trends exported");

    Ok(ExportReport {
        success: true,
        filename: path.display().to_string(),
        size: content.len(),
        format: format.extension(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Validation {
    pub valid: bool,
    pub errors: Vec<String>,
}

/// Checks a saved scrape payload (as written by `--format json`) for the
/// fields consumers rely on. Failure payloads only need `success`.
pub(crate) fn validate_payload(payload: &serde_json::Value) -> Validation {
    let mut errors = Vec::new();
    if payload.is_null() {
        errors.push("Trends data is null or undefined".to_owned());
        return Validation {
            valid: false,
            errors,
        };
    }

    let success = payload.get("success").and_then(serde_json::Value::as_bool);
    if success.is_none() {
        errors.push("Missing or invalid success field".to_owned());
    }

    if success == Some(true) {
        let present = |field: &str| {
            payload
                .get(field)
                .and_then(serde_json::Value::as_str)
                .is_some_and(|v| !v.is_empty())
        };
        if !present("country") {
            errors.push("Missing country field".to_owned());
        }
        if !present("timeRange") {
            errors.push("Missing timeRange field".to_owned());
        }

        match payload.get("trends").and_then(serde_json::Value::as_array) {
            None => errors.push("Trends field is not an array".to_owned()),
            Some(trends) => {
                for (index, trend) in trends.iter().enumerate() {
                    let has_title = trend
                        .get("title")
                        .and_then(serde_json::Value::as_str)
                        .is_some_and(|t| !t.is_empty());
                    if !has_title {
                        errors.push(format!("Trend {index} missing title"));
                    }
                    if !trend.get("rank").is_some_and(serde_json::Value::is_number) {
                        errors.push(format!("Trend {index} missing or invalid rank"));
                    }
                }
            }
        }
    }

    Validation {
        valid: errors.is_empty(),
        errors,
    }
}

#[cfg(test)]
#[path = "format_test.rs"]
mod tests;
