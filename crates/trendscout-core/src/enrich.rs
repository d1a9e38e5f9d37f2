//! Rule-based enrichment of raw scraped trends.
//!
//! Everything here is deterministic: the same title always yields the same
//! category and tags, and the score depends on rank alone.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::trends::{NewTrend, ScrapedTrend, TREND_SOURCE};

/// Category assigned when no keyword set matches.
pub const DEFAULT_CATEGORY: &str = "general";

/// Upper bound on tags kept per trend.
const MAX_TAGS: usize = 10;

/// Keyword sets, checked in order; the first set sharing a word with the
/// title wins.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "sports",
        &[
            "cricket", "football", "soccer", "match", "vs", "ipl", "nba", "nfl", "mlb", "nhl",
            "tennis", "league", "cup", "olympics", "fc", "premier", "wwe", "ufc", "f1",
            "grand", "prix", "t20", "odi", "test", "score", "goal", "playoffs",
        ],
    ),
    (
        "politics",
        &[
            "election", "elections", "minister", "president", "parliament", "government",
            "vote", "voting", "senate", "congress", "bjp", "governor", "mayor", "policy",
            "campaign", "poll", "polls", "modi", "trump", "biden", "labour", "tory",
        ],
    ),
    (
        "entertainment",
        &[
            "movie", "film", "song", "album", "actor", "actress", "trailer", "netflix",
            "series", "season", "episode", "bollywood", "hollywood", "concert", "award",
            "awards", "oscars", "grammy", "box", "office", "release", "show", "singer",
            "music", "tour",
        ],
    ),
    (
        "technology",
        &[
            "iphone", "android", "ai", "apple", "google", "samsung", "app", "update",
            "chatgpt", "openai", "tesla", "microsoft", "windows", "pixel", "ios", "launch",
            "outage", "meta", "whatsapp", "instagram",
        ],
    ),
    (
        "business",
        &[
            "stock", "stocks", "share", "shares", "market", "price", "ipo", "sensex",
            "nifty", "bitcoin", "crypto", "earnings", "bank", "economy", "gold", "dow",
            "nasdaq", "inflation", "rates", "budget", "tax",
        ],
    ),
    (
        "weather",
        &[
            "weather", "rain", "cyclone", "storm", "hurricane", "earthquake", "flood",
            "floods", "heatwave", "monsoon", "snow", "temperature", "tornado", "forecast",
        ],
    ),
    (
        "health",
        &[
            "covid", "virus", "vaccine", "hospital", "disease", "health", "outbreak", "flu",
            "cancer", "dengue",
        ],
    ),
    (
        "education",
        &[
            "exam", "result", "results", "admit", "card", "board", "university", "cbse",
            "neet", "jee", "admission", "school", "college",
        ],
    ),
];

/// Words that never become tags.
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "will", "you", "your",
    "has", "have", "not", "but", "all", "its", "his", "her", "who", "how", "what", "when",
    "why", "new", "out", "into", "about", "after", "over",
];

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("valid word regex"));

fn words(title: &str) -> impl Iterator<Item = String> + '_ {
    WORD_RE
        .find_iter(title)
        .map(|m| m.as_str().to_lowercase())
}

/// Classifies a trend title into a coarse category.
///
/// Matching is on whole lower-cased words; the first keyword set with a hit
/// wins and [`DEFAULT_CATEGORY`] is returned when nothing matches.
#[must_use]
pub fn classify(title: &str) -> String {
    let title_words: HashSet<String> = words(title).collect();
    CATEGORY_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| title_words.contains(*k)))
        .map_or(DEFAULT_CATEGORY, |(category, _)| category)
        .to_owned()
}

/// Extracts tags from a title: lower-cased words longer than two
/// characters, stopwords removed, first occurrence order kept, no repeats.
#[must_use]
pub fn extract_tags(title: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    words(title)
        .filter(|w| w.chars().count() > 2 && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .take(MAX_TAGS)
        .collect()
}

/// Trending score for a rank: `max(0, 100 - 2 * rank)`.
#[must_use]
pub fn trending_score(rank: u32) -> i32 {
    let penalty = i64::from(rank).saturating_mul(2);
    i32::try_from((100 - penalty).max(0)).unwrap_or(0)
}

/// Turns one scraped row into a storable trend.
#[must_use]
pub fn enrich_trend(
    trend: &ScrapedTrend,
    time_window_hours: u32,
    metadata: serde_json::Value,
) -> NewTrend {
    NewTrend {
        title: trend.title.clone(),
        rank: i32::try_from(trend.rank).unwrap_or(i32::MAX),
        geo: trend.country.clone(),
        time_range: trend.time_range.clone(),
        time_window_hours: i32::try_from(time_window_hours).unwrap_or(i32::MAX),
        scraped_at: trend.scraped_at,
        category: classify(&trend.title),
        tags: extract_tags(&trend.title),
        trending_score: trending_score(trend.rank),
        source: TREND_SOURCE.to_owned(),
        is_active: true,
        metadata,
    }
}
