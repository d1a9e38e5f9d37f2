//! Region and time-window vocabulary shared by the scraper, the HTTP routes,
//! and the CLI.

use serde::Serialize;

use crate::CoreError;

/// Regions the fixed HTTP routes know by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    India,
    Us,
    Uk,
}

impl Region {
    pub const ALL: [Region; 3] = [Region::India, Region::Us, Region::Uk];

    /// Route segment for the region (`"india"`, `"us"`, `"uk"`).
    #[must_use]
    pub fn slug(self) -> &'static str {
        match self {
            Region::India => "india",
            Region::Us => "us",
            Region::Uk => "uk",
        }
    }

    /// Two-letter region code sent to the trends page.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            Region::India => "IN",
            Region::Us => "US",
            Region::Uk => "GB",
        }
    }

    /// Looks a region up by its route slug, case-insensitively.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRegion`] when the slug is not on the
    /// allow-list.
    pub fn from_slug(slug: &str) -> Result<Self, CoreError> {
        let lower = slug.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.slug() == lower)
            .ok_or_else(|| CoreError::InvalidRegion {
                supported: Self::supported_slugs(),
            })
    }

    #[must_use]
    pub fn supported_slugs() -> String {
        Self::ALL
            .iter()
            .map(|r| r.slug())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.slug())
    }
}

/// Resolves a caller-supplied country to a region code.
///
/// Named regions map to their code (`"india"` → `"IN"`); anything else is
/// treated as a raw code and upper-cased.
///
/// # Errors
///
/// Returns [`CoreError::EmptyRegionCode`] for blank input.
pub fn resolve_region_code(country: &str) -> Result<String, CoreError> {
    let trimmed = country.trim();
    if trimmed.is_empty() {
        return Err(CoreError::EmptyRegionCode);
    }
    Ok(Region::from_slug(trimmed).map_or_else(
        |_| trimmed.to_ascii_uppercase(),
        |region| region.code().to_owned(),
    ))
}

/// Lookback period of a scrape, in whole hours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    hours: u32,
}

const WINDOW_TOKENS: [(&str, u32); 4] = [("4h", 4), ("24h", 24), ("48h", 48), ("7d", 168)];

impl TimeWindow {
    /// The four windows served by fixed routes.
    pub const FIXED: [TimeWindow; 4] = [
        TimeWindow { hours: 4 },
        TimeWindow { hours: 24 },
        TimeWindow { hours: 48 },
        TimeWindow { hours: 168 },
    ];

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeWindow`] when `hours` is zero.
    pub fn from_hours(hours: u32) -> Result<Self, CoreError> {
        if hours == 0 {
            return Err(CoreError::InvalidTimeWindow(hours.to_string()));
        }
        Ok(Self { hours })
    }

    /// Parses a route token: `4h`, `24h`, `48h`, `7d`, or a raw hour count
    /// (an optional trailing `h` is accepted, so `12` and `12h` agree).
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTimeWindow`] when the token is neither a
    /// known window nor an integer of at least one.
    pub fn parse(token: &str) -> Result<Self, CoreError> {
        let token = token.trim();
        if let Some((_, hours)) = WINDOW_TOKENS.iter().find(|(t, _)| *t == token) {
            return Ok(Self { hours: *hours });
        }
        let digits = token.strip_suffix('h').unwrap_or(token);
        digits
            .parse::<u32>()
            .ok()
            .filter(|h| *h >= 1)
            .map(|hours| Self { hours })
            .ok_or_else(|| CoreError::InvalidTimeWindow(token.to_owned()))
    }

    #[must_use]
    pub fn hours(self) -> u32 {
        self.hours
    }

    /// Route token for the window (`"7d"` for 168 hours, `"<n>h"` otherwise).
    #[must_use]
    pub fn token(self) -> String {
        WINDOW_TOKENS
            .iter()
            .find(|(_, h)| *h == self.hours)
            .map_or_else(|| format!("{}h", self.hours), |(t, _)| (*t).to_owned())
    }

    /// Stored `time_range` tag, always `"<n>h"`.
    #[must_use]
    pub fn tag(self) -> String {
        format!("{}h", self.hours)
    }

    /// Human label used in scrape results (`"24 hours"`, `"7 days"`).
    #[must_use]
    pub fn label(self) -> String {
        if self.hours == 168 {
            "7 days".to_owned()
        } else {
            format!("{} hours", self.hours)
        }
    }
}

/// Validates a scrape limit.
///
/// # Errors
///
/// Returns [`CoreError::InvalidLimit`] for zero or negative values.
pub fn validate_limit(limit: i64) -> Result<usize, CoreError> {
    usize::try_from(limit)
        .ok()
        .filter(|l| *l >= 1)
        .ok_or(CoreError::InvalidLimit(limit))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn region_slug_lookup_is_case_insensitive() {
        assert_eq!(Region::from_slug("India").unwrap(), Region::India);
        assert_eq!(Region::from_slug("UK").unwrap().code(), "GB");
    }

    #[test]
    fn unknown_region_lists_supported_slugs() {
        let err = Region::from_slug("france").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid country. Supported countries: india, us, uk"
        );
    }

    #[test]
    fn resolve_region_code_maps_names_and_uppercases_codes() {
        assert_eq!(resolve_region_code("india").unwrap(), "IN");
        assert_eq!(resolve_region_code("de").unwrap(), "DE");
        assert_eq!(resolve_region_code("  "), Err(CoreError::EmptyRegionCode));
    }

    #[test]
    fn window_tokens_map_to_hours() {
        assert_eq!(TimeWindow::parse("4h").unwrap().hours(), 4);
        assert_eq!(TimeWindow::parse("24h").unwrap().hours(), 24);
        assert_eq!(TimeWindow::parse("48h").unwrap().hours(), 48);
        assert_eq!(TimeWindow::parse("7d").unwrap().hours(), 168);
        assert_eq!(TimeWindow::parse("12").unwrap().hours(), 12);
        assert_eq!(TimeWindow::parse("72h").unwrap().hours(), 72);
    }

    #[test]
    fn window_rejects_zero_and_garbage() {
        assert!(TimeWindow::parse("0").is_err());
        assert!(TimeWindow::parse("soon").is_err());
        assert!(TimeWindow::parse("-3").is_err());
        assert!(TimeWindow::from_hours(0).is_err());
    }

    #[test]
    fn window_labels_and_tags() {
        let week = TimeWindow::from_hours(168).unwrap();
        assert_eq!(week.label(), "7 days");
        assert_eq!(week.tag(), "168h");
        assert_eq!(week.token(), "7d");
        let day = TimeWindow::from_hours(24).unwrap();
        assert_eq!(day.label(), "24 hours");
        assert_eq!(day.token(), "24h");
    }

    #[test]
    fn limit_must_be_positive() {
        assert_eq!(validate_limit(25).unwrap(), 25);
        assert_eq!(validate_limit(0), Err(CoreError::InvalidLimit(0)));
        assert_eq!(validate_limit(-4), Err(CoreError::InvalidLimit(-4)));
    }
}
