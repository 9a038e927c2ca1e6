//! Release version tags used to name archives.

use chrono::{Local, NaiveDate};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion {
    /// Version date.
    pub date: NaiveDate,
    /// Version tag (e.g., "2024-01-15" or "2024-01-15.1").
    pub tag: String,
}

impl ReleaseVersion {
    pub fn new(date: NaiveDate, tag: impl Into<String>) -> Self {
        Self { date, tag: tag.into() }
    }

    /// Parse a version string (YYYY-MM-DD or YYYY-MM-DD.N) or use today's date.
    pub fn parse(value: Option<&str>) -> Result<Self, ConfigError> {
        let Some(v) = value else {
            let today = Local::now().date_naive();
            return Ok(Self::new(today, today.format("%Y-%m-%d").to_string()));
        };

        if let Some((date_part, build_num)) = v.rsplit_once('.')
            && build_num.parse::<u32>().is_ok()
            && let Ok(parsed) = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        {
            return Ok(Self::new(parsed, v));
        }

        NaiveDate::parse_from_str(v, "%Y-%m-%d")
            .map(|parsed| Self::new(parsed, v))
            .map_err(|_| ConfigError::Version(v.to_string()))
    }
}
