//! Rule format version tags
//!
//! A tag is any string the upstream API uses to name a schema version. Most
//! are dated (`rules_v2024_10_21`, `v2023-01-05`) and those order
//! chronologically; undated tags such as `latest` sort before every dated
//! one, by string.
//!
//! Copyright (c) 2025 Ruleformat Team
//! Licensed under the Apache-2.0 license

use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

static DATED_TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn dated_tag_regex() -> &'static Regex {
    DATED_TAG_REGEX.get_or_init(|| {
        Regex::new(r"^(?:rules_)?v(\d{4})[_-](\d{2})[_-](\d{2})$").expect("Valid regex pattern")
    })
}

/// Publication date encoded in a tag, if it carries a real calendar date
fn tag_date(tag: &str) -> Option<NaiveDate> {
    let caps = dated_tag_regex().captures(tag)?;
    let year = caps[1].parse().ok()?;
    let month = caps[2].parse().ok()?;
    let day = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// A version tag plus the date it encodes, if any
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RuleFormatVersion {
    tag: String,
    date: Option<NaiveDate>,
}

impl RuleFormatVersion {
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let date = tag_date(&tag);
        Self { tag, date }
    }

    pub fn as_str(&self) -> &str {
        &self.tag
    }

    /// Publication date, for `rules_vYYYY_MM_DD` and `vYYYY-MM-DD` tags
    pub fn date(&self) -> Option<NaiveDate> {
        self.date
    }

    pub fn is_dated(&self) -> bool {
        self.date.is_some()
    }
}

impl Ord for RuleFormatVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date).then_with(|| self.tag.cmp(&other.tag))
    }
}

impl PartialOrd for RuleFormatVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for RuleFormatVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tag)
    }
}

impl FromStr for RuleFormatVersion {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Infallible> {
        Ok(Self::new(s))
    }
}

impl From<&str> for RuleFormatVersion {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for RuleFormatVersion {
    fn from(tag: String) -> Self {
        Self::new(tag)
    }
}

impl From<RuleFormatVersion> for String {
    fn from(version: RuleFormatVersion) -> Self {
        version.tag
    }
}
