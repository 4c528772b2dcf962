//! Defines the [`SitePost`] and [`PostMetadata`] types. A post is a pair of
//! files sharing a basename under the posts directory: `<slug>.html` holds
//! the content and `<slug>.json` holds the metadata.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::Error;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::str::FromStr;

/// A single post, built once by [`crate::parser::Parser`] and read-only
/// afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePost {
    /// The basename shared by the content and metadata files.
    pub slug: String,
    pub content_path: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: PostMetadata,
}

/// The parsed contents of a post's metadata file.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct PostMetadata {
    pub title: String,

    #[serde(deserialize_with = "deserialize_pub_date")]
    pub pub_date: DateTime<FixedOffset>,

    #[serde(default, deserialize_with = "deserialize_show_pub_date")]
    pub show_pub_date: Option<ShowPubDate>,

    /// Opaque values handed to templates as `post.additionalValues`.
    #[serde(default)]
    pub additional_values: serde_json::Value,
}

impl FromStr for PostMetadata {
    type Err = serde_json::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_str(s)
    }
}

/// Overrides how a post's publication date is displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShowPubDate {
    /// Display this text instead of the formatted date.
    Text(String),

    /// Don't display a date at all. Written as `false` in metadata.
    Hidden,
}

impl<'de> Deserialize<'de> for ShowPubDate {
    fn deserialize<D>(deserializer: D) -> Result<ShowPubDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Flag(bool),
        }

        match Raw::deserialize(deserializer) {
            Ok(Raw::Text(text)) => Ok(ShowPubDate::Text(text)),
            Ok(Raw::Flag(false)) => Ok(ShowPubDate::Hidden),
            Ok(Raw::Flag(true)) | Err(_) => Err(D::Error::custom(
                "`showPubDate` must be a string or `false`",
            )),
        }
    }
}

// `null` is not "absent"; it must go through the `ShowPubDate` check.
fn deserialize_show_pub_date<'de, D>(deserializer: D) -> Result<Option<ShowPubDate>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Some(ShowPubDate::deserialize(deserializer)?))
}

fn deserialize_pub_date<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
where
    D: Deserializer<'de>,
{
    let input = String::deserialize(deserializer)?;
    parse_pub_date(&input)
        .ok_or_else(|| D::Error::custom(format!("invalid `pubDate` '{}'", input)))
}

/// Parses a publication date. Accepts RFC 3339 (`2021-06-01T10:00:00+02:00`),
/// a date-time without an offset (taken as UTC), or a bare `YYYY-MM-DD` date
/// (midnight UTC).
pub fn parse_pub_date(input: &str) -> Option<DateTime<FixedOffset>> {
    if let Ok(date) = DateTime::parse_from_rfc3339(input) {
        return Some(date);
    }
    let naive = NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(input, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(Utc.from_utc_datetime(&naive).into())
}
