use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use itertools::Itertools;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::Tweet;

/// Text used when an upstream record carries neither `text` nor `content`
pub const MISSING_TEXT: &str = "No content provided";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TweetFieldError {
    #[error("record is not a JSON object")]
    NotAnObject,
    #[error("field '{0}' is required")]
    Missing(&'static str),
    #[error("field '{field}' must be {expected}")]
    WrongType {
        field: &'static str,
        expected: &'static str,
    },
}

/// Pull the list of tweet records out of a `/tweets` response body.
///
/// The upstream wraps records as `{"data": [...]}`; a bare array is accepted too.
pub fn extract_records(body: Value) -> Vec<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => records,
            Some(other) => {
                log::warn!(
                    "Expected 'data' to be a list but received {}; using an empty list",
                    json_type_name(&other)
                );
                Vec::new()
            }
            None => {
                log::warn!("Upstream response has no 'data' field; using an empty list");
                Vec::new()
            }
        },
        Value::Array(records) => records,
        other => {
            log::warn!(
                "Unexpected upstream response shape ({}); using an empty list",
                json_type_name(&other)
            );
            Vec::new()
        }
    }
}

/// Map one upstream record onto a [`Tweet`].
///
/// `text` falls back to `content`, then to [`MISSING_TEXT`]. Counters default to 0.
pub fn parse_tweet(record: &Value) -> Result<Tweet, TweetFieldError> {
    let map = record.as_object().ok_or(TweetFieldError::NotAnObject)?;

    let username = required_string(map, "username")?;
    let timestamp = required_string(map, "timestamp")?;

    let text = match (map.get("text"), map.get("content")) {
        (Some(text), _) => as_string(text, "text")?,
        (None, Some(content)) => as_string(content, "content")?,
        (None, None) => MISSING_TEXT.to_string(),
    };

    let likes = optional_int(map, "likes")?.unwrap_or(0);
    let retweets = optional_int(map, "retweets")?.unwrap_or(0);
    let id = optional_int(map, "id")?;

    Ok(Tweet {
        username,
        text,
        timestamp,
        likes,
        retweets,
        id,
    })
}

/// Keep the records authored by `username`, newest first.
///
/// Records that are not objects, or that fail field mapping, are dropped with a warning.
pub fn filter_user_tweets(records: &[Value], username: &str) -> Vec<Tweet> {
    records
        .iter()
        .filter(|record| {
            if record.is_object() {
                true
            } else {
                log::warn!("Skipping malformed tweet data (not an object): {}", record);
                false
            }
        })
        .filter(|record| record.get("username").and_then(Value::as_str) == Some(username))
        .filter_map(|record| match parse_tweet(record) {
            Ok(tweet) => Some(tweet),
            Err(e) => {
                log::warn!("Skipping tweet that failed validation: {} ({})", record, e);
                None
            }
        })
        .map(|tweet| (parse_timestamp(&tweet.timestamp), tweet))
        // Newest first; unparseable timestamps (None) land at the end
        .sorted_by(|(a, _), (b, _)| b.cmp(a))
        .map(|(_, tweet)| tweet)
        .collect()
}

/// Parse an ISO-8601 timestamp. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn required_string(map: &Map<String, Value>, field: &'static str) -> Result<String, TweetFieldError> {
    match map.get(field) {
        Some(value) => as_string(value, field),
        None => Err(TweetFieldError::Missing(field)),
    }
}

fn as_string(value: &Value, field: &'static str) -> Result<String, TweetFieldError> {
    value
        .as_str()
        .map(str::to_string)
        .ok_or(TweetFieldError::WrongType {
            field,
            expected: "a string",
        })
}

fn optional_int(map: &Map<String, Value>, field: &'static str) -> Result<Option<i64>, TweetFieldError> {
    let wrong_type = TweetFieldError::WrongType {
        field,
        expected: "an integer",
    };
    match map.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                Ok(Some(i))
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Ok(Some(f as i64)),
                    _ => Err(wrong_type),
                }
            }
        }
        Some(Value::String(s)) => s.trim().parse::<i64>().map(Some).map_err(|_| wrong_type),
        Some(_) => Err(wrong_type),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
