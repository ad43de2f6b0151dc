// RSS/Atom feed polling with conditional GETs.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED, USER_AGENT};
use reqwest::StatusCode;
use tracing::info;

use pensive_store::Feed;

const FEED_MAX_ITEMS: usize = 20;
const FEED_MAX_AGE_DAYS: i64 = 30;
const FEED_USER_AGENT: &str = "pensive-feeds/0.1";

/// One entry pulled from a feed.
#[derive(Debug, Clone)]
pub struct FeedEntry {
    pub url: String,
    pub title: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub enum FeedPollOutcome {
    /// The server reported 304; nothing to do but advance last_fetched_at.
    Unchanged,
    Fetched {
        title: Option<String>,
        etag: Option<String>,
        last_modified: Option<String>,
        items: Vec<FeedEntry>,
    },
}

pub struct FeedPoller {
    client: reqwest::Client,
}

impl Default for FeedPoller {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedPoller {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build feed HTTP client");
        Self { client }
    }

    /// Fetch and parse a feed, honoring stored ETag/Last-Modified
    /// validators. Only items newer than the feed's watermark are returned.
    pub async fn poll(&self, feed: &Feed) -> Result<FeedPollOutcome> {
        let mut request = self
            .client
            .get(&feed.url)
            .header(USER_AGENT, FEED_USER_AGENT);
        if let Some(etag) = &feed.etag {
            request = request.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = &feed.last_modified {
            request = request.header(IF_MODIFIED_SINCE, last_modified);
        }

        let response = request.send().await.context("Feed fetch failed")?;

        if response.status() == StatusCode::NOT_MODIFIED {
            return Ok(FeedPollOutcome::Unchanged);
        }
        if !response.status().is_success() {
            bail!("Feed fetch returned {}", response.status());
        }

        let etag = header_value(&response, ETAG);
        let last_modified = header_value(&response, LAST_MODIFIED);

        let bytes = response.bytes().await.context("Failed to read feed body")?;
        let parsed =
            feed_rs::parser::parse(&bytes[..]).context("Failed to parse RSS/Atom feed")?;

        let title = parsed.title.map(|t| t.content);
        let entries: Vec<FeedEntry> = parsed
            .entries
            .into_iter()
            .filter_map(|entry| {
                let url = entry
                    .links
                    .first()
                    .map(|l| l.href.clone())
                    .or_else(|| entry.id.starts_with("http").then(|| entry.id.clone()))?;
                Some(FeedEntry {
                    url,
                    title: entry.title.map(|t| t.content),
                    published_at: entry
                        .published
                        .or(entry.updated)
                        .map(|dt| dt.with_timezone(&Utc)),
                })
            })
            .collect();

        let items = select_entries(entries, feed.last_item_seen_at, Utc::now());

        info!(feed_url = %feed.url, items = items.len(), "Feed polled");

        Ok(FeedPollOutcome::Fetched {
            title,
            etag,
            last_modified,
            items,
        })
    }
}

fn header_value(response: &reqwest::Response, name: reqwest::header::HeaderName) -> Option<String> {
    response
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

/// Keep entries that are new since the watermark and not older than the age
/// cap, newest first, bounded by `FEED_MAX_ITEMS`. Undated entries pass
/// through; downstream fingerprint dedup handles re-emission.
fn select_entries(
    entries: Vec<FeedEntry>,
    watermark: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<FeedEntry> {
    let age_cutoff = now - chrono::Duration::days(FEED_MAX_AGE_DAYS);

    let mut items: Vec<FeedEntry> = entries
        .into_iter()
        .filter(|entry| match entry.published_at {
            Some(date) => {
                date >= age_cutoff && watermark.map(|seen| date > seen).unwrap_or(true)
            }
            None => true,
        })
        .collect();

    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items.truncate(FEED_MAX_ITEMS);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(url: &str, age_days: Option<i64>, now: DateTime<Utc>) -> FeedEntry {
        FeedEntry {
            url: url.to_string(),
            title: None,
            published_at: age_days.map(|d| now - Duration::days(d)),
        }
    }

    #[test]
    fn drops_entries_older_than_age_cap() {
        let now = Utc::now();
        let items = select_entries(
            vec![entry("a", Some(1), now), entry("b", Some(45), now)],
            None,
            now,
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "a");
    }

    #[test]
    fn drops_entries_at_or_before_watermark() {
        let now = Utc::now();
        let watermark = now - Duration::days(3);
        let items = select_entries(
            vec![
                entry("new", Some(1), now),
                entry("seen", Some(3), now),
                entry("old", Some(5), now),
            ],
            Some(watermark),
            now,
        );
        // "seen" is exactly at the watermark: not new.
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].url, "new");
    }

    #[test]
    fn keeps_undated_entries() {
        let now = Utc::now();
        let items = select_entries(vec![entry("undated", None, now)], Some(now), now);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn caps_and_sorts_newest_first() {
        let now = Utc::now();
        let entries: Vec<FeedEntry> = (0..30)
            .map(|d| entry(&format!("e{d}"), Some(d), now))
            .collect();
        let items = select_entries(entries, None, now);
        assert_eq!(items.len(), FEED_MAX_ITEMS);
        assert_eq!(items[0].url, "e0");
        assert!(items.windows(2).all(|w| w[0].published_at >= w[1].published_at));
    }

    #[test]
    fn parses_minimal_rss() {
        let xml = r#"<?xml version="1.0"?>
            <rss version="2.0"><channel>
              <title>Example Feed</title>
              <item>
                <title>First post</title>
                <link>https://example.com/first</link>
                <pubDate>Mon, 02 Jun 2025 09:00:00 GMT</pubDate>
              </item>
            </channel></rss>"#;
        let parsed = feed_rs::parser::parse(xml.as_bytes()).unwrap();
        assert_eq!(parsed.title.unwrap().content, "Example Feed");
        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(
            parsed.entries[0].links.first().unwrap().href,
            "https://example.com/first"
        );
    }
}
