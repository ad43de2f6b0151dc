// Page fetching behind a strategy trait: the real HTTP fetcher for normal
// operation, a deterministic mock for demo mode and tests. Text extraction
// here is deliberately crude; scraping heuristics are not this crate's job.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::header::USER_AGENT;

const PAGE_USER_AGENT: &str = "pensive-feeds/0.1";

/// Extracted page content ready for analysis.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub title: Option<String>,
    pub text: String,
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedPage>;
}

pub struct HttpPageFetcher {
    client: reqwest::Client,
}

impl Default for HttpPageFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpPageFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .expect("Failed to build page HTTP client");
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, PAGE_USER_AGENT)
            .send()
            .await
            .context("Page fetch failed")?;

        if !response.status().is_success() {
            bail!("Page fetch returned {}", response.status());
        }

        let html = response.text().await.context("Failed to read page body")?;

        Ok(FetchedPage {
            title: extract_title(&html),
            text: html_to_text(&html),
        })
    }
}

/// Deterministic fetcher for demo mode: same URL, same page, no network.
pub struct MockPageFetcher;

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedPage> {
        let host = url::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.to_string()))
            .unwrap_or_else(|| "unknown host".to_string());

        Ok(FetchedPage {
            title: Some(format!("Demo page from {host}")),
            text: format!(
                "This is placeholder content for {url}. Demo mode serves fixed text \
                 instead of fetching the live page."
            ),
        })
    }
}

fn extract_title(html: &str) -> Option<String> {
    let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("Invalid title regex");
    let raw = re.captures(html)?.get(1)?.as_str();
    let title = decode_entities(raw).trim().to_string();
    (!title.is_empty()).then_some(title)
}

/// Strip markup down to readable text: drop script/style subtrees, remove
/// tags, decode common entities, collapse whitespace.
fn html_to_text(html: &str) -> String {
    let script = Regex::new(r"(?is)<(script|style)[^>]*>.*?</(script|style)>")
        .expect("Invalid script regex");
    let tags = Regex::new(r"(?s)<[^>]+>").expect("Invalid tag regex");

    let without_scripts = script.replace_all(html, " ");
    let without_tags = tags.replace_all(&without_scripts, " ");
    let decoded = decode_entities(&without_tags);

    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn decode_entities(input: &str) -> String {
    input
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
        <head><title>An Article &amp; More</title>
        <style>body { color: red; }</style></head>
        <body>
          <script>console.log("ignore me");</script>
          <h1>An Article</h1>
          <p>First   paragraph.</p>
          <p>Second paragraph.</p>
        </body></html>"#;

    #[test]
    fn extracts_and_decodes_title() {
        assert_eq!(extract_title(PAGE).as_deref(), Some("An Article & More"));
        assert_eq!(extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn text_drops_scripts_and_styles() {
        let text = html_to_text(PAGE);
        assert!(!text.contains("console.log"));
        assert!(!text.contains("color: red"));
        assert!(text.contains("First paragraph."));
        assert!(text.contains("Second paragraph."));
    }

    #[test]
    fn text_collapses_whitespace() {
        let text = html_to_text("<p>a   b</p>\n\n<p>c</p>");
        assert_eq!(text, "a b c");
    }

    #[tokio::test]
    async fn mock_fetcher_is_deterministic() {
        let fetcher = MockPageFetcher;
        let a = fetcher.fetch("https://example.com/post").await.unwrap();
        let b = fetcher.fetch("https://example.com/post").await.unwrap();
        assert_eq!(a.text, b.text);
        assert_eq!(a.title.as_deref(), Some("Demo page from example.com"));
    }
}
