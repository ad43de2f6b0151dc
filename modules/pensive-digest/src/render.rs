// HTML fragment rendering for digests. Kept dependency-free: the output is
// embedded in emails and simple pages, not a templating pipeline.

use pensive_common::Priority;

/// One renderable digest entry.
#[derive(Debug, Clone)]
pub struct DigestItem {
    pub title: String,
    pub url: String,
    pub priority: Priority,
    pub summary: String,
}

/// Render a digest as an HTML fragment: heading, then an ordered list of
/// linked titles with a priority badge and summary paragraph each.
pub fn render_digest_html(title: &str, items: &[DigestItem]) -> String {
    let mut html = String::with_capacity(512 + items.len() * 256);
    html.push_str("<div class=\"digest\">\n");
    html.push_str(&format!("  <h2>{}</h2>\n", escape_html(title)));
    html.push_str("  <ol class=\"digest-items\">\n");

    for item in items {
        html.push_str("    <li class=\"digest-item\">\n");
        html.push_str(&format!(
            "      <a href=\"{}\">{}</a>\n",
            escape_attr(&item.url),
            escape_html(&item.title)
        ));
        html.push_str(&format!(
            "      <span class=\"badge badge-{}\">{}</span>\n",
            item.priority.as_str(),
            item.priority.as_str()
        ));
        html.push_str(&format!("      <p>{}</p>\n", escape_html(&item.summary)));
        html.push_str("    </li>\n");
    }

    html.push_str("  </ol>\n</div>\n");
    html
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(input: &str) -> String {
    escape_html(input).replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(title: &str, priority: Priority) -> DigestItem {
        DigestItem {
            title: title.to_string(),
            url: "https://example.com/a".to_string(),
            priority,
            summary: "A summary.".to_string(),
        }
    }

    #[test]
    fn renders_title_link_and_badge() {
        let html = render_digest_html("Weekly digest", &[item("Hello", Priority::DeepDive)]);
        assert!(html.contains("<h2>Weekly digest</h2>"));
        assert!(html.contains("href=\"https://example.com/a\""));
        assert!(html.contains("badge-deep-dive"));
        assert!(html.contains("<p>A summary.</p>"));
    }

    #[test]
    fn escapes_markup_in_content() {
        let mut evil = item("<script>alert(1)</script>", Priority::Read);
        evil.summary = "a & b < c".to_string();
        let html = render_digest_html("t", &[evil]);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("a &amp; b &lt; c"));
    }

    #[test]
    fn escapes_quotes_in_href() {
        let mut sketchy = item("t", Priority::Skim);
        sketchy.url = "https://example.com/\"onmouseover=\"x".to_string();
        let html = render_digest_html("t", &[sketchy]);
        assert!(!html.contains("\"onmouseover=\""));
        assert!(html.contains("&quot;"));
    }

    #[test]
    fn empty_items_render_empty_list() {
        let html = render_digest_html("Nothing new", &[]);
        assert!(html.contains("<ol class=\"digest-items\">\n  </ol>"));
    }
}
