use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use llm_client::{strip_code_blocks, truncate_to_char_boundary, Claude};
use pensive_common::{fingerprint, Analysis, Entity, EntityRelation, Priority};

use crate::cache::AnalysisCache;

const MODEL: &str = "claude-sonnet-4-20250514";

/// Analysis results stay cached for a day; re-submitting the same content
/// within that window never re-invokes the LLM.
const ANALYSIS_TTL: Duration = Duration::from_secs(24 * 3600);

/// Content body is truncated before prompting.
const MAX_TEXT_BYTES: usize = 12_000;

const SYSTEM_PROMPT: &str = "\
You are a reading assistant that analyzes saved articles. Respond with ONLY \
a JSON object, no prose and no markdown fences, in exactly this shape:\n\
{\"summary\": {\"sentence\": string, \"paragraph\": string, \"is_full_read\": boolean},\n\
 \"entities\": [{\"name\": string, \"type\": string}],\n\
 \"tags\": [string],\n\
 \"relationships\": [{\"from\": string, \"to\": string, \"type\": \"requires\"|\"enables\"|\"supports\"|\"related\", \"strength\": number}],\n\
 \"priority\": \"skim\"|\"read\"|\"deep-dive\",\n\
 \"confidence\": number}\n\
The sentence is one line; the paragraph is 2-4 sentences. is_full_read is \
true when the source deserves reading in full. Entities are the concrete \
people, organizations, technologies, and topics the text is about. \
relationships connect entity names you listed. confidence is 0 to 1.";

/// Result of an analyze call. `cached` is true when the analysis came from
/// the TTL cache rather than a fresh LLM call.
#[derive(Debug, Clone)]
pub struct Analyzed {
    pub analysis: Analysis,
    pub cached: bool,
}

/// Sends extracted text to the LLM and parses the structured contract.
/// Without an API key it runs in demo mode and returns mock analyses.
pub struct Analyzer {
    llm: Option<Claude>,
    cache: AnalysisCache,
}

impl Analyzer {
    pub fn new(api_key: Option<&str>) -> Self {
        Self {
            llm: api_key.map(|key| Claude::new(key, MODEL)),
            cache: AnalysisCache::new(),
        }
    }

    /// Demo-mode analyzer: never calls out, always returns mock data.
    pub fn demo() -> Self {
        Self::new(None)
    }

    /// Analyze one piece of content. This call does not fail: LLM errors and
    /// unparseable responses degrade to a deterministic fallback analysis.
    pub async fn analyze(&self, title: &str, text: &str, url: &str) -> Analyzed {
        let key = fingerprint(url, text);

        if let Some(analysis) = self.cache.get(&key).await {
            debug!(url, "Analysis cache hit");
            return Analyzed {
                analysis,
                cached: true,
            };
        }

        let Some(llm) = &self.llm else {
            debug!(url, "No API key configured, returning mock analysis");
            return Analyzed {
                analysis: mock_analysis(title),
                cached: false,
            };
        };

        let analysis = match llm
            .chat_completion(SYSTEM_PROMPT, build_user_prompt(title, text, url))
            .await
        {
            Ok(raw) => match parse_analysis(&raw) {
                Ok(analysis) => {
                    self.cache.set(key, analysis.clone(), ANALYSIS_TTL).await;
                    analysis
                }
                Err(e) => {
                    warn!(url, error = %e, "Unparseable analyzer response, using fallback");
                    fallback_analysis(title)
                }
            },
            Err(e) => {
                warn!(url, error = %e, "Analyzer call failed, using fallback");
                fallback_analysis(title)
            }
        };

        Analyzed {
            analysis,
            cached: false,
        }
    }
}

fn build_user_prompt(title: &str, text: &str, url: &str) -> String {
    format!(
        "Title: {title}\nURL: {url}\n\nContent:\n{}",
        truncate_to_char_boundary(text, MAX_TEXT_BYTES)
    )
}

// --- Response parsing ---

#[derive(Deserialize)]
struct RawSummary {
    sentence: String,
    paragraph: String,
    #[serde(default)]
    is_full_read: bool,
}

#[derive(Deserialize)]
struct RawAnalysis {
    summary: RawSummary,
    #[serde(default)]
    entities: Vec<Entity>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    relationships: Vec<EntityRelation>,
    #[serde(default)]
    priority: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

/// Parse the model's response against the strict JSON contract. Priority
/// and confidence are coerced into range rather than rejected.
fn parse_analysis(response: &str) -> Result<Analysis> {
    let raw: RawAnalysis = serde_json::from_str(strip_code_blocks(response))
        .context("Analyzer response is not the expected JSON shape")?;

    let priority = raw
        .priority
        .as_deref()
        .and_then(Priority::parse)
        .unwrap_or(Priority::Read);

    Ok(Analysis {
        summary_sentence: raw.summary.sentence,
        summary_paragraph: raw.summary.paragraph,
        is_full_read: raw.summary.is_full_read,
        entities: raw.entities,
        tags: raw.tags,
        relationships: raw.relationships,
        priority,
        confidence: raw.confidence.unwrap_or(0.5).clamp(0.0, 1.0),
    })
}

/// Deterministic degraded analysis for LLM outages and garbage responses.
pub fn fallback_analysis(title: &str) -> Analysis {
    Analysis {
        summary_sentence: format!("{title} (automatic analysis unavailable)"),
        summary_paragraph: "This item was saved but could not be analyzed. It is kept with \
                            default metadata and can be re-analyzed later."
            .into(),
        is_full_read: false,
        entities: Vec::new(),
        tags: vec!["unanalyzed".into()],
        relationships: Vec::new(),
        priority: Priority::Read,
        confidence: 0.5,
    }
}

/// Fixed analysis for demo mode (no API key configured).
pub fn mock_analysis(title: &str) -> Analysis {
    Analysis {
        summary_sentence: format!("Demo summary of \"{title}\"."),
        summary_paragraph: "Demo mode is active because no LLM credential is configured. This \
                            placeholder analysis stands in for a real model response."
            .into(),
        is_full_read: false,
        entities: vec![
            Entity {
                name: "Knowledge Management".into(),
                entity_type: "topic".into(),
            },
            Entity {
                name: "Reading".into(),
                entity_type: "activity".into(),
            },
        ],
        tags: vec!["demo".into(), "placeholder".into()],
        relationships: Vec::new(),
        priority: Priority::Read,
        confidence: 0.75,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "summary": {"sentence": "One line.", "paragraph": "Some longer text.", "is_full_read": true},
        "entities": [{"name": "Rust", "type": "technology"}],
        "tags": ["systems"],
        "relationships": [{"from": "Rust", "to": "Systems", "type": "enables", "strength": 0.8}],
        "priority": "deep-dive",
        "confidence": 0.9
    }"#;

    #[test]
    fn parses_valid_contract() {
        let a = parse_analysis(VALID).unwrap();
        assert_eq!(a.summary_sentence, "One line.");
        assert!(a.is_full_read);
        assert_eq!(a.entities.len(), 1);
        assert_eq!(a.priority, Priority::DeepDive);
        assert_eq!(a.relationships.len(), 1);
        assert!((a.confidence - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn parses_fenced_response() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_analysis(&fenced).is_ok());
    }

    #[test]
    fn coerces_invalid_priority_and_confidence() {
        let odd = r#"{
            "summary": {"sentence": "s", "paragraph": "p"},
            "priority": "urgent",
            "confidence": 3.5
        }"#;
        let a = parse_analysis(odd).unwrap();
        assert_eq!(a.priority, Priority::Read);
        assert!((a.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_non_json() {
        assert!(parse_analysis("I couldn't analyze that, sorry!").is_err());
    }

    #[test]
    fn fallback_is_well_formed() {
        let a = fallback_analysis("Some Title");
        assert!(Priority::parse(a.priority.as_str()).is_some());
        assert!((0.0..=1.0).contains(&a.confidence));
        assert!(a.summary_sentence.contains("Some Title"));
    }

    #[tokio::test]
    async fn demo_mode_returns_mock_without_calling_out() {
        let analyzer = Analyzer::demo();
        let result = analyzer
            .analyze("My Article", "body text", "https://example.com/a")
            .await;
        assert!(!result.cached);
        assert_eq!(result.analysis.tags, vec!["demo", "placeholder"]);
        assert!((0.0..=1.0).contains(&result.analysis.confidence));
    }

    #[tokio::test]
    async fn cache_short_circuits_second_call() {
        let analyzer = Analyzer::demo();
        let parsed = parse_analysis(VALID).unwrap();
        let key = fingerprint("https://example.com/a", "body");
        analyzer
            .cache
            .set(key, parsed.clone(), Duration::from_secs(60))
            .await;

        let result = analyzer.analyze("t", "body", "https://example.com/a").await;
        assert!(result.cached);
        assert_eq!(result.analysis, parsed);
    }
}
