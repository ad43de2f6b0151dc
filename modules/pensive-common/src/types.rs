use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// --- Content ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Web,
    Rss,
    Podcast,
    Manual,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::Web => "web",
            ContentSource::Rss => "rss",
            ContentSource::Podcast => "podcast",
            ContentSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "web" => Some(ContentSource::Web),
            "rss" => Some(ContentSource::Rss),
            "podcast" => Some(ContentSource::Podcast),
            "manual" => Some(ContentSource::Manual),
            _ => None,
        }
    }
}

impl std::fmt::Display for ContentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// --- Analysis ---

/// Reading priority assigned by the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Priority {
    Skim,
    Read,
    DeepDive,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Skim => "skim",
            Priority::Read => "read",
            Priority::DeepDive => "deep-dive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "skim" => Some(Priority::Skim),
            "read" => Some(Priority::Read),
            "deep-dive" | "deep_dive" => Some(Priority::DeepDive),
            _ => None,
        }
    }

    /// Ranking weight for digest ordering. Higher reads first.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::DeepDive => 2,
            Priority::Read => 1,
            Priority::Skim => 0,
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named entity extracted from content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    Requires,
    Enables,
    Supports,
    Related,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Requires => "requires",
            RelationKind::Enables => "enables",
            RelationKind::Supports => "supports",
            RelationKind::Related => "related",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "requires" => Some(RelationKind::Requires),
            "enables" => Some(RelationKind::Enables),
            "supports" => Some(RelationKind::Supports),
            "related" => Some(RelationKind::Related),
            _ => None,
        }
    }
}

impl std::fmt::Display for RelationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed relationship between two extracted entities, by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntityRelation {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationKind,
    pub strength: f64,
}

/// The analyzer's output contract for one piece of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Analysis {
    pub summary_sentence: String,
    pub summary_paragraph: String,
    pub is_full_read: bool,
    pub entities: Vec<Entity>,
    pub tags: Vec<String>,
    #[serde(default)]
    pub relationships: Vec<EntityRelation>,
    pub priority: Priority,
    pub confidence: f64,
}

// --- Digests ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Weekly,
    Monthly,
    Quarterly,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Weekly => "weekly",
            Timeframe::Monthly => "monthly",
            Timeframe::Quarterly => "quarterly",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "weekly" => Some(Timeframe::Weekly),
            "monthly" => Some(Timeframe::Monthly),
            "quarterly" => Some(Timeframe::Quarterly),
            _ => None,
        }
    }

    /// The inclusive lower bound of the window ending at `now`.
    pub fn cutoff(&self, now: chrono::DateTime<chrono::Utc>) -> chrono::DateTime<chrono::Utc> {
        match self {
            Timeframe::Weekly => now - chrono::Duration::days(7),
            Timeframe::Monthly => now
                .checked_sub_months(chrono::Months::new(1))
                .unwrap_or(now - chrono::Duration::days(30)),
            Timeframe::Quarterly => now
                .checked_sub_months(chrono::Months::new(3))
                .unwrap_or(now - chrono::Duration::days(90)),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn priority_roundtrip() {
        for p in [Priority::Skim, Priority::Read, Priority::DeepDive] {
            assert_eq!(Priority::parse(p.as_str()), Some(p));
        }
        assert_eq!(Priority::parse("deep_dive"), Some(Priority::DeepDive));
        assert_eq!(Priority::parse("urgent"), None);
    }

    #[test]
    fn priority_rank_ordering() {
        assert!(Priority::DeepDive.rank() > Priority::Read.rank());
        assert!(Priority::Read.rank() > Priority::Skim.rank());
    }

    #[test]
    fn priority_serde_uses_kebab_case() {
        let json = serde_json::to_string(&Priority::DeepDive).unwrap();
        assert_eq!(json, "\"deep-dive\"");
        let parsed: Priority = serde_json::from_str("\"deep-dive\"").unwrap();
        assert_eq!(parsed, Priority::DeepDive);
    }

    #[test]
    fn weekly_cutoff_is_seven_days() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let cutoff = Timeframe::Weekly.cutoff(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 6, 8, 12, 0, 0).unwrap());
    }

    #[test]
    fn monthly_cutoff_is_calendar_month() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let cutoff = Timeframe::Monthly.cutoff(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 5, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn quarterly_cutoff_is_three_months() {
        let now = Utc.with_ymd_and_hms(2025, 6, 15, 12, 0, 0).unwrap();
        let cutoff = Timeframe::Quarterly.cutoff(now);
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2025, 3, 15, 12, 0, 0).unwrap());
    }

    #[test]
    fn content_source_roundtrip() {
        for s in [
            ContentSource::Web,
            ContentSource::Rss,
            ContentSource::Podcast,
            ContentSource::Manual,
        ] {
            assert_eq!(ContentSource::parse(s.as_str()), Some(s));
        }
    }
}
