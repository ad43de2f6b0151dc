// Aggregated concepts and their relationships. Concepts are derived rows:
// every analysis that mentions an entity bumps its frequency.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use pensive_common::{Entity, EntityRelation};

use crate::error::Result;

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Concept {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub concept_type: String,
    pub frequency: i32,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct ConceptRelationship {
    pub id: Uuid,
    pub user_id: Uuid,
    pub from_concept_id: Uuid,
    pub to_concept_id: Uuid,
    pub relation_type: String,
    pub strength: f64,
    pub originating_content_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ConceptStore {
    pool: PgPool,
}

impl ConceptStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert each extracted entity as a concept, bumping frequency on
    /// repeat mentions. Name matching is case-insensitive; the first-seen
    /// spelling wins.
    pub async fn record_entities(&self, user_id: Uuid, entities: &[Entity]) -> Result<()> {
        for entity in entities {
            let name = entity.name.trim();
            if name.is_empty() {
                continue;
            }
            sqlx::query(
                r#"
                INSERT INTO concepts (user_id, name, concept_type)
                VALUES ($1, $2, $3)
                ON CONFLICT (user_id, lower(name))
                DO UPDATE SET frequency = concepts.frequency + 1
                "#,
            )
            .bind(user_id)
            .bind(name)
            .bind(&entity.entity_type)
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    /// Persist entity relationships from one analysis. Relations whose
    /// endpoints don't resolve to stored concepts, self-edges, and
    /// non-positive strengths are dropped. Returns the number inserted.
    pub async fn record_relationships(
        &self,
        user_id: Uuid,
        originating_content_id: Uuid,
        relations: &[EntityRelation],
    ) -> Result<u32> {
        if relations.is_empty() {
            return Ok(0);
        }

        let names: Vec<String> = relations
            .iter()
            .flat_map(|r| [r.from.to_lowercase(), r.to.to_lowercase()])
            .collect();

        let resolved = sqlx::query_as::<_, (Uuid, String)>(
            "SELECT id, lower(name) FROM concepts WHERE user_id = $1 AND lower(name) = ANY($2)",
        )
        .bind(user_id)
        .bind(&names)
        .fetch_all(&self.pool)
        .await?;

        let by_name: std::collections::HashMap<String, Uuid> =
            resolved.into_iter().map(|(id, name)| (name, id)).collect();

        let mut inserted = 0;
        for relation in relations {
            if relation.strength <= 0.0 {
                continue;
            }
            let (Some(&from), Some(&to)) = (
                by_name.get(&relation.from.to_lowercase()),
                by_name.get(&relation.to.to_lowercase()),
            ) else {
                debug!(from = %relation.from, to = %relation.to, "Dropping unresolved relationship");
                continue;
            };
            if from == to {
                continue;
            }

            sqlx::query(
                r#"
                INSERT INTO concept_relationships
                    (user_id, from_concept_id, to_concept_id, relation_type, strength, originating_content_id)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(user_id)
            .bind(from)
            .bind(to)
            .bind(relation.kind.as_str())
            .bind(relation.strength)
            .bind(originating_content_id)
            .execute(&self.pool)
            .await?;
            inserted += 1;
        }

        Ok(inserted)
    }

    /// All concepts for a user, optionally filtered by a name substring.
    pub async fn concepts_for_user(
        &self,
        user_id: Uuid,
        search: Option<&str>,
    ) -> Result<Vec<Concept>> {
        let pattern = search
            .filter(|s| !s.trim().is_empty())
            .map(|s| format!("%{}%", s.trim()));

        let rows = sqlx::query_as::<_, Concept>(
            r#"
            SELECT * FROM concepts
            WHERE user_id = $1 AND ($2::text IS NULL OR name ILIKE $2)
            ORDER BY frequency DESC, name ASC
            "#,
        )
        .bind(user_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Relationships whose both endpoints are in `concept_ids`.
    pub async fn relationships_among(
        &self,
        user_id: Uuid,
        concept_ids: &[Uuid],
    ) -> Result<Vec<ConceptRelationship>> {
        if concept_ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, ConceptRelationship>(
            r#"
            SELECT * FROM concept_relationships
            WHERE user_id = $1
              AND from_concept_id = ANY($2)
              AND to_concept_id = ANY($2)
            "#,
        )
        .bind(user_id)
        .bind(concept_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
