// Pure graph assembly. Loading is the service's job; everything here is
// deterministic over its inputs.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

use pensive_store::{Concept, ConceptRelationship};

#[derive(Debug, Clone, Serialize)]
pub struct ConceptNode {
    pub id: Uuid,
    pub label: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub frequency: i32,
    pub density: f64,
    pub description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConceptEdge {
    pub id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    #[serde(rename = "type")]
    pub edge_type: String,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ConceptMap {
    pub nodes: Vec<ConceptNode>,
    pub edges: Vec<ConceptEdge>,
}

/// Minimum frequency a concept needs to survive at `abstraction_level`.
/// Higher levels keep only the most frequent (most general) concepts;
/// level 0 keeps everything.
pub fn min_frequency(abstraction_level: u8, max_frequency: i32) -> i32 {
    let level = abstraction_level.min(100) as f64 / 100.0;
    ((level * max_frequency as f64).floor() as i32).max(1)
}

/// Visual weight of a node relative to the dominant concept, on a 10..100
/// scale. Degenerate graphs (max frequency ≤ 1) get a flat 50.
pub fn density(frequency: i32, max_frequency: i32) -> f64 {
    if max_frequency <= 1 {
        return 50.0;
    }
    (frequency as f64 / max_frequency as f64 * 100.0).clamp(10.0, 100.0)
}

/// Assemble the concept map: threshold-filter concepts, then keep only
/// edges whose both endpoints survived. The result never contains a
/// dangling edge.
pub fn build_from_parts(
    concepts: &[Concept],
    relationships: &[ConceptRelationship],
    abstraction_level: u8,
) -> ConceptMap {
    let max_frequency = concepts.iter().map(|c| c.frequency).max().unwrap_or(1).max(1);
    let threshold = min_frequency(abstraction_level, max_frequency);

    let nodes: Vec<ConceptNode> = concepts
        .iter()
        .filter(|c| c.frequency >= threshold)
        .map(|c| ConceptNode {
            id: c.id,
            label: c.name.clone(),
            node_type: c.concept_type.clone(),
            frequency: c.frequency,
            density: density(c.frequency, max_frequency),
            description: c.description.clone(),
        })
        .collect();

    let kept: HashSet<Uuid> = nodes.iter().map(|n| n.id).collect();

    let edges: Vec<ConceptEdge> = relationships
        .iter()
        .filter(|r| kept.contains(&r.from_concept_id) && kept.contains(&r.to_concept_id))
        .map(|r| ConceptEdge {
            id: r.id,
            source: r.from_concept_id,
            target: r.to_concept_id,
            edge_type: r.relation_type.clone(),
            weight: r.strength,
        })
        .collect();

    ConceptMap { nodes, edges }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn concept(name: &str, frequency: i32) -> Concept {
        Concept {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            name: name.to_string(),
            concept_type: "topic".to_string(),
            frequency,
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    fn relationship(from: Uuid, to: Uuid, strength: f64) -> ConceptRelationship {
        ConceptRelationship {
            id: Uuid::new_v4(),
            user_id: Uuid::nil(),
            from_concept_id: from,
            to_concept_id: to,
            relation_type: "supports".to_string(),
            strength,
            originating_content_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn level_fifty_keeps_frequency_five_and_up() {
        let concepts: Vec<Concept> = [1, 1, 1, 5, 10]
            .iter()
            .enumerate()
            .map(|(i, f)| concept(&format!("c{i}"), *f))
            .collect();

        let map = build_from_parts(&concepts, &[], 50);
        // max = 10, threshold = 5
        assert_eq!(map.nodes.len(), 2);
        assert!(map.nodes.iter().all(|n| n.frequency >= 5));
    }

    #[test]
    fn node_count_is_non_increasing_in_abstraction_level() {
        let concepts: Vec<Concept> = (1..=20).map(|f| concept(&format!("c{f}"), f)).collect();

        let mut previous = usize::MAX;
        for level in 0..=100u8 {
            let map = build_from_parts(&concepts, &[], level);
            assert!(
                map.nodes.len() <= previous,
                "node count grew at level {level}"
            );
            previous = map.nodes.len();
        }
    }

    #[test]
    fn level_zero_keeps_everything() {
        let concepts = vec![concept("a", 1), concept("b", 7)];
        let map = build_from_parts(&concepts, &[], 0);
        assert_eq!(map.nodes.len(), 2);
    }

    #[test]
    fn edges_never_dangle() {
        let a = concept("a", 10);
        let b = concept("b", 5);
        let c = concept("c", 1);
        let rels = vec![
            relationship(a.id, b.id, 0.9),
            relationship(a.id, c.id, 0.4),
            relationship(c.id, b.id, 0.2),
        ];
        let concepts = vec![a, b, c];

        let map = build_from_parts(&concepts, &rels, 50);
        let kept: HashSet<Uuid> = map.nodes.iter().map(|n| n.id).collect();
        assert_eq!(map.edges.len(), 1);
        for edge in &map.edges {
            assert!(kept.contains(&edge.source));
            assert!(kept.contains(&edge.target));
        }
    }

    #[test]
    fn edge_weight_is_strength() {
        let a = concept("a", 3);
        let b = concept("b", 3);
        let rels = vec![relationship(a.id, b.id, 0.65)];
        let map = build_from_parts(&[a, b], &rels, 0);
        assert!((map.edges[0].weight - 0.65).abs() < f64::EPSILON);
    }

    #[test]
    fn density_scales_and_clamps() {
        assert!((density(10, 10) - 100.0).abs() < f64::EPSILON);
        assert!((density(5, 10) - 50.0).abs() < f64::EPSILON);
        // Long tail clamps to the floor.
        assert!((density(1, 200) - 10.0).abs() < f64::EPSILON);
        // Degenerate graph.
        assert!((density(1, 1) - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn min_frequency_floors_at_one() {
        assert_eq!(min_frequency(0, 10), 1);
        assert_eq!(min_frequency(5, 10), 1);
        assert_eq!(min_frequency(50, 10), 5);
        assert_eq!(min_frequency(100, 10), 10);
        assert_eq!(min_frequency(100, 1), 1);
    }

    #[test]
    fn empty_input_builds_empty_map() {
        let map = build_from_parts(&[], &[], 50);
        assert!(map.nodes.is_empty());
        assert!(map.edges.is_empty());
    }
}
