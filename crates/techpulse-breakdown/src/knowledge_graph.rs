//! Step 4 (§4.10), optional: embed each insight, derive stance/certainty by
//! keyword heuristic, upsert atoms into the vector store, then run a
//! correlation pass that links atoms whose embeddings are near (cosine
//! similarity above `CORRELATION_THRESHOLD`) and whose relationship the LLM
//! classifies as something other than unrelated.
//!
//! Entirely cooperative: the caller only reaches this module when both an
//! `EmbeddingClient` and a `VectorStore` are configured (§9); there is no
//! partial/degraded path here because the whole tier is optional.

use uuid::Uuid;

use techpulse_core::{
    AtomEdgeType, AtomLink, Certainty, EmbeddingClient, Insight, InsightAtom, LlmClient, Segment,
    Stance, VectorStore,
};
use techpulse_textsignals::{extract_technologies, heuristic_certainty, heuristic_stance};

use crate::error::{BreakdownError, Result};

/// Cosine-similarity floor a candidate neighbor must clear before its edge
/// is even considered for LLM classification (§4.10 step 4).
pub const CORRELATION_THRESHOLD: f32 = 0.75;

/// Atoms are inserted in batches of this size (§4.10 step 4); batching is
/// the caller's concern once atoms come back from this module, since the
/// store owns transaction boundaries — this constant documents the
/// contract the store implementation (`KnowledgeGraphStore`) honors.
pub const ATOM_INSERT_BATCH_SIZE: usize = 5;

pub async fn build_atoms(
    video_id: &str,
    segments: &[Segment],
    embedding_client: &dyn EmbeddingClient,
) -> Result<Vec<InsightAtom>> {
    let mut atoms = Vec::new();
    for (segment_index, segment) in segments.iter().enumerate() {
        for insight in &segment.insights {
            let atom = build_atom(video_id, segment_index, segment, insight, embedding_client).await?;
            atoms.push(atom);
        }
    }
    Ok(atoms)
}

async fn build_atom(
    video_id: &str,
    segment_index: usize,
    segment: &Segment,
    insight: &Insight,
    embedding_client: &dyn EmbeddingClient,
) -> Result<InsightAtom> {
    let embedding = embedding_client
        .embed(&insight.text)
        .await
        .map_err(|e| BreakdownError::Internal(format!("embedding call failed: {e}")))?;

    let topic = segment.topics.first().cloned().unwrap_or_else(|| segment.title.clone());
    let entity = extract_technologies(&insight.text, "")
        .into_iter()
        .next()
        .unwrap_or_else(|| topic.clone());

    Ok(InsightAtom {
        id: Uuid::new_v4().to_string(),
        video_id: video_id.to_string(),
        segment_index,
        topic,
        entity,
        claim: insight.text.clone(),
        stance: parse_stance(heuristic_stance(&insight.text)),
        certainty: parse_certainty(heuristic_certainty(&insight.text)),
        quote: insight.context.clone(),
        start_time: insight.timestamp,
        end_time: segment.end_time,
        embedding,
    })
}

fn parse_stance(s: &str) -> Stance {
    match s {
        "Critical" => Stance::Critical,
        "Optimistic" => Stance::Optimistic,
        _ => Stance::Neutral,
    }
}

fn parse_certainty(s: &str) -> Certainty {
    match s {
        "High" => Certainty::High,
        "Low" => Certainty::Low,
        _ => Certainty::Medium,
    }
}

/// Upserts every atom into the vector store, then for each atom queries its
/// nearest neighbors and asks the LLM to classify the relationship.
/// Atoms are upserted even when `llm` is `None` — only edge creation needs
/// the LLM, per §4.10 step 4's "classify each candidate edge via the LLM
/// client."
pub async fn correlate_atoms(
    atoms: &[InsightAtom],
    vector_store: &dyn VectorStore,
    llm: Option<&dyn LlmClient>,
) -> Result<Vec<AtomLink>> {
    for atom in atoms {
        let metadata = serde_json::json!({
            "videoId": atom.video_id,
            "segmentIndex": atom.segment_index,
            "topic": atom.topic,
        });
        vector_store
            .upsert(&atom.id, &atom.embedding, metadata)
            .await
            .map_err(|e| BreakdownError::Internal(format!("vector store upsert failed: {e}")))?;
    }

    let Some(client) = llm else {
        return Ok(Vec::new());
    };

    let mut links = Vec::new();
    for atom in atoms {
        let neighbors = vector_store
            .nearest(&atom.embedding, 6)
            .await
            .map_err(|e| BreakdownError::Internal(format!("vector store query failed: {e}")))?;
        for (neighbor_id, score) in neighbors {
            if neighbor_id == atom.id || score < CORRELATION_THRESHOLD {
                continue;
            }
            let Some(neighbor) = atoms.iter().find(|a| a.id == neighbor_id) else {
                continue;
            };
            if let Some(edge_type) = classify_edge(client, atom, neighbor).await {
                links.push(AtomLink {
                    from_atom_id: atom.id.clone(),
                    to_atom_id: neighbor.id.clone(),
                    edge_type,
                    confidence: score as f64,
                });
            }
        }
    }
    Ok(links)
}

async fn classify_edge(client: &dyn LlmClient, a: &InsightAtom, b: &InsightAtom) -> Option<AtomEdgeType> {
    let system = "Classify the relationship between two claims. Respond with JSON only: \
        {\"edgeType\": \"CORROBORATION\"|\"CONTRADICTION\"|\"EXTENSION\"|\"PREDICTION_CHECK\"|\"UNRELATED\"}.";
    let prompt = format!("Claim A: {}\nClaim B: {}", a.claim, b.claim);
    let raw = client.complete_json(system, &prompt).await.ok()?;
    let parsed: serde_json::Value = serde_json::from_str(&raw).ok()?;
    match parsed.get("edgeType").and_then(|v| v.as_str())? {
        "CORROBORATION" => Some(AtomEdgeType::Corroboration),
        "CONTRADICTION" => Some(AtomEdgeType::Contradiction),
        "EXTENSION" => Some(AtomEdgeType::Extension),
        "PREDICTION_CHECK" => Some(AtomEdgeType::PredictionCheck),
        "RELATED" => Some(AtomEdgeType::Related),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use techpulse_core::InsightType;

    struct FakeEmbedding;

    #[async_trait]
    impl EmbeddingClient for FakeEmbedding {
        async fn embed(&self, text: &str) -> techpulse_core::Result<Vec<f32>> {
            Ok(vec![text.len() as f32, 1.0])
        }
        fn dimensions(&self) -> usize {
            2
        }
    }

    struct FakeVectorStore {
        entries: Mutex<Vec<(String, Vec<f32>)>>,
    }

    #[async_trait]
    impl VectorStore for FakeVectorStore {
        async fn upsert(&self, id: &str, embedding: &[f32], _metadata: serde_json::Value) -> techpulse_core::Result<()> {
            self.entries.lock().unwrap().push((id.to_string(), embedding.to_vec()));
            Ok(())
        }
        async fn nearest(&self, embedding: &[f32], top_k: usize) -> techpulse_core::Result<Vec<(String, f32)>> {
            let entries = self.entries.lock().unwrap();
            let mut scored: Vec<(String, f32)> = entries
                .iter()
                .map(|(id, e)| (id.clone(), cosine(embedding, e)))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
            scored.truncate(top_k);
            Ok(scored)
        }
        async fn delete_by_video(&self, _video_id: &str) -> techpulse_core::Result<()> {
            Ok(())
        }
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        let na: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let nb: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
        if na == 0.0 || nb == 0.0 { 0.0 } else { dot / (na * nb) }
    }

    fn segment_with_insight(text: &str) -> Segment {
        Segment {
            title: "rust async".to_string(),
            start_time: 0.0,
            end_time: 60.0,
            summary: String::new(),
            topics: vec!["rust".to_string()],
            transcript_snippet: String::new(),
            insights: vec![Insight {
                insight_type: InsightType::Framework,
                text: text.to_string(),
                depth_score: 0.9,
                speaker: None,
                timestamp: 5.0,
                context: None,
            }],
            key_takeaways: vec![],
        }
    }

    #[tokio::test]
    async fn builds_one_atom_per_insight() {
        let segments = vec![segment_with_insight("Rust prevents data races by design")];
        let atoms = build_atoms("v1", &segments, &FakeEmbedding).await.unwrap();
        assert_eq!(atoms.len(), 1);
        assert_eq!(atoms[0].video_id, "v1");
        assert_eq!(atoms[0].segment_index, 0);
    }

    #[tokio::test]
    async fn correlation_without_an_llm_upserts_but_creates_no_links() {
        let segments = vec![segment_with_insight("identical claim text")];
        let atoms = build_atoms("v1", &segments, &FakeEmbedding).await.unwrap();
        let store = FakeVectorStore { entries: Mutex::new(Vec::new()) };
        let links = correlate_atoms(&atoms, &store, None).await.unwrap();
        assert!(links.is_empty());
        assert_eq!(store.entries.lock().unwrap().len(), 1);
    }
}
